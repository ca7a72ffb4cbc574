//! Secondary wake sources.
//!
//! Anything that has to abort a deep sleep before the RTC alarm, for example
//! the start bit of a UART reception, is armed right before the sleep
//! instruction and disarmed right after waking, so that it does not fire
//! spuriously once the core runs normally again.

pub trait WakeSource {
    fn arm(&mut self);

    /// Disables the source and clears any event it latched.
    fn disarm(&mut self);
}

/// No secondary wake source: only the RTC alarm ends a deep sleep.
impl WakeSource for () {
    fn arm(&mut self) {}

    fn disarm(&mut self) {}
}

#[cfg(feature = "board")]
pub use self::exti::ExtiWake;

#[cfg(feature = "board")]
mod exti {
    use super::WakeSource;
    use stm32f0xx_hal::pac::EXTI;

    /// Falling-edge wake on a GPIO EXTI line.
    ///
    /// The pin keeps its alternate function; EXTI samples the input whatever
    /// the pin mode. Lines 0-15 select port A unless SYSCFG_EXTICR says
    /// otherwise.
    pub struct ExtiWake {
        mask: u32,
    }

    impl ExtiWake {
        pub fn new(line: u8) -> Self {
            debug_assert!(line < 16, "only GPIO lines can wake on an edge");
            let mask: u32 = 1 << line;
            let exti = unsafe { &(*EXTI::ptr()) };
            exti.ftsr.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
            ExtiWake { mask }
        }

        /// Clears a latched edge on `line`. Call from the EXTI interrupt
        /// handler, which still runs once after a wake through this source.
        pub fn acknowledge(line: u8) {
            let exti = unsafe { &(*EXTI::ptr()) };
            exti.pr.write(|w| unsafe { w.bits(1 << line) });
        }
    }

    impl WakeSource for ExtiWake {
        fn arm(&mut self) {
            let exti = unsafe { &(*EXTI::ptr()) };
            exti.pr.write(|w| unsafe { w.bits(self.mask) });
            exti.imr
                .modify(|r, w| unsafe { w.bits(r.bits() | self.mask) });
        }

        fn disarm(&mut self) {
            let exti = unsafe { &(*EXTI::ptr()) };
            exti.pr.write(|w| unsafe { w.bits(self.mask) });
            exti.imr
                .modify(|r, w| unsafe { w.bits(r.bits() & !self.mask) });
        }
    }
}
