//! The low power wake timer.

/// A free-running sub-second counter with a roll-over alarm, living in an
/// asynchronous clock domain.
pub trait SubsecondRtc {
    /// Number of distinct values the sub-second counter takes before wrapping.
    const COUNTER_MODULUS: u32;

    /// Reads the sub-second counter. Counts up.
    ///
    /// Only trustworthy after [`is_ready`](SubsecondRtc::is_ready) reported
    /// the clock domains as synchronized.
    fn subseconds(&self) -> u32;

    /// Loads the sub-second alarm counter. It counts up from `reload` and the
    /// alarm fires when it rolls over, see [`rollover_reload`].
    fn set_subsecond_alarm(&mut self, reload: u32);

    fn alarm_fired(&self) -> bool;

    fn clear_alarm_flag(&mut self);

    fn enable_alarm_interrupt(&mut self);

    fn disable_alarm_interrupt(&mut self);

    /// Drops the synchronized flag so that the next [`is_ready`] reflects a
    /// fresh synchronization.
    ///
    /// [`is_ready`]: SubsecondRtc::is_ready
    fn clear_ready(&mut self);

    fn is_ready(&self) -> bool;
}

/// Alarm reload value that rolls over after `rtc_ticks` ticks.
///
/// `rtc_ticks` must be at least 1.
pub const fn rollover_reload(rtc_ticks: u32) -> u32 {
    u32::MAX - (rtc_ticks - 1)
}

/// Inverse of [`rollover_reload`].
pub const fn reload_ticks(reload: u32) -> u32 {
    reload.wrapping_neg()
}

#[cfg(feature = "board")]
pub use self::stm32::{Stm32Rtc, RTC_HZ};

#[cfg(feature = "board")]
mod stm32 {
    use super::{reload_ticks, SubsecondRtc};
    use crate::registers::{pwr, rcc, rtc};
    use stm32f0xx_hal::pac::{EXTI, PWR, RCC, RTC};

    const PREDIV_A: u32 = 7;
    const PREDIV_S: u32 = 4095;

    /// Sub-second rate with a 32.768 kHz LSE.
    pub const RTC_HZ: u32 = 32_768 / (PREDIV_A + 1);

    const ALARM_LINE: u32 = 1 << crate::registers::exti::RTC_ALARM_LINE;

    /// The STM32F0 calendar RTC driven as a roll-over timer.
    ///
    /// The hardware sub-second counter counts down from `PREDIV_S` and alarm A
    /// matches on its value, so both are translated to the count-up, roll-over
    /// model of [`SubsecondRtc`].
    pub struct Stm32Rtc {
        rtc: RTC,
    }

    impl Stm32Rtc {
        /// Starts the RTC from the LSE crystal with a 4096 Hz sub-second
        /// counter and routes alarm A to EXTI line 17.
        pub fn new(rtc: RTC) -> Self {
            // enable the backup domain and select the LSE as RTC clock
            let raw_rcc = unsafe { &(*RCC::ptr()) };
            let raw_pwr = unsafe { &(*PWR::ptr()) };
            raw_rcc
                .apb1enr
                .modify(|r, w| unsafe { w.bits(r.bits() | rcc::APB1ENR_PWREN) });
            raw_pwr
                .cr
                .modify(|r, w| unsafe { w.bits(r.bits() | pwr::CR_DBP) });

            raw_rcc
                .bdcr
                .modify(|r, w| unsafe { w.bits(r.bits() | rcc::BDCR_LSEON) });
            while raw_rcc.bdcr.read().bits() & rcc::BDCR_LSERDY == 0 {}
            raw_rcc.bdcr.modify(|r, w| unsafe {
                w.bits((r.bits() & !rcc::BDCR_RTCSEL_MASK) | rcc::BDCR_RTCSEL_LSE | rcc::BDCR_RTCEN)
            });

            let mut s = Stm32Rtc { rtc };

            s.unlocked(|regs| {
                regs.isr
                    .modify(|r, w| unsafe { w.bits(r.bits() | rtc::ISR_INIT) });
                while regs.isr.read().bits() & rtc::ISR_INITF == 0 {}

                // the two prescalers have to be written separately
                regs.prer.write(|w| unsafe { w.bits(PREDIV_S) });
                regs.prer
                    .write(|w| unsafe { w.bits(PREDIV_A << rtc::PRER_PREDIV_A_POS | PREDIV_S) });

                regs.isr
                    .modify(|r, w| unsafe { w.bits(r.bits() & !rtc::ISR_INIT) });
            });

            let exti = unsafe { &(*EXTI::ptr()) };
            exti.rtsr
                .modify(|r, w| unsafe { w.bits(r.bits() | ALARM_LINE) });

            defmt::debug!("RTC running at {:u32} Hz", RTC_HZ);
            s
        }

        /// Clears the EXTI pending bit of the alarm line. Call from the RTC
        /// interrupt handler; the alarm flag itself is left for the idle path.
        pub fn acknowledge_interrupt() {
            let exti = unsafe { &(*EXTI::ptr()) };
            exti.pr.write(|w| unsafe { w.bits(ALARM_LINE) });
        }

        /// Releases the RTC peripheral
        pub fn release(mut self) -> RTC {
            self.disable_alarm_interrupt();
            self.rtc
        }

        fn unlocked<F: FnOnce(&RTC)>(&mut self, f: F) {
            for key in rtc::WPR_KEYS.iter() {
                self.rtc.wpr.write(|w| unsafe { w.bits(*key) });
            }
            f(&self.rtc);
            self.rtc.wpr.write(|w| unsafe { w.bits(rtc::WPR_LOCK) });
        }

        fn raw_subseconds(&self) -> u32 {
            let ss = self.rtc.ssr.read().bits() & rtc::SSR_SS;
            // reading SSR freezes the calendar shadow registers until DR is read
            let _ = self.rtc.dr.read();
            ss
        }
    }

    impl SubsecondRtc for Stm32Rtc {
        const COUNTER_MODULUS: u32 = PREDIV_S + 1;

        fn subseconds(&self) -> u32 {
            PREDIV_S - self.raw_subseconds()
        }

        fn set_subsecond_alarm(&mut self, reload: u32) {
            let ticks = reload_ticks(reload) % Self::COUNTER_MODULUS;
            let now = self.raw_subseconds();
            let target = (now + Self::COUNTER_MODULUS - ticks) % Self::COUNTER_MODULUS;

            self.unlocked(|regs| {
                regs.cr
                    .modify(|r, w| unsafe { w.bits(r.bits() & !rtc::CR_ALRAE) });
                while regs.isr.read().bits() & rtc::ISR_ALRAWF == 0 {}

                regs.alrmar.write(|w| unsafe { w.bits(rtc::ALRMAR_MASK_ALL) });
                // compare SS[11:0], the whole sub-second counter
                regs.alrmassr.write(|w| unsafe {
                    w.bits(12 << rtc::ALRMASSR_MASKSS_POS | (target & rtc::ALRMASSR_SS))
                });

                regs.cr
                    .modify(|r, w| unsafe { w.bits(r.bits() | rtc::CR_ALRAE) });
            });
        }

        fn alarm_fired(&self) -> bool {
            self.rtc.isr.read().bits() & rtc::ISR_ALRAF != 0
        }

        fn clear_alarm_flag(&mut self) {
            // flags are rc_w0: ones leave the other flags alone, INIT stays 0
            self.rtc
                .isr
                .write(|w| unsafe { w.bits(!(rtc::ISR_ALRAF | rtc::ISR_INIT)) });
        }

        fn enable_alarm_interrupt(&mut self) {
            self.unlocked(|regs| {
                regs.cr
                    .modify(|r, w| unsafe { w.bits(r.bits() | rtc::CR_ALRAIE) });
            });
            let exti = unsafe { &(*EXTI::ptr()) };
            exti.pr.write(|w| unsafe { w.bits(ALARM_LINE) });
            exti.imr
                .modify(|r, w| unsafe { w.bits(r.bits() | ALARM_LINE) });
        }

        fn disable_alarm_interrupt(&mut self) {
            let exti = unsafe { &(*EXTI::ptr()) };
            exti.imr
                .modify(|r, w| unsafe { w.bits(r.bits() & !ALARM_LINE) });
            self.unlocked(|regs| {
                regs.cr.modify(|r, w| unsafe {
                    w.bits(r.bits() & !(rtc::CR_ALRAIE | rtc::CR_ALRAE))
                });
            });
        }

        fn clear_ready(&mut self) {
            self.unlocked(|regs| {
                regs.isr
                    .write(|w| unsafe { w.bits(!(rtc::ISR_RSF | rtc::ISR_INIT)) });
            });
        }

        fn is_ready(&self) -> bool {
            self.rtc.isr.read().bits() & rtc::ISR_RSF != 0
        }
    }
}
