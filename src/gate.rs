//! Sleep permission.
//!
//! The gate is asked once per suppression attempt, with interrupts masked,
//! whether peripheral activity forbids tickless sleep. Any `Err` vetoes the
//! attempt; the question is asked again on the next idle opportunity.
//!
//! Override the default by handing a function to
//! [`TicklessIdle::with_gate`](crate::TicklessIdle::with_gate):
//!
//! ```
//! use rtc_tickless::Busy;
//!
//! fn uart_idle() -> Result<(), Busy> {
//!     // e.g. check the USART BUSY flag
//!     Ok(())
//! }
//! # let _ = uart_idle;
//! ```

/// Peripheral activity that must not be interrupted by deep sleep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Busy;

pub trait SleepGate {
    /// Must be fast and free of side effects.
    fn permit_tickless(&self) -> Result<(), Busy>;
}

/// Permits every attempt.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysPermit;

impl SleepGate for AlwaysPermit {
    fn permit_tickless(&self) -> Result<(), Busy> {
        Ok(())
    }
}

impl<F> SleepGate for F
where
    F: Fn() -> Result<(), Busy>,
{
    fn permit_tickless(&self) -> Result<(), Busy> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    fn deny() -> Result<(), Busy> {
        Err(Busy)
    }

    #[test]
    fn default_gate_permits() {
        assert_eq!(AlwaysPermit.permit_tickless(), Ok(()));
    }

    #[test]
    fn function_pointer_overrides() {
        let gate: fn() -> Result<(), Busy> = deny;
        assert_eq!(gate.permit_tickless(), Err(Busy));
    }

    #[test]
    fn closure_sees_current_state() {
        let receiving = Cell::new(true);
        let gate = || if receiving.get() { Err(Busy) } else { Ok(()) };

        assert_eq!(gate.permit_tickless(), Err(Busy));
        receiving.set(false);
        assert_eq!(gate.permit_tickless(), Ok(()));
    }
}
