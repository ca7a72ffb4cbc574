//! What the tick suppression needs from the RTOS.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepModeStatus {
    /// A context switch is pending or a task is waiting for the scheduler to
    /// be resumed, so the low power entry must be abandoned.
    Abort,
    /// Sleep may proceed for as long as requested.
    Standard,
}

pub trait Scheduler {
    /// Called with interrupts masked, right before committing to deep sleep.
    fn confirm_sleep_mode_status(&self) -> SleepModeStatus;

    /// The scheduler's own critical section. It guards the tick count against
    /// the periodic tick handler and is only used around [`step_tick`].
    ///
    /// [`step_tick`]: Scheduler::step_tick
    fn enter_critical(&self);

    fn exit_critical(&self);

    /// Advances the tick count by `ticks` that elapsed while suppressed.
    fn step_tick(&self, ticks: u32);
}
