//! Timing anomalies and suppression statistics.

/// The counter reported more RTC ticks than the alarm was armed for.
///
/// The measurement is clamped to `armed` before it reaches the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Anomaly {
    pub measured: u32,
    pub armed: u32,
}

/// Called with interrupts masked; must return.
pub type AnomalyHook = fn(Anomaly);

/// Default hook: logs the anomaly and carries on.
pub fn log_anomaly(anomaly: Anomaly) {
    error!(
        "woke after {:u32} RTC ticks, armed for {:u32}",
        anomaly.measured, anomaly.armed
    );
    let _ = anomaly;
}

/// Logs, then stops at a breakpoint in debug builds so a debugger can inspect
/// the RTC. Release builds only log.
pub fn trap_anomaly(anomaly: Anomaly) {
    log_anomaly(anomaly);
    #[cfg(all(debug_assertions, target_os = "none"))]
    cortex_m::asm::bkpt();
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TicklessStats {
    /// Deep sleeps entered
    pub deep_sleeps: u32,
    /// Deep sleeps ended by the RTC alarm
    pub alarm_wakes: u32,
    /// Deep sleeps ended by anything else
    pub external_wakes: u32,
    pub shallow_sleeps: u32,
    pub vetoes: u32,
    /// Attempts skipped because a tick was about to fire
    pub tick_guard_skips: u32,
    pub anomalies: u32,
    /// OS ticks stepped after deep sleep
    pub ticks_suppressed: u32,
    /// Longest deep sleep, in OS ticks
    pub longest_sleep: u32,
}

impl TicklessStats {
    pub const fn new() -> Self {
        TicklessStats {
            deep_sleeps: 0,
            alarm_wakes: 0,
            external_wakes: 0,
            shallow_sleeps: 0,
            vetoes: 0,
            tick_guard_skips: 0,
            anomalies: 0,
            ticks_suppressed: 0,
            longest_sleep: 0,
        }
    }

    pub(crate) fn record_sleep(&mut self, os_ticks: u32, alarm: bool) {
        self.deep_sleeps = self.deep_sleeps.wrapping_add(1);
        if alarm {
            self.alarm_wakes = self.alarm_wakes.wrapping_add(1);
        } else {
            self.external_wakes = self.external_wakes.wrapping_add(1);
        }
        self.ticks_suppressed = self.ticks_suppressed.wrapping_add(os_ticks);
        self.longest_sleep = self.longest_sleep.max(os_ticks);
    }
}
