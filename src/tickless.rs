//! Tick suppression on the idle path.
//!
//! Deep sleep stops SysTick, so it cannot wake the core. Instead the RTC is
//! armed for the expected idle time and the elapsed time is read back from
//! its sub-second counter on wake. The scheduler's tick count is then stepped
//! by what provably elapsed.
//!
//! Example with a 512 Hz OS tick and a 4096 Hz RTC: one OS tick is 8 RTC
//! ticks. An early wake rarely lands on a multiple of 8, so the remainder is
//! kept and added to the next early wake.

use crate::config::TicklessConfig;
use crate::cpu::Cpu;
use crate::diagnostics::{self, Anomaly, AnomalyHook, TicklessStats};
use crate::gate::{AlwaysPermit, Busy, SleepGate};
use crate::reconcile::{self, Plan, Residual};
use crate::rtc::{self, SubsecondRtc};
use crate::scheduler::{Scheduler, SleepModeStatus};
use crate::wake::WakeSource;

/// What a call to [`TicklessIdle::suppress_ticks_and_sleep`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Suppression {
    /// The next tick is about to fire; nothing was done.
    TooCloseToTick,
    /// Slept with the tick running; the tick does the accounting.
    ShallowSleep,
    /// Deep sleep was abandoned before anything was armed.
    Vetoed(Veto),
    /// Deep sleep happened and the scheduler was stepped by `os_ticks`.
    Slept {
        /// RTC ticks slept, after clamping
        rtc_ticks: u32,
        os_ticks: u32,
        wake: Wake,
    },
}

impl Suppression {
    /// OS ticks stepped by this attempt.
    pub fn os_ticks(&self) -> u32 {
        match *self {
            Suppression::Slept { os_ticks, .. } => os_ticks,
            _ => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Veto {
    /// Context switch pending or a task waits for the scheduler.
    Scheduler,
    Gate(Busy),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wake {
    /// The alarm fired; the full armed time elapsed.
    Alarm,
    /// Something other than the alarm woke the core.
    External,
}

/// Tick-suspension controller. Owned by the idle loop.
pub struct TicklessIdle<R, W = (), G = AlwaysPermit> {
    config: TicklessConfig,
    rtc: R,
    wake: W,
    gate: G,
    residual: Residual,
    on_anomaly: AnomalyHook,
    stats: TicklessStats,
}

impl<R: SubsecondRtc> TicklessIdle<R> {
    /// # Panics
    ///
    /// If the RTC counter wraps within `max_snooze`, since a wrap could then
    /// no longer be told apart from a short sleep.
    pub fn new(config: TicklessConfig, rtc: R) -> Self {
        assert!(
            config.max_snooze < R::COUNTER_MODULUS,
            "max_snooze exceeds the RTC counter range"
        );
        info!(
            "tickless idle: ratio {:u32}, up to {:u32} ticks",
            config.ratio(),
            config.max_idle_ticks()
        );

        TicklessIdle {
            config,
            rtc,
            wake: (),
            gate: AlwaysPermit,
            residual: Residual::new(),
            on_anomaly: diagnostics::log_anomaly,
            stats: TicklessStats::new(),
        }
    }
}

impl<R, W, G> TicklessIdle<R, W, G> {
    /// Adds a source that can end deep sleep before the alarm.
    pub fn with_wake_source<V: WakeSource>(self, wake: V) -> TicklessIdle<R, V, G> {
        TicklessIdle {
            config: self.config,
            rtc: self.rtc,
            wake,
            gate: self.gate,
            residual: self.residual,
            on_anomaly: self.on_anomaly,
            stats: self.stats,
        }
    }

    /// Replaces the always-permit sleep gate.
    pub fn with_gate<H: SleepGate>(self, gate: H) -> TicklessIdle<R, W, H> {
        TicklessIdle {
            config: self.config,
            rtc: self.rtc,
            wake: self.wake,
            gate,
            residual: self.residual,
            on_anomaly: self.on_anomaly,
            stats: self.stats,
        }
    }

    /// Routes timing anomalies to `hook` instead of the log.
    pub fn on_anomaly(mut self, hook: AnomalyHook) -> Self {
        self.on_anomaly = hook;
        self
    }

    pub fn config(&self) -> &TicklessConfig {
        &self.config
    }

    /// RTC ticks carried towards the next OS tick.
    pub fn residual(&self) -> u32 {
        self.residual.get()
    }

    pub fn stats(&self) -> &TicklessStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = TicklessStats::new();
    }

    pub fn rtc(&self) -> &R {
        &self.rtc
    }

    /// Releases the RTC, wake source and gate
    pub fn free(self) -> (R, W, G) {
        (self.rtc, self.wake, self.gate)
    }
}

impl<R, W, G> TicklessIdle<R, W, G>
where
    R: SubsecondRtc,
    W: WakeSource,
    G: SleepGate,
{
    /// Suppresses the OS tick for up to `expected_idle_ticks` and sleeps.
    ///
    /// Must be called from the idle loop with interrupts enabled. On return
    /// `scheduler` has been stepped by the ticks that elapsed in deep sleep,
    /// or not touched at all if no deep sleep happened.
    pub fn suppress_ticks_and_sleep<S, C>(
        &mut self,
        expected_idle_ticks: u32,
        scheduler: &S,
        cpu: &mut C,
    ) -> Suppression
    where
        S: Scheduler + ?Sized,
        C: Cpu,
    {
        // avoid sleeping too close to a SysTick interrupt
        if cpu.systick_current() < self.config.min_systick {
            bump(&mut self.stats.tick_guard_skips);
            return Suppression::TooCloseToTick;
        }

        let rtc_ticks = match reconcile::plan(expected_idle_ticks, &self.config) {
            Plan::Shallow => {
                bump(&mut self.stats.shallow_sleeps);
                cpu.sleep();
                return Suppression::ShallowSleep;
            }
            Plan::Deep { rtc_ticks } => rtc_ticks,
        };

        // The scheduler's critical section would also hold off the interrupts
        // that have to end the sleep.
        cpu.mask_interrupts();

        if let Some(veto) = self.veto(scheduler) {
            cpu.unmask_interrupts();
            bump(&mut self.stats.vetoes);
            debug!("tickless sleep vetoed: {:?}", veto);
            return Suppression::Vetoed(veto);
        }

        self.rtc.set_subsecond_alarm(rtc::rollover_reload(rtc_ticks));
        self.rtc.clear_alarm_flag();
        self.rtc.enable_alarm_interrupt();

        self.wake.arm();

        let pre = self.rtc.subseconds();
        cpu.deep_sleep();

        // the counter is not valid until the clock domains synchronized again
        self.rtc.clear_ready();
        self.wake.disarm();
        while !self.rtc.is_ready() {}
        let post = self.rtc.subseconds();

        let ratio = self.config.ratio();
        let (wake, slept, os_ticks) = if self.rtc.alarm_fired() {
            (Wake::Alarm, rtc_ticks, rtc_ticks / ratio)
        } else {
            let mut slept = reconcile::elapsed(pre, post, R::COUNTER_MODULUS);
            if slept > rtc_ticks {
                bump(&mut self.stats.anomalies);
                (self.on_anomaly)(Anomaly {
                    measured: slept,
                    armed: rtc_ticks,
                });
                slept = rtc_ticks;
            }
            let carried = self.residual.carry(slept, ratio);
            (Wake::External, slept, carried / ratio)
        };

        self.rtc.disable_alarm_interrupt();
        self.rtc.clear_alarm_flag();

        cpu.unmask_interrupts();

        scheduler.enter_critical();
        scheduler.step_tick(os_ticks);
        scheduler.exit_critical();

        self.stats.record_sleep(os_ticks, wake == Wake::Alarm);
        trace!(
            "slept {:u32}/{:u32} RTC ticks, stepped {:u32}",
            slept,
            rtc_ticks,
            os_ticks
        );

        Suppression::Slept {
            rtc_ticks: slept,
            os_ticks,
            wake,
        }
    }

    fn veto<S: Scheduler + ?Sized>(&self, scheduler: &S) -> Option<Veto> {
        if scheduler.confirm_sleep_mode_status() == SleepModeStatus::Abort {
            return Some(Veto::Scheduler);
        }
        self.gate.permit_tickless().err().map(Veto::Gate)
    }
}

fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}
