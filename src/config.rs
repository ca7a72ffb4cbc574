//! Tick-suppression tuning.
//!
//! A configuration is built in a `const` so that an unsupported clock setup
//! fails the build instead of misbehaving at run time:
//!
//! ```
//! use rtc_tickless::TicklessConfig;
//!
//! const CONFIG: TicklessConfig = TicklessConfig::new(4096, 512);
//! assert_eq!(CONFIG.ratio(), 8);
//! ```

/// Longest deep sleep, in RTC ticks.
pub const MAX_SNOOZE: u32 = 0xFF;
/// Do not suppress the tick when SysTick is this close to reloading.
pub const MIN_SYSTICK: u32 = 2;
/// Shortest alarm worth entering deep sleep for, in RTC ticks.
pub const MIN_RTC_TICKS: u32 = 5;
/// OS ticks given up so the RTC's asynchronous domain can latch the alarm.
pub const SYNC_MARGIN_TICKS: u32 = 3;
/// Shortest idle period worth suppressing the tick for, in OS ticks.
pub const MIN_IDLE_TICKS: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TicklessConfig {
    rtc_hz: u32,
    tick_hz: u32,
    pub(crate) max_snooze: u32,
    pub(crate) min_systick: u32,
    pub(crate) min_rtc_ticks: u32,
    pub(crate) sync_margin: u32,
    pub(crate) min_idle_ticks: u32,
}

impl TicklessConfig {
    /// Creates a configuration for an RTC running at `rtc_hz` replacing an OS
    /// tick of `tick_hz`.
    ///
    /// # Panics
    ///
    /// An RTC slower than the OS tick is not supported.
    pub const fn new(rtc_hz: u32, tick_hz: u32) -> Self {
        assert!(tick_hz > 0, "OS tick rate must be non-zero");
        assert!(rtc_hz >= tick_hz, "RTC must be at least as fast as the OS tick");

        Self {
            rtc_hz,
            tick_hz,
            max_snooze: MAX_SNOOZE,
            min_systick: MIN_SYSTICK,
            min_rtc_ticks: MIN_RTC_TICKS,
            sync_margin: SYNC_MARGIN_TICKS,
            min_idle_ticks: MIN_IDLE_TICKS,
        }
    }

    pub const fn max_snooze(mut self, rtc_ticks: u32) -> Self {
        assert!(rtc_ticks > 0, "deep sleep must be allowed at least one RTC tick");
        self.max_snooze = rtc_ticks;
        self
    }

    pub const fn min_systick(mut self, counts: u32) -> Self {
        self.min_systick = counts;
        self
    }

    pub const fn min_rtc_ticks(mut self, rtc_ticks: u32) -> Self {
        self.min_rtc_ticks = rtc_ticks;
        self
    }

    /// Sets the synchronization margin and the shortest idle period together,
    /// since the latter has to exceed the former.
    pub const fn idle_window(mut self, sync_margin: u32, min_idle_ticks: u32) -> Self {
        assert!(
            min_idle_ticks > sync_margin,
            "minimum idle period must exceed the synchronization margin"
        );
        self.sync_margin = sync_margin;
        self.min_idle_ticks = min_idle_ticks;
        self
    }

    pub const fn rtc_hz(&self) -> u32 {
        self.rtc_hz
    }

    pub const fn tick_hz(&self) -> u32 {
        self.tick_hz
    }

    /// RTC ticks per OS tick.
    pub const fn ratio(&self) -> u32 {
        self.rtc_hz / self.tick_hz
    }

    /// Longest idle period, in OS ticks, the RTC can cover.
    pub const fn max_idle_ticks(&self) -> u32 {
        self.max_snooze / self.ratio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: TicklessConfig = TicklessConfig::new(4096, 512);

    #[test]
    fn reference_board_ratio() {
        assert_eq!(REFERENCE.ratio(), 8);
        assert_eq!(REFERENCE.max_idle_ticks(), 31);
        assert_eq!(REFERENCE.sync_margin, 3);
        assert_eq!(REFERENCE.min_idle_ticks, 4);
    }

    #[test]
    fn equal_rates_give_unit_ratio() {
        let config = TicklessConfig::new(1000, 1000);
        assert_eq!(config.ratio(), 1);
        assert_eq!(config.max_idle_ticks(), MAX_SNOOZE);
    }

    #[test]
    fn uneven_rates_truncate() {
        assert_eq!(TicklessConfig::new(32768, 1000).ratio(), 32);
    }

    #[test]
    #[should_panic(expected = "RTC must be at least as fast")]
    fn slow_rtc_is_rejected() {
        let _ = TicklessConfig::new(512, 4096);
    }

    #[test]
    #[should_panic(expected = "must exceed the synchronization margin")]
    fn idle_window_must_cover_margin() {
        let _ = REFERENCE.idle_window(3, 3);
    }

    #[test]
    fn builders_override_defaults() {
        let config = TicklessConfig::new(4096, 512)
            .max_snooze(0x7F)
            .min_systick(10)
            .min_rtc_ticks(8)
            .idle_window(2, 5);
        assert_eq!(config.max_idle_ticks(), 15);
        assert_eq!(config.min_systick, 10);
        assert_eq!(config.min_rtc_ticks, 8);
        assert_eq!(config.sync_margin, 2);
        assert_eq!(config.min_idle_ticks, 5);
    }
}
