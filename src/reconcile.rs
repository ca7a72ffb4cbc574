//! Tick arithmetic for entering and leaving a suppressed period.

use crate::config::TicklessConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plan {
    /// Too short to be worth deep sleep; finish the tick with a normal sleep.
    Shallow,
    /// Deep sleep with the RTC alarm set `rtc_ticks` ahead.
    Deep { rtc_ticks: u32 },
}

/// Decides how to spend `expected_idle_ticks` OS ticks of idle time.
pub fn plan(expected_idle_ticks: u32, config: &TicklessConfig) -> Plan {
    // deep sleep time is limited by the alarm range
    let expected = expected_idle_ticks.min(config.max_idle_ticks());

    if expected < config.min_idle_ticks {
        return Plan::Shallow;
    }

    // give up a few OS ticks so the RTC can synchronize the new alarm
    let rtc_ticks = (expected - config.sync_margin) * config.ratio();
    if rtc_ticks < config.min_rtc_ticks {
        return Plan::Shallow;
    }

    Plan::Deep { rtc_ticks }
}

/// RTC ticks between two counter snapshots, allowing for one wrap of a
/// counter taking `modulus` values.
pub fn elapsed(pre: u32, post: u32, modulus: u32) -> u32 {
    if post < pre {
        post + modulus - pre
    } else {
        post - pre
    }
}

/// Fraction of an OS tick, in RTC ticks, left over by earlier early wakes.
///
/// Always below the tick ratio.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Residual(u32);

impl Residual {
    pub const fn new() -> Self {
        Residual(0)
    }

    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Adds the carried remainder to `rtc_ticks` and keeps what does not make
    /// up a whole OS tick for next time. Returns the RTC ticks to convert.
    pub fn carry(&mut self, rtc_ticks: u32, ratio: u32) -> u32 {
        let total = rtc_ticks + self.0;
        self.0 = total % ratio;
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    const CONFIG: TicklessConfig = TicklessConfig::new(4096, 512);

    #[test]
    fn plan_reserves_synchronization_margin() {
        assert_eq!(plan(10, &CONFIG), Plan::Deep { rtc_ticks: 56 });
    }

    #[test]
    fn short_idle_sleeps_shallow() {
        assert_eq!(plan(2, &CONFIG), Plan::Shallow);
        assert_eq!(plan(3, &CONFIG), Plan::Shallow);
        assert_eq!(plan(0, &CONFIG), Plan::Shallow);
    }

    #[test]
    fn too_few_rtc_ticks_sleeps_shallow() {
        // one OS tick left after the margin is only 4 RTC ticks at a ratio of 4
        let config = TicklessConfig::new(2048, 512);
        assert_eq!(plan(4, &config), Plan::Shallow);
        assert_eq!(plan(5, &config), Plan::Deep { rtc_ticks: 8 });
    }

    #[test]
    fn long_idle_is_clamped_to_alarm_range() {
        let longest = Plan::Deep {
            rtc_ticks: (CONFIG.max_idle_ticks() - 3) * 8,
        };
        assert_eq!(plan(31, &CONFIG), longest);
        assert_eq!(plan(32, &CONFIG), longest);
        assert_eq!(plan(u32::MAX, &CONFIG), longest);
    }

    #[test]
    fn unit_ratio_uses_whole_range() {
        let config = TicklessConfig::new(512, 512);
        assert_eq!(plan(u32::MAX, &config), Plan::Deep { rtc_ticks: 0xFF - 3 });
    }

    #[test]
    fn elapsed_without_rollover() {
        assert_eq!(elapsed(100, 140, 0x100), 40);
        assert_eq!(elapsed(7, 7, 0x100), 0);
    }

    #[test]
    fn elapsed_across_rollover() {
        assert_eq!(elapsed(0xF0, 0x10, 0x100), 0x20);
        assert_eq!(elapsed(4000, 10, 4096), 106);
    }

    #[test]
    fn residual_accumulates_to_whole_ticks() {
        let mut residual = Residual::new();
        assert_eq!(residual.carry(13, 8), 13);
        assert_eq!(residual.get(), 5);
        // 5 carried + 11 = 16, exactly two OS ticks
        assert_eq!(residual.carry(11, 8), 16);
        assert_eq!(residual.get(), 0);
    }

    #[test]
    fn residual_is_zero_at_unit_ratio() {
        let mut residual = Residual::new();
        assert_eq!(residual.carry(17, 1), 17);
        assert_eq!(residual.get(), 0);
    }

    quickcheck! {
        fn rollover_never_exceeds_modulus(pre: u8, post: u8) -> bool {
            let d = elapsed(u32::from(pre), u32::from(post), 0x100);
            d < 0x100 && (u32::from(pre) + d) % 0x100 == u32::from(post)
        }

        fn carried_ticks_do_not_drift(wakes: Vec<u8>, ratio: u8) -> bool {
            let ratio = u32::from(ratio % 16) + 1;
            let mut residual = Residual::new();
            let mut reported = 0;
            let mut true_elapsed = 0;
            for rtc_ticks in wakes {
                let rtc_ticks = u32::from(rtc_ticks);
                true_elapsed += rtc_ticks;
                reported += residual.carry(rtc_ticks, ratio) / ratio;
                if residual.get() >= ratio {
                    return false;
                }
            }
            reported * ratio + residual.get() == true_elapsed
        }
    }
}
