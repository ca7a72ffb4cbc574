#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

pub mod config;
pub mod cpu;
pub mod diagnostics;
pub mod gate;
pub mod reconcile;
pub mod registers;
pub mod rtc;
pub mod scheduler;
pub mod tickless;
pub mod ticks;
pub mod wake;

pub use config::TicklessConfig;
pub use gate::{AlwaysPermit, Busy, SleepGate};
pub use scheduler::{Scheduler, SleepModeStatus};
pub use tickless::{Suppression, TicklessIdle, Veto, Wake};

#[cfg(feature = "board")]
use defmt_rtt as _; // global logger
#[cfg(feature = "board")]
use panic_probe as _;
#[cfg(feature = "board")]
use stm32f0xx_hal as _;

#[cfg(feature = "board")]
#[defmt::timestamp]
fn timestamp() -> u64 {
    // NOTE `timestamp` runs with interrupts disabled
    ticks::TICKS.now() as u64
}
