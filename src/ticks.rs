//! A minimal OS tick base for single-core RTIC applications.
//!
//! SysTick drives [`TickCounter::increment`]; interrupt handlers that leave
//! work for the idle loop call [`TickCounter::request_wake`], which makes the
//! next sleep confirmation abort.

use core::cell::Cell;
use cortex_m::interrupt::{self, CriticalSection, Mutex};

use crate::scheduler::{Scheduler, SleepModeStatus};

/// Tick base used by the board support.
pub static TICKS: TickCounter = TickCounter::new();

pub struct TickCounter {
    count: Mutex<Cell<u32>>,
    pending: Mutex<Cell<bool>>,
    nesting: Mutex<Cell<u8>>,
}

impl TickCounter {
    pub const fn new() -> Self {
        TickCounter {
            count: Mutex::new(Cell::new(0)),
            pending: Mutex::new(Cell::new(false)),
            nesting: Mutex::new(Cell::new(0)),
        }
    }

    pub fn now(&self) -> u32 {
        interrupt::free(|cs| self.count.borrow(cs).get())
    }

    /// Periodic tick handler
    pub fn increment(&self) {
        interrupt::free(|cs| {
            let count = self.count.borrow(cs);
            count.set(count.get().wrapping_add(1));
        });
    }

    pub fn request_wake(&self) {
        interrupt::free(|cs| self.pending.borrow(cs).set(true));
    }

    /// Clears and returns the wake request.
    pub fn take_wake_request(&self) -> bool {
        interrupt::free(|cs| self.pending.borrow(cs).replace(false))
    }
}

impl Scheduler for TickCounter {
    fn confirm_sleep_mode_status(&self) -> SleepModeStatus {
        // NOTE(unsafe) the idle path calls this with interrupts masked
        let cs = unsafe { CriticalSection::new() };
        if self.pending.borrow(&cs).get() {
            SleepModeStatus::Abort
        } else {
            SleepModeStatus::Standard
        }
    }

    fn enter_critical(&self) {
        interrupt::disable();
        // NOTE(unsafe) interrupts were just disabled
        let cs = unsafe { CriticalSection::new() };
        let nesting = self.nesting.borrow(&cs);
        nesting.set(nesting.get() + 1);
    }

    fn exit_critical(&self) {
        // NOTE(unsafe) still inside `enter_critical`
        let cs = unsafe { CriticalSection::new() };
        let nesting = self.nesting.borrow(&cs);
        let depth = nesting.get() - 1;
        nesting.set(depth);
        if depth == 0 {
            unsafe { interrupt::enable() }
        }
    }

    fn step_tick(&self, ticks: u32) {
        interrupt::free(|cs| {
            let count = self.count.borrow(cs);
            count.set(count.get().wrapping_add(ticks));
        });
    }
}
