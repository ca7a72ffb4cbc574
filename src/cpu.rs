//! Core primitives used on the idle path.

use cortex_m::peripheral::{SCB, SYST};

pub trait Cpu {
    /// Current value of the down-counting tick timer.
    fn systick_current(&self) -> u32;

    /// Raw global interrupt mask (PRIMASK).
    ///
    /// Wake-capable interrupts still latch as pending while masked, and WFI
    /// returns on a pending interrupt, so this is the mask to hold across the
    /// sleep instruction. It is not the scheduler's critical section.
    fn mask_interrupts(&mut self);

    fn unmask_interrupts(&mut self);

    /// Sleep with the tick still running.
    fn sleep(&mut self);

    /// Sleep with the tick stopped. Returns on the next interrupt.
    fn deep_sleep(&mut self);
}

pub struct CortexM {
    scb: SCB,
    syst: SYST,
}

impl CortexM {
    /// Takes SysTick to prove it is configured as the OS tick.
    pub fn new(mut scb: SCB, syst: SYST) -> Self {
        scb.clear_sleepdeep();
        CortexM { scb, syst }
    }

    /// Releases the core peripherals
    pub fn free(self) -> (SCB, SYST) {
        (self.scb, self.syst)
    }
}

impl Cpu for CortexM {
    fn systick_current(&self) -> u32 {
        SYST::get_current()
    }

    fn mask_interrupts(&mut self) {
        cortex_m::interrupt::disable();
    }

    fn unmask_interrupts(&mut self) {
        // NOTE(unsafe) only called on the idle path to undo `mask_interrupts`
        unsafe { cortex_m::interrupt::enable() }
    }

    fn sleep(&mut self) {
        self.scb.clear_sleepdeep();
        cortex_m::asm::wfi();
    }

    fn deep_sleep(&mut self) {
        self.scb.set_sleepdeep();
        cortex_m::asm::dsb();
        cortex_m::asm::wfi();
        self.scb.clear_sleepdeep();
        cortex_m::asm::isb();
    }
}
