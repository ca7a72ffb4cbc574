//! A simulated core, RTC and scheduler for driving the idle path on the host.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use rtc_tickless::cpu::Cpu;
use rtc_tickless::rtc::{reload_ticks, SubsecondRtc};
use rtc_tickless::scheduler::{Scheduler, SleepModeStatus};
use rtc_tickless::wake::WakeSource;

pub const MODULUS: u32 = 0x100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Mask,
    Unmask,
    Sleep,
    DeepSleep,
    SetAlarm(u32),
    AlarmIrq(bool),
    WakeArmed(bool),
    EnterCritical,
    ExitCritical,
    Step(u32),
}

/// How the next deep sleep ends.
#[derive(Clone, Copy, Debug)]
pub enum Wakeup {
    /// The secondary source fires after this many RTC ticks, unless the alarm
    /// comes first.
    External(u32),
    /// Nothing but the alarm.
    Alarm,
    /// The counter moves by this much and no alarm is seen.
    Glitch(u32),
    /// The alarm flag is set but the counter only moved this much.
    StaleAlarm(u32),
}

#[derive(Default)]
pub struct Board {
    pub counter: u32,
    pub alarm_ticks: Option<u32>,
    pub alarm_flag: bool,
    pub alarm_irq: bool,
    pub ready: bool,
    pub ready_polls: u32,
    pub masked: bool,
    pub wake_armed: bool,
    pub systick: u32,
    pub wakeups: VecDeque<Wakeup>,
    pub events: Vec<Event>,
}

pub type Shared = Rc<RefCell<Board>>;

pub fn board(counter: u32) -> Shared {
    Rc::new(RefCell::new(Board {
        counter,
        ready: true,
        systick: 1000,
        ..Board::default()
    }))
}

pub struct SimRtc(pub Shared);

impl SubsecondRtc for SimRtc {
    const COUNTER_MODULUS: u32 = MODULUS;

    fn subseconds(&self) -> u32 {
        let b = self.0.borrow();
        assert!(b.ready, "counter read before synchronization");
        b.counter
    }

    fn set_subsecond_alarm(&mut self, reload: u32) {
        let mut b = self.0.borrow_mut();
        b.alarm_ticks = Some(reload_ticks(reload));
        b.events.push(Event::SetAlarm(reload));
    }

    fn alarm_fired(&self) -> bool {
        self.0.borrow().alarm_flag
    }

    fn clear_alarm_flag(&mut self) {
        self.0.borrow_mut().alarm_flag = false;
    }

    fn enable_alarm_interrupt(&mut self) {
        let mut b = self.0.borrow_mut();
        b.alarm_irq = true;
        b.events.push(Event::AlarmIrq(true));
    }

    fn disable_alarm_interrupt(&mut self) {
        let mut b = self.0.borrow_mut();
        b.alarm_irq = false;
        b.alarm_ticks = None;
        b.events.push(Event::AlarmIrq(false));
    }

    fn clear_ready(&mut self) {
        self.0.borrow_mut().ready = false;
    }

    fn is_ready(&self) -> bool {
        // synchronizes on the third poll
        let mut b = self.0.borrow_mut();
        b.ready_polls += 1;
        if b.ready_polls % 3 == 0 {
            b.ready = true;
        }
        b.ready
    }
}

pub struct SimWake(pub Shared);

impl WakeSource for SimWake {
    fn arm(&mut self) {
        let mut b = self.0.borrow_mut();
        b.wake_armed = true;
        b.events.push(Event::WakeArmed(true));
    }

    fn disarm(&mut self) {
        let mut b = self.0.borrow_mut();
        b.wake_armed = false;
        b.events.push(Event::WakeArmed(false));
    }
}

pub struct SimCpu(pub Shared);

impl Cpu for SimCpu {
    fn systick_current(&self) -> u32 {
        self.0.borrow().systick
    }

    fn mask_interrupts(&mut self) {
        let mut b = self.0.borrow_mut();
        assert!(!b.masked, "interrupts masked twice");
        b.masked = true;
        b.events.push(Event::Mask);
    }

    fn unmask_interrupts(&mut self) {
        let mut b = self.0.borrow_mut();
        assert!(b.masked, "interrupts unmasked twice");
        b.masked = false;
        b.events.push(Event::Unmask);
    }

    fn sleep(&mut self) {
        self.0.borrow_mut().events.push(Event::Sleep);
    }

    fn deep_sleep(&mut self) {
        let mut b = self.0.borrow_mut();
        assert!(b.masked, "deep sleep with interrupts unmasked");
        b.events.push(Event::DeepSleep);

        let armed = if b.alarm_irq { b.alarm_ticks } else { None };
        let wakeup = b.wakeups.pop_front().unwrap_or(Wakeup::Alarm);
        let (ticks, alarm) = match (wakeup, armed) {
            (Wakeup::External(n), Some(a)) if n >= a => (a, true),
            (Wakeup::External(n), _) => (n, false),
            (Wakeup::Alarm, Some(a)) => (a, true),
            (Wakeup::Alarm, None) => panic!("deep sleep with nothing to wake it"),
            (Wakeup::Glitch(n), _) => (n, false),
            (Wakeup::StaleAlarm(n), _) => (n, true),
        };
        b.counter = (b.counter + ticks) % MODULUS;
        b.alarm_flag |= alarm;
    }
}

#[derive(Default)]
pub struct SimScheduler {
    pub board: Option<Shared>,
    pub abort: Cell<bool>,
    pub ticks: Cell<u32>,
    pub critical: Cell<bool>,
}

impl SimScheduler {
    pub fn new(board: &Shared) -> Self {
        SimScheduler {
            board: Some(board.clone()),
            ..SimScheduler::default()
        }
    }

    fn log(&self, event: Event) {
        if let Some(board) = &self.board {
            board.borrow_mut().events.push(event);
        }
    }
}

impl Scheduler for SimScheduler {
    fn confirm_sleep_mode_status(&self) -> SleepModeStatus {
        if self.abort.get() {
            SleepModeStatus::Abort
        } else {
            SleepModeStatus::Standard
        }
    }

    fn enter_critical(&self) {
        assert!(!self.critical.replace(true));
        self.log(Event::EnterCritical);
    }

    fn exit_critical(&self) {
        assert!(self.critical.replace(false));
        self.log(Event::ExitCritical);
    }

    fn step_tick(&self, ticks: u32) {
        assert!(self.critical.get(), "tick count stepped outside the critical section");
        self.ticks.set(self.ticks.get() + ticks);
        self.log(Event::Step(ticks));
    }
}
