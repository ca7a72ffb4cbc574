#![no_main]
#![no_std]

use cortex_m::peripheral::syst::SystClkSource;
use embedded_hal::digital::v2::ToggleableOutputPin;
use embedded_hal::serial::Read;
use heapless::consts::U64;
use heapless::Vec;
use rtc_tickless as _; // global logger + panicking-behavior + memory layout
use rtc_tickless::cpu::CortexM;
use rtc_tickless::registers::{pwr, usart};
use rtc_tickless::rtc::{Stm32Rtc, RTC_HZ};
use rtc_tickless::ticks::TICKS;
use rtc_tickless::wake::ExtiWake;
use rtc_tickless::{Busy, Suppression, TicklessConfig, TicklessIdle};
use stm32f0xx_hal::gpio::gpioa::{PA10, PA9};
use stm32f0xx_hal::gpio::{Alternate, Output, Pin, PushPull, AF1};
use stm32f0xx_hal::pac::{PWR, USART1};
use stm32f0xx_hal::prelude::*;
use stm32f0xx_hal::serial::{Event, Serial};

// Stop mode wakes up on HSI, so the core never runs from anything else
const SYSCLK_HZ: u32 = 8_000_000;
const TICK_HZ: u32 = 512;
const BLINK_TICKS: u32 = TICK_HZ / 2;
const UART_RX_LINE: u8 = 10;

const CONFIG: TicklessConfig = TicklessConfig::new(RTC_HZ, TICK_HZ);

type Gate = fn() -> Result<(), Busy>;
type Idle = TicklessIdle<Stm32Rtc, ExtiWake, Gate>;
type Uart = Serial<USART1, PA9<Alternate<AF1>>, PA10<Alternate<AF1>>>;

/// Stays out of Stop mode while a frame is coming in.
fn uart_idle() -> Result<(), Busy> {
    let usart1 = unsafe { &(*USART1::ptr()) };
    if usart1.isr.read().bits() & usart::ISR_BUSY != 0 {
        Err(Busy)
    } else {
        Ok(())
    }
}

#[rtic::app(device = stm32f0xx_hal::stm32, peripherals = true)]
const APP: () = {
    struct Resources {
        led: Pin<Output<PushPull>>,
        cpu: CortexM,
        tickless: Idle,
        serial: Uart,
        line: Vec<u8, U64>,
    }

    #[init]
    fn init(cx: init::Context) -> init::LateResources {
        let core: cortex_m::Peripherals = cx.core;
        let mut device: stm32f0xx_hal::stm32::Peripherals = cx.device;

        let mut rcc = device
            .RCC
            .configure()
            .sysclk(SYSCLK_HZ.hz())
            .freeze(&mut device.FLASH);

        let gpioa = device.GPIOA.split(&mut rcc);
        let (led, tx, rx) = cortex_m::interrupt::free(|cs| {
            (
                gpioa.pa2.into_push_pull_output(cs).downgrade(),
                gpioa.pa9.into_alternate_af1(cs),
                gpioa.pa10.into_alternate_af1(cs),
            )
        });

        // slow enough that the start bit survives the wake from Stop
        let mut serial = Serial::usart1(device.USART1, (tx, rx), 9_600.bps(), &mut rcc);
        serial.listen(Event::Rxne);

        let rtc = Stm32Rtc::new(device.RTC);

        // deep sleep is Stop mode with the regulator in low power
        let raw_pwr = unsafe { &(*PWR::ptr()) };
        raw_pwr
            .cr
            .modify(|r, w| unsafe { w.bits((r.bits() & !pwr::CR_PDDS) | pwr::CR_LPDS) });

        let mut syst = core.SYST;
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(SYSCLK_HZ / TICK_HZ - 1);
        syst.clear_current();
        syst.enable_interrupt();
        syst.enable_counter();

        let cpu = CortexM::new(core.SCB, syst);

        let tickless = TicklessIdle::new(CONFIG, rtc)
            .with_wake_source(ExtiWake::new(UART_RX_LINE))
            .with_gate(uart_idle as Gate);

        defmt::debug!("Init done.");
        init::LateResources {
            led,
            cpu,
            tickless,
            serial,
            line: Vec::new(),
        }
    }

    #[idle(resources = [cpu, tickless, led])]
    fn idle(cx: idle::Context) -> ! {
        let cpu: &mut CortexM = cx.resources.cpu;
        let tickless: &mut Idle = cx.resources.tickless;
        let led: &mut Pin<Output<PushPull>> = cx.resources.led;

        let mut next_blink = TICKS.now().wrapping_add(BLINK_TICKS);
        loop {
            if TICKS.take_wake_request() {
                defmt::info!("{:?}", *tickless.stats());
            }

            let remaining = next_blink.wrapping_sub(TICKS.now());
            if remaining == 0 || remaining > BLINK_TICKS {
                led.toggle().unwrap();
                next_blink = next_blink.wrapping_add(BLINK_TICKS);
                continue;
            }

            let outcome = tickless.suppress_ticks_and_sleep(remaining, &TICKS, cpu);
            if let Suppression::Vetoed(veto) = outcome {
                defmt::trace!("stayed awake: {:?}", veto);
            }
        }
    }

    #[task(binds = SysTick)]
    fn tick(_: tick::Context) {
        TICKS.increment();
    }

    #[task(binds = RTC)]
    fn rtc_alarm(_: rtc_alarm::Context) {
        Stm32Rtc::acknowledge_interrupt();
    }

    #[task(binds = EXTI4_15)]
    fn uart_wake(_: uart_wake::Context) {
        ExtiWake::acknowledge(UART_RX_LINE);
    }

    #[task(binds = USART1, resources = [serial, line])]
    fn usart1(cx: usart1::Context) {
        let serial: &mut Uart = cx.resources.serial;
        let line: &mut Vec<u8, U64> = cx.resources.line;
        match serial.read() {
            Ok(b'\n') => {
                defmt::info!("received a line of {:usize} bytes", line.len());
                line.clear();
                TICKS.request_wake();
            }
            Ok(byte) => {
                if line.push(byte).is_err() {
                    defmt::warn!("line too long, dropped");
                    line.clear();
                }
            }
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(_)) => {
                defmt::error!("USART1 receive error.");
            }
        }
    }
};
