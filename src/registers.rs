//! STM32F0 register bits used by the board support (RM0091).

pub mod rtc {
    /// Write protection unlock sequence
    pub const WPR_KEYS: [u32; 2] = [0xCA, 0x53];
    pub const WPR_LOCK: u32 = 0xFF;

    pub const ISR_ALRAWF: u32 = 1 << 0;
    pub const ISR_RSF: u32 = 1 << 5;
    pub const ISR_INITF: u32 = 1 << 6;
    pub const ISR_INIT: u32 = 1 << 7;
    pub const ISR_ALRAF: u32 = 1 << 8;

    pub const CR_ALRAE: u32 = 1 << 8;
    pub const CR_ALRAIE: u32 = 1 << 12;

    /// Ignore date, hours, minutes and seconds in alarm A
    pub const ALRMAR_MASK_ALL: u32 = (1 << 31) | (1 << 23) | (1 << 15) | (1 << 7);
    pub const ALRMASSR_MASKSS_POS: u32 = 24;
    pub const ALRMASSR_SS: u32 = 0x7FFF;

    pub const PRER_PREDIV_A_POS: u32 = 16;
    pub const SSR_SS: u32 = 0xFFFF;
}

pub mod rcc {
    pub const APB1ENR_PWREN: u32 = 1 << 28;

    pub const BDCR_LSEON: u32 = 1 << 0;
    pub const BDCR_LSERDY: u32 = 1 << 1;
    pub const BDCR_RTCSEL_MASK: u32 = 0b11 << 8;
    pub const BDCR_RTCSEL_LSE: u32 = 0b01 << 8;
    pub const BDCR_RTCEN: u32 = 1 << 15;
}

pub mod pwr {
    /// Regulator in low power mode during Stop
    pub const CR_LPDS: u32 = 1 << 0;
    /// Standby instead of Stop on deep sleep
    pub const CR_PDDS: u32 = 1 << 1;
    /// Backup domain write access
    pub const CR_DBP: u32 = 1 << 8;
}

pub mod exti {
    /// EXTI line wired to the RTC alarm
    pub const RTC_ALARM_LINE: u8 = 17;
}

pub mod usart {
    pub const ISR_BUSY: u32 = 1 << 16;
}
