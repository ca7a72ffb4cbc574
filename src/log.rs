//! Logging shims.
//!
//! The firmware logs through `defmt`. Host builds have no global logger, so
//! without the `defmt` feature these expand to nothing.

macro_rules! trace {
    ($($arg:tt)+) => {{
        #[cfg(feature = "defmt")]
        defmt::trace!($($arg)+);
    }};
}

macro_rules! debug {
    ($($arg:tt)+) => {{
        #[cfg(feature = "defmt")]
        defmt::debug!($($arg)+);
    }};
}

macro_rules! info {
    ($($arg:tt)+) => {{
        #[cfg(feature = "defmt")]
        defmt::info!($($arg)+);
    }};
}

macro_rules! error {
    ($($arg:tt)+) => {{
        #[cfg(feature = "defmt")]
        defmt::error!($($arg)+);
    }};
}
