//! Logging macros used throughout the crate
//!
//! With the `defmt` feature these forward to the matching `defmt` macro. Without
//! it they compile to nothing, which keeps host test builds free of a global
//! logger. The format strings are always defmt format strings.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

macro_rules! log_at {
    ($level:ident, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$level!($fmt $(, $arg)*);
        #[cfg(not(feature = "defmt"))]
        {
            let _ = ($(&$arg,)*);
        }
    }};
}

macro_rules! trace {
    ($($t:tt)*) => { $crate::fmt::log_at!(trace, $($t)*) };
}

macro_rules! debug {
    ($($t:tt)*) => { $crate::fmt::log_at!(debug, $($t)*) };
}

macro_rules! info {
    ($($t:tt)*) => { $crate::fmt::log_at!(info, $($t)*) };
}

macro_rules! error {
    ($($t:tt)*) => { $crate::fmt::log_at!(error, $($t)*) };
}

pub(crate) use {debug, error, info, log_at, trace};

// End of File
