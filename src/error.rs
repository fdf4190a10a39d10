//! Holds the crate-wide [`Error`] type

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::fmt;

/// Everything that can go wrong in the kernel or in the messaging tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A queue or a task could not be created.
    ///
    /// Fatal during startup.
    ResourceExhausted,
    /// A zero-wait send found the queue full, so the message was dropped
    SendFailed,
    /// Nothing arrived within the receive window
    ReceiveTimeout,
    /// A message carried a tag no producer uses
    UnrecognizedMessageTag(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ResourceExhausted => write!(f, "out of resources"),
            Error::SendFailed => write!(f, "queue full, message dropped"),
            Error::ReceiveTimeout => write!(f, "timed out waiting for a message"),
            Error::UnrecognizedMessageTag(tag) => write!(f, "unknown message tag: {tag}"),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_tag() {
        let text = format!("{}", Error::UnrecognizedMessageTag(7));
        assert_eq!(text, "unknown message tag: 7");
    }
}

// End of File
