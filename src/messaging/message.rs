//! The [`Message`] type and the identities that tag it

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Duration, Error};

/// Which producer a task is, and so which tag its messages carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProducerId {
    /// Producer 1, sending every 2000 ms
    One,
    /// Producer 2, sending every 2300 ms
    Two,
}

impl ProducerId {
    /// The tag on messages from this producer
    pub const fn tag(self) -> u8 {
        match self {
            ProducerId::One => Message::FROM_PRODUCER_1,
            ProducerId::Two => Message::FROM_PRODUCER_2,
        }
    }

    /// How long this producer waits between sends
    pub const fn period(self) -> Duration {
        match self {
            ProducerId::One => Duration::millis(2000),
            ProducerId::Two => Duration::millis(2300),
        }
    }

    /// The number people use for this producer, for the logs
    pub const fn number(self) -> u8 {
        match self {
            ProducerId::One => 1,
            ProducerId::Two => 2,
        }
    }
}

impl TryFrom<u8> for ProducerId {
    type Error = Error;

    fn try_from(tag: u8) -> Result<ProducerId, Error> {
        match tag {
            Message::FROM_PRODUCER_1 => Ok(ProducerId::One),
            Message::FROM_PRODUCER_2 => Ok(ProducerId::Two),
            other => Err(Error::UnrecognizedMessageTag(other)),
        }
    }
}

/// What goes through the queue.
///
/// The tag says which producer sent it; it is not unique per message. The
/// counter is the sending producer's own count, which wraps at `u32::MAX`.
///
/// The tag is kept raw, exactly as it sat in the queue slot, so that a
/// receiver can spot values no producer would send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    tag: u8,
    counter: u32,
}

impl Message {
    /// Tag on messages from [`ProducerId::One`]
    pub const FROM_PRODUCER_1: u8 = 0;

    /// Tag on messages from [`ProducerId::Two`]
    pub const FROM_PRODUCER_2: u8 = 1;

    /// Build a message from the given producer
    pub const fn new(source: ProducerId, counter: u32) -> Message {
        Message {
            tag: source.tag(),
            counter,
        }
    }

    /// Build a message with any tag at all, recognised or not
    pub const fn from_raw(tag: u8, counter: u32) -> Message {
        Message { tag, counter }
    }

    /// The raw tag
    pub const fn tag(&self) -> u8 {
        self.tag
    }

    /// The sender's count when it built this message
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    /// Which producer sent this message
    pub fn source(&self) -> Result<ProducerId, Error> {
        ProducerId::try_from(self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_matches_identity() {
        for id in [ProducerId::One, ProducerId::Two] {
            let message = Message::new(id, 12);
            assert_eq!(message.source(), Ok(id));
            assert_eq!(message.counter(), 12);
        }
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let message = Message::from_raw(0x42, 0);
        assert_eq!(message.source(), Err(Error::UnrecognizedMessageTag(0x42)));
    }

    #[test]
    fn periods() {
        assert_eq!(ProducerId::One.period().ticks(), 2000);
        assert_eq!(ProducerId::Two.period().ticks(), 2300);
    }
}

// End of File
