//! Two producer tasks feeding one consumer over a bounded [`Queue`]
//!
//! Each producer periodically sends a [`Message`] tagged with its own
//! identity and a counter. The consumer waits on the queue, logs where each
//! message came from, and gives up for good if it ever sees a tag no
//! producer uses.
//!
//! Producers never block: if the queue is full the message is dropped and
//! the failure logged.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

mod consumer;
mod message;
mod producer;

pub use consumer::{Consumer, ConsumerConfig, ConsumerState, consumer_task};
pub use message::{Message, ProducerId};
pub use producer::{Producer, ProducerConfig, producer_task};

use crate::{Duration, Queue};

/// How many messages the queue holds
pub const QUEUE_LENGTH: usize = 2;

/// How long the consumer waits for a message before logging and waiting
/// again
pub const RECEIVE_WAIT: Duration = Duration::millis(60_000);

/// Every producer and the consumer run at this priority
pub const TASK_PRIORITY: u8 = 5;

/// The queue between the producers and the consumer
pub type MessageQueue = Queue<Message, QUEUE_LENGTH>;

// End of File
