//! The producer task

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{
    Error, Queue, SystemClock, Timebase,
    fmt::{error, info},
    queue::TrySendError,
};

use super::{Message, ProducerId};

/// What a producer task is spawned with
pub struct ProducerConfig<const N: usize> {
    /// Which producer this is
    pub id: ProducerId,
    /// Where to send
    pub queue: &'static Queue<Message, N>,
}

/// A producer, with its own counter.
///
/// Build one inside the task that runs it, so the counter lives exactly as
/// long as that task.
pub struct Producer<'q, const N: usize> {
    id: ProducerId,
    queue: &'q Queue<Message, N>,
    counter: u32,
}

impl<'q, const N: usize> Producer<'q, N> {
    /// Create a producer whose counter starts at zero
    pub fn new(id: ProducerId, queue: &'q Queue<Message, N>) -> Self {
        Producer {
            id,
            queue,
            counter: 0,
        }
    }

    /// Which producer this is
    pub fn id(&self) -> ProducerId {
        self.id
    }

    /// The counter the next message will carry
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Send one message without waiting, then move the counter on.
    ///
    /// If the queue is full the message is dropped and
    /// [`Error::SendFailed`] returned; nobody retries it.
    pub fn step(&mut self) -> Result<Message, Error> {
        let message = Message::new(self.id, self.counter);
        self.counter = self.counter.wrapping_add(1);
        match self.queue.try_send(message) {
            Ok(()) => Ok(message),
            Err(err @ TrySendError::Full(_)) => {
                error!(
                    "Producer {=u8} - queue full, dropped message {=u32}",
                    self.id.number(),
                    message.counter()
                );
                Err(err.into())
            }
        }
    }

    /// Send a message every period, forever
    pub fn run<C>(&mut self, clock: &C) -> !
    where
        C: Timebase,
    {
        loop {
            info!("Producer {=u8} is sending a message", self.id.number());
            // a failed send was logged by `step`, and there is nothing more to do
            let _ = self.step();
            clock.delay(self.id.period());
        }
    }
}

/// Entry point for a producer task
pub fn producer_task<const N: usize>(config: &'static ProducerConfig<N>) -> ! {
    let mut producer = Producer::new(config.id, config.queue);
    producer.run(&SystemClock)
}


// End of File
