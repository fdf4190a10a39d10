//! The consumer loop

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{
    Duration, Error, Queue, SystemClock, Timebase,
    fmt::{error, info},
};

use super::Message;

/// Where the consumer is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsumerState {
    /// Blocked on the queue
    Waiting,
    /// Holding a message it has not looked at yet
    Dispatching(Message),
    /// Saw something it could not handle, and has stopped for good
    FatalExit(Error),
}

/// What a consumer task is spawned with
pub struct ConsumerConfig<const N: usize> {
    /// Where to receive from
    pub queue: &'static Queue<Message, N>,
    /// How long to wait for each message before logging and waiting again
    pub wait: Duration,
}

/// Takes messages off the queue and reports who sent them
pub struct Consumer<'q, const N: usize> {
    queue: &'q Queue<Message, N>,
    wait: Duration,
    state: ConsumerState,
    received: u32,
}

impl<'q, const N: usize> Consumer<'q, N> {
    /// Create a consumer, which starts off waiting
    pub fn new(queue: &'q Queue<Message, N>, wait: Duration) -> Self {
        Consumer {
            queue,
            wait,
            state: ConsumerState::Waiting,
            received: 0,
        }
    }

    /// Where the consumer is in its loop
    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// How many messages have been dispatched
    pub fn received(&self) -> u32 {
        self.received
    }

    /// Make one move: wait for a message, or deal with the one we have.
    ///
    /// Returns the new state. Once in [`ConsumerState::FatalExit`] this does
    /// nothing.
    pub fn poll<C>(&mut self, clock: &C) -> ConsumerState
    where
        C: Timebase,
    {
        let state = self.state;
        self.state = match state {
            ConsumerState::Waiting => match self.queue.receive(clock, self.wait) {
                Ok(message) => ConsumerState::Dispatching(message),
                Err(_) => {
                    info!("End of wait for a message");
                    ConsumerState::Waiting
                }
            },
            ConsumerState::Dispatching(message) => self.dispatch(message),
            fatal @ ConsumerState::FatalExit(_) => fatal,
        };
        self.state
    }

    fn dispatch(&mut self, message: Message) -> ConsumerState {
        match message.source() {
            Ok(source) => {
                self.received = self.received.wrapping_add(1);
                info!(
                    "Message from producer {=u8} - {=u32}",
                    source.number(),
                    message.counter()
                );
                ConsumerState::Waiting
            }
            Err(err) => {
                error!("Unknown message type: {=u8}", message.tag());
                ConsumerState::FatalExit(err)
            }
        }
    }

    /// Keep going until something fatal happens, and return what it was
    pub fn run<C>(&mut self, clock: &C) -> Error
    where
        C: Timebase,
    {
        loop {
            if let ConsumerState::FatalExit(err) = self.poll(clock) {
                return err;
            }
        }
    }
}

/// Entry point for a consumer task.
///
/// When the consumer stops, the task logs and exits; the producers keep
/// running.
pub fn consumer_task<const N: usize>(config: &'static ConsumerConfig<N>) -> ! {
    let mut consumer = Consumer::new(config.queue, config.wait);
    let err = consumer.run(&SystemClock);
    error!("Consumer stopped: {}", err);
    info!("Exiting");
    crate::exit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{messaging::ProducerId, time::tests::ManualClock};

    fn queue() -> &'static Queue<Message, 2> {
        Box::leak(Box::new(Queue::new()))
    }

    #[test]
    fn message_goes_through_dispatching_and_back() {
        let queue = queue();
        let clock = ManualClock::default();
        let mut consumer = Consumer::new(queue, Duration::millis(100));
        let message = Message::new(ProducerId::One, 4);
        queue.try_send(message).unwrap();

        assert_eq!(consumer.poll(&clock), ConsumerState::Dispatching(message));
        assert_eq!(consumer.poll(&clock), ConsumerState::Waiting);
        assert_eq!(consumer.received(), 1);
    }

    #[test]
    fn timeout_keeps_waiting() {
        let queue = queue();
        let clock = ManualClock::default();
        let mut consumer = Consumer::new(queue, Duration::millis(60_000));

        assert_eq!(consumer.poll(&clock), ConsumerState::Waiting);
        assert_eq!(clock.now(), 60_000);
        assert_eq!(consumer.poll(&clock), ConsumerState::Waiting);
        assert_eq!(clock.now(), 120_000);
    }

    #[test]
    fn unknown_tag_is_fatal_and_final() {
        let queue = queue();
        let clock = ManualClock::default();
        let mut consumer = Consumer::new(queue, Duration::millis(10));
        queue.try_send(Message::from_raw(9, 0)).unwrap();
        queue.try_send(Message::new(ProducerId::Two, 0)).unwrap();

        assert_eq!(consumer.run(&clock), Error::UnrecognizedMessageTag(9));
        assert_eq!(
            consumer.poll(&clock),
            ConsumerState::FatalExit(Error::UnrecognizedMessageTag(9))
        );
        // the good message behind it is never looked at
        assert_eq!(queue.len(), 1);
        assert_eq!(consumer.received(), 0);
    }
}

// End of File
