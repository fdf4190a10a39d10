//! A fixed-capacity FIFO queue for passing values between tasks
//!
//! Values are copied in and out by value. Every operation takes a short
//! critical section around the underlying [`heapless::Deque`], so senders and
//! the receiver can live in different tasks, or in an interrupt handler.
//!
//! ```rust,ignore
//! static QUEUE: Queue<u32, 4> = Queue::new();
//!
//! let queue = QUEUE.claim()?;
//! queue.try_send(42).ok();
//! let value = queue.receive(&SystemClock, Duration::millis(100))?;
//! ```

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use heapless::Deque;

use crate::{
    Error,
    time::{Duration, Timebase},
};

/// Errors that [`Queue::try_send`] and [`Queue::send`] can have.
///
/// The value that could not be sent is handed back.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrySendError<T> {
    /// Every slot is taken
    Full(T),
}

impl<T> TrySendError<T> {
    /// Get back the value that was not sent
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(value) => value,
        }
    }
}

impl<T> core::fmt::Debug for TrySendError<T>
where
    T: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TrySendError::Full(v) => write!(f, "Full({v:?})"),
        }
    }
}

impl<T> From<TrySendError<T>> for Error {
    fn from(_: TrySendError<T>) -> Error {
        Error::SendFailed
    }
}

/// Errors that [`Queue::receive`] can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiveError {
    /// Nothing arrived before the wait was over
    Timeout,
}

impl From<ReceiveError> for Error {
    fn from(_: ReceiveError) -> Error {
        Error::ReceiveTimeout
    }
}

/// A bounded queue holding up to `N` values of type `T`.
///
/// Put it in a `static`, [`claim`](Queue::claim) it once at start-up, and
/// hand the resulting `&'static` reference to every task that needs it.
pub struct Queue<T, const N: usize> {
    /// The queued values, oldest at the front
    slots: Mutex<RefCell<Deque<T, N>>>,
    /// Set by the first successful claim
    claimed: Mutex<Cell<bool>>,
}

impl<T, const N: usize> Queue<T, N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Queue {
            slots: Mutex::new(RefCell::new(Deque::new())),
            claimed: Mutex::new(Cell::new(false)),
        }
    }

    /// Hand out this queue for use.
    ///
    /// Only the first call succeeds; a queue is created once and lives
    /// forever. A queue with no slots can never be claimed.
    pub fn claim(&'static self) -> Result<&'static Self, Error> {
        if N == 0 {
            return Err(Error::ResourceExhausted);
        }
        let first = critical_section::with(|cs| !self.claimed.borrow(cs).replace(true));
        if first {
            Ok(self)
        } else {
            Err(Error::ResourceExhausted)
        }
    }

    fn with_slots<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Deque<T, N>) -> R,
    {
        critical_section::with(|cs| f(&mut self.slots.borrow_ref_mut(cs)))
    }

    /// Copy a value into the next free slot, without waiting.
    ///
    /// If the queue is full the value is handed back and nothing else
    /// happens.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        self.with_slots(|slots| slots.push_back(value))
            .map_err(TrySendError::Full)
    }

    /// Copy a value into the next free slot, waiting up to `wait` for one
    /// to become free.
    ///
    /// A `wait` of zero behaves exactly like [`Queue::try_send`].
    pub fn send<C>(&self, clock: &C, mut value: T, wait: Duration) -> Result<(), TrySendError<T>>
    where
        C: Timebase,
    {
        let start = clock.now();
        loop {
            match self.try_send(value) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(rejected)) => value = rejected,
            }
            if clock.elapsed_since(start) >= wait.ticks() {
                return Err(TrySendError::Full(value));
            }
            clock.wait_for_tick();
        }
    }

    /// Take the oldest value, if there is one
    pub fn try_receive(&self) -> Option<T> {
        self.with_slots(|slots| slots.pop_front())
    }

    /// Take the oldest value, waiting up to `wait` for one to arrive
    pub fn receive<C>(&self, clock: &C, wait: Duration) -> Result<T, ReceiveError>
    where
        C: Timebase,
    {
        let start = clock.now();
        loop {
            if let Some(value) = self.try_receive() {
                return Ok(value);
            }
            if clock.elapsed_since(start) >= wait.ticks() {
                return Err(ReceiveError::Timeout);
            }
            clock.wait_for_tick();
        }
    }

    /// How many values are waiting
    pub fn len(&self) -> usize {
        self.with_slots(|slots| slots.len())
    }

    /// Is nothing waiting?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Is every slot taken?
    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    /// How many values this queue can hold
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Default for Queue<T, N> {
    fn default() -> Self {
        Queue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::tests::ManualClock;

    fn leak<T, const N: usize>() -> &'static Queue<T, N> {
        Box::leak(Box::new(Queue::new()))
    }

    #[test]
    fn full() {
        let queue = leak::<u32, 3>();

        for i in 0..3 {
            assert!(!queue.is_full());
            queue.try_send(i).unwrap();
        }

        assert!(queue.is_full());
        assert_eq!(queue.try_send(99), Err(TrySendError::Full(99)));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn fifo_order() {
        let queue = leak::<u32, 4>();
        for i in 10..14 {
            queue.try_send(i).unwrap();
        }
        for i in 10..14 {
            assert_eq!(queue.try_receive(), Some(i));
        }
        assert_eq!(queue.try_receive(), None);
    }

    #[test]
    fn claim_once() {
        let queue = leak::<u8, 2>();
        assert!(queue.claim().is_ok());
        assert_eq!(queue.claim().err(), Some(Error::ResourceExhausted));
    }

    #[test]
    fn receive_times_out() {
        let queue = leak::<u32, 2>();
        let clock = ManualClock::default();
        assert_eq!(
            queue.receive(&clock, Duration::millis(50)),
            Err(ReceiveError::Timeout)
        );
        assert_eq!(clock.now(), 50);
    }

    #[test]
    fn receive_returns_waiting_value_immediately() {
        let queue = leak::<u32, 2>();
        let clock = ManualClock::default();
        queue.try_send(7).unwrap();
        assert_eq!(queue.receive(&clock, Duration::millis(50)), Ok(7));
        assert_eq!(clock.now(), 0);
    }

    #[test]
    fn zero_wait_send_does_not_wait() {
        let queue = leak::<u32, 1>();
        let clock = ManualClock::default();
        queue.try_send(1).unwrap();
        assert_eq!(
            queue.send(&clock, 2, Duration::from_ticks(0)),
            Err(TrySendError::Full(2))
        );
        assert_eq!(clock.now(), 0);
    }

    #[test]
    fn timed_send_gives_up_after_the_wait() {
        let queue = leak::<u32, 1>();
        let clock = ManualClock::default();
        queue.try_send(1).unwrap();
        assert_eq!(
            queue.send(&clock, 2, Duration::millis(10)),
            Err(TrySendError::Full(2))
        );
        assert_eq!(clock.now(), 10);
        assert_eq!(queue.try_receive(), Some(1));
    }

    #[test]
    fn errors_convert() {
        assert_eq!(Error::from(TrySendError::Full(3u8)), Error::SendFailed);
        assert_eq!(Error::from(ReceiveError::Timeout), Error::ReceiveTimeout);
        assert_eq!(TrySendError::Full(3u8).into_inner(), 3);
    }
}

// End of File
