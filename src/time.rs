//! Scheduler ticks, and waiting for them

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::Scheduler;

/// How many scheduler ticks there are in one second.
///
/// The SysTick reload value given to [`Scheduler::start`] must produce this
/// rate for [`Duration`]s to mean what they say.
pub const TICK_RATE_HZ: u32 = 1_000;

/// A span of time, counted in scheduler ticks
pub type Duration = fugit::TimerDurationU32<TICK_RATE_HZ>;

/// Something that counts ticks and lets the caller wait for the next one.
///
/// The running [`Scheduler`] is one (see [`SystemClock`]). Tests supply their
/// own.
pub trait Timebase {
    /// Ticks since start-up. Wraps at `u32::MAX`.
    fn now(&self) -> u32;

    /// Give up the CPU until at least the next tick
    fn wait_for_tick(&self);

    /// How many ticks have passed since `start`, allowing for wrap-around
    fn elapsed_since(&self, start: u32) -> u32 {
        self.now().wrapping_sub(start)
    }

    /// Delay the calling task for at least the given period
    fn delay(&self, period: Duration) {
        let start = self.now();
        while self.elapsed_since(start) <= period.ticks() {
            self.wait_for_tick();
        }
    }
}

/// The [`Timebase`] of the running scheduler
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Timebase for SystemClock {
    fn now(&self) -> u32 {
        crate::now()
    }

    fn wait_for_tick(&self) {
        match Scheduler::get_scheduler() {
            Some(scheduler) => scheduler.yield_until_tick(),
            None => core::hint::spin_loop(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use core::cell::Cell;

    /// A clock that moves forward one tick every time somebody waits on it
    #[derive(Default)]
    pub(crate) struct ManualClock {
        ticks: Cell<u32>,
    }

    impl ManualClock {
        pub(crate) fn starting_at(ticks: u32) -> ManualClock {
            ManualClock {
                ticks: Cell::new(ticks),
            }
        }
    }

    impl Timebase for ManualClock {
        fn now(&self) -> u32 {
            self.ticks.get()
        }

        fn wait_for_tick(&self) {
            self.ticks.set(self.ticks.get().wrapping_add(1));
        }
    }

    #[test]
    fn durations_are_in_milliseconds() {
        assert_eq!(Duration::millis(2300).ticks(), 2300);
        assert_eq!(Duration::secs(60).ticks(), 60_000);
    }

    #[test]
    fn delay_waits_past_the_period() {
        let clock = ManualClock::default();
        clock.delay(Duration::millis(5));
        assert_eq!(clock.now(), 6);
    }

    #[test]
    fn delay_across_wrap() {
        let clock = ManualClock::starting_at(u32::MAX - 1);
        clock.delay(Duration::millis(3));
        assert_eq!(clock.now(), 2);
    }
}

// End of File
