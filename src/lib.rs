//! # postbox
//!
//! A small pre-emptive RTOS for Arm Cortex-M, with a bounded message queue
//! for passing values between tasks.
//!
//! * Tasks are spawned into a fixed table of slots, each with its own
//!   [`Stack`], and are switched by PendSV on every SysTick.
//! * The highest priority ready task runs; equal priorities take turns.
//! * [`delay`] parks the calling task until enough ticks have gone by.
//! * [`Queue`] is a fixed-capacity FIFO that tasks share by `&'static`
//!   reference.
//! * [`messaging`] holds the producer/consumer tasks that run over a queue.
//!
//! Enable the `defmt` feature to get kernel logs through `defmt`.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![cfg_attr(not(test), no_std)]

mod fmt;

mod asm;
mod error;
pub mod messaging;
pub mod queue;
mod scheduler;
mod stack;
mod stack_pusher;
mod task;
pub mod time;

pub use error::Error;
pub use queue::Queue;
pub use scheduler::{Scheduler, TaskId};
pub use stack::{STACK_PAINT, Stack};
use stack_pusher::StackPusher;
pub use task::{Task, TaskEntryFn, TaskState};
pub use time::{Duration, SystemClock, TICK_RATE_HZ, Timebase};

/// Delay the current task for at least the given period
pub fn delay(period: Duration) {
    SystemClock.delay(period)
}

/// Get the current time in ticks
pub fn now() -> u32 {
    match Scheduler::get_scheduler() {
        Some(scheduler) => scheduler.now(),
        None => 0xFFFF_FFFF,
    }
}

/// Get the ID of the running task
pub fn task_id() -> TaskId {
    match Scheduler::get_scheduler() {
        Some(scheduler) => scheduler.current_task_id(),
        None => TaskId::invalid(),
    }
}

/// Spawn a task on the running scheduler
///
/// See [`Scheduler::spawn`]. Fails with [`Error::ResourceExhausted`] if the
/// scheduler has not been started.
pub fn spawn<T, const LEN: usize>(
    name: &'static str,
    entry: TaskEntryFn<T>,
    arg: &'static T,
    stack: &'static Stack<LEN>,
    priority: u8,
) -> Result<TaskId, Error>
where
    T: Sync,
{
    Scheduler::get_scheduler()
        .ok_or(Error::ResourceExhausted)?
        .spawn(name, entry, arg, stack, priority)
}

/// End the current task. The others carry on.
pub fn exit() -> ! {
    match Scheduler::get_scheduler() {
        Some(scheduler) => scheduler.exit_current(),
        None => loop {
            asm::wait_for_interrupt();
        },
    }
}

/// Least free stack space, in bytes, the current task has had since it was
/// spawned
pub fn stack_high_water_mark() -> Option<usize> {
    let scheduler = Scheduler::get_scheduler()?;
    scheduler.stack_high_water_mark(scheduler.current_task_id())
}

/// SysTick Handler
#[cfg(target_arch = "arm")]
#[unsafe(no_mangle)]
extern "C" fn SysTick() {
    if let Some(scheduler) = Scheduler::get_scheduler() {
        scheduler.sched_tick();
    }
}

// End of File
