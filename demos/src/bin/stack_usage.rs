//! Two periodic tasks that report how much of their stack they have used
//!
//! Each task logs its stack high water mark when it starts, then says hello
//! and logs the mark again after every period.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use postbox::{Duration, Error, Scheduler, Stack, Task};

use postbox_demos::{SYSTICKS_PER_SCHED_TICK, exit_on_fatal_error};

const TASK_PRIORITY: u8 = 5;

static TASK_LIST: [Task; 2] = [const { Task::empty() }; 2];

static SCHEDULER: Scheduler = Scheduler::new(&TASK_LIST);

/// What each of our tasks is spawned with
struct Greeter {
    /// For the logs
    number: u8,
    /// Time between hellos
    period: Duration,
}

static TASK1: Greeter = Greeter {
    number: 1,
    period: Duration::millis(2000),
};
static TASK1_STACK: Stack<1696> = Stack::new();

static TASK2: Greeter = Greeter {
    number: 2,
    period: Duration::millis(2300),
};
static TASK2_STACK: Stack<1680> = Stack::new();

#[cortex_m_rt::entry]
fn main() -> ! {
    let Some(cp) = cortex_m::Peripherals::take() else {
        exit_on_fatal_error(Error::ResourceExhausted);
    };
    defmt::info!("Hello!");
    if let Err(err) = setup() {
        exit_on_fatal_error(err);
    }
    SCHEDULER.start(cp.SYST, SYSTICKS_PER_SCHED_TICK);
}

fn setup() -> Result<(), Error> {
    SCHEDULER.spawn("task1", greeter, &TASK1, &TASK1_STACK, TASK_PRIORITY)?;
    SCHEDULER.spawn("task2", greeter, &TASK2, &TASK2_STACK, TASK_PRIORITY)?;
    Ok(())
}

/// Our periodic task
fn greeter(config: &'static Greeter) -> ! {
    defmt::info!(
        "task{=u8} before {=usize}",
        config.number,
        postbox::stack_high_water_mark().unwrap_or(0)
    );
    loop {
        defmt::info!("Hello from task{=u8}", config.number);
        postbox::delay(config.period);
        defmt::info!(
            "task{=u8} after {=usize}",
            config.number,
            postbox::stack_high_water_mark().unwrap_or(0)
        );
    }
}

// End of File
