//! Two producers and a consumer sharing a message queue
//!
//! Producer 1 sends every 2000 ms and producer 2 every 2300 ms, without ever
//! blocking, into a queue with room for two messages. The consumer (the
//! "main" task) logs each message, logs and carries on if nothing arrives for
//! a minute, and exits if it ever sees a message it does not recognise.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use postbox::{
    Error, Queue, Scheduler, Stack, Task,
    messaging::{
        ConsumerConfig, MessageQueue, ProducerConfig, ProducerId, QUEUE_LENGTH, RECEIVE_WAIT,
        TASK_PRIORITY, consumer_task, producer_task,
    },
};

use postbox_demos::{SYSTICKS_PER_SCHED_TICK, exit_on_fatal_error};

const PRODUCER_STACK_SIZE: usize = 4096;
const CONSUMER_STACK_SIZE: usize = 4096;

static TASK_LIST: [Task; 3] = [const { Task::empty() }; 3];

static SCHEDULER: Scheduler = Scheduler::new(&TASK_LIST);

static QUEUE: MessageQueue = Queue::new();

static PRODUCER_1: ProducerConfig<QUEUE_LENGTH> = ProducerConfig {
    id: ProducerId::One,
    queue: &QUEUE,
};
static PRODUCER_1_STACK: Stack<PRODUCER_STACK_SIZE> = Stack::new();

static PRODUCER_2: ProducerConfig<QUEUE_LENGTH> = ProducerConfig {
    id: ProducerId::Two,
    queue: &QUEUE,
};
static PRODUCER_2_STACK: Stack<PRODUCER_STACK_SIZE> = Stack::new();

static CONSUMER: ConsumerConfig<QUEUE_LENGTH> = ConsumerConfig {
    queue: &QUEUE,
    wait: RECEIVE_WAIT,
};
static CONSUMER_STACK: Stack<CONSUMER_STACK_SIZE> = Stack::new();

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

/// Create the queue and all three tasks, stopping at the first failure
fn setup() -> Result<(), Error> {
    let queue = QUEUE.claim()?;
    defmt::info!("Queue ready, {=usize} slots", queue.capacity());

    SCHEDULER.spawn(
        "producer1",
        producer_task::<QUEUE_LENGTH>,
        &PRODUCER_1,
        &PRODUCER_1_STACK,
        TASK_PRIORITY,
    )?;
    SCHEDULER.spawn(
        "producer2",
        producer_task::<QUEUE_LENGTH>,
        &PRODUCER_2,
        &PRODUCER_2_STACK,
        TASK_PRIORITY,
    )?;
    SCHEDULER.spawn(
        "main",
        consumer_task::<QUEUE_LENGTH>,
        &CONSUMER,
        &CONSUMER_STACK,
        TASK_PRIORITY,
    )?;
    Ok(())
}

// End of File
