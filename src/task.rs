//! Holds the [`Task`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::{
    cell::Cell,
    sync::atomic::{AtomicPtr, AtomicU8, AtomicUsize, Ordering},
};

use critical_section::Mutex;

use crate::stack;

/// The function a task starts in.
///
/// The argument is whatever `'static` value was handed to
/// [`Scheduler::spawn`](crate::Scheduler::spawn).
pub type TaskEntryFn<T> = fn(&'static T) -> !;

/// The lifecycle of a task slot
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TaskState {
    /// Nobody has spawned into this slot
    Free = 0,
    /// Being filled in by `spawn`
    Reserved = 1,
    /// Can run
    Ready = 2,
    /// Waiting for the next scheduler tick
    Parked = 3,
    /// Called [`exit`](crate::exit) and will never run again
    Exited = 4,
}

impl TaskState {
    const fn from_u8(value: u8) -> TaskState {
        match value {
            0 => TaskState::Free,
            1 => TaskState::Reserved,
            2 => TaskState::Ready,
            3 => TaskState::Parked,
            _ => TaskState::Exited,
        }
    }
}

/// A slot in the scheduler's task table.
///
/// Slots start empty and are filled in by
/// [`Scheduler::spawn`](crate::Scheduler::spawn).
///
/// The PendSV handler finds the saved stack pointer at
/// [`Task::STACK_OFFSET`] and indexes the table by shifting the task ID left
/// by [`Task::SIZE_BITS`], so the layout is `repr(C)` and the size a power of
/// two.
#[repr(C, align(32))]
pub struct Task {
    /// Saved stack pointer while the task is switched out
    stack: AtomicPtr<u32>,
    /// Lowest address of the task's stack
    stack_bottom: AtomicPtr<u32>,
    /// Size of the task's stack in bytes
    stack_len: AtomicUsize,
    /// A [`TaskState`]
    state: AtomicU8,
    /// Bigger numbers run first
    priority: AtomicU8,
    /// For the logs
    name: Mutex<Cell<&'static str>>,
}

const _: () = assert!(core::mem::size_of::<Task>().is_power_of_two());

impl Task {
    /// The offset, in bytes, to the saved stack pointer
    pub(crate) const STACK_OFFSET: usize = core::mem::offset_of!(Task, stack);

    /// log2 of the size of a [`Task`], for the context switch code
    pub(crate) const SIZE_BITS: u32 = core::mem::size_of::<Task>().trailing_zeros();

    /// Create an empty task slot
    pub const fn empty() -> Task {
        Task {
            stack: AtomicPtr::new(core::ptr::null_mut()),
            stack_bottom: AtomicPtr::new(core::ptr::null_mut()),
            stack_len: AtomicUsize::new(0),
            state: AtomicU8::new(TaskState::Free as u8),
            priority: AtomicU8::new(0),
            name: Mutex::new(Cell::new("")),
        }
    }

    /// Fill in a slot that [`Task::try_reserve`] handed us.
    ///
    /// The slot stays [`TaskState::Reserved`] until [`Task::make_ready`].
    pub(crate) fn assign(
        &self,
        name: &'static str,
        stack_bottom: *mut u32,
        stack_len: usize,
        priority: u8,
    ) {
        critical_section::with(|cs| self.name.borrow(cs).set(name));
        self.stack_bottom.store(stack_bottom, Ordering::Relaxed);
        self.stack_len.store(stack_len, Ordering::Relaxed);
        self.priority.store(priority, Ordering::Relaxed);
    }

    /// Take this slot if it is free.
    ///
    /// Must be called inside a critical section so two spawns cannot race.
    pub(crate) fn try_reserve(&self, _cs: critical_section::CriticalSection) -> bool {
        if self.state() == TaskState::Free {
            self.set_state(TaskState::Reserved);
            true
        } else {
            false
        }
    }

    /// Give back a slot that [`Task::try_reserve`] handed us but we could
    /// not use
    pub(crate) fn release(&self) {
        if self.state() == TaskState::Reserved {
            self.set_state(TaskState::Free);
        }
    }

    /// Let the scheduler pick this task
    pub(crate) fn make_ready(&self) {
        self.set_state(TaskState::Ready);
    }

    /// Get the current stack pointer for this task
    pub fn stack(&self) -> *mut u32 {
        self.stack.load(Ordering::Relaxed)
    }

    /// Set the current stack pointer for this task
    ///
    /// # Safety
    ///
    /// The task will execute using the stack given, so it must point to the
    /// last item in a valid Arm EABI stack, with a full saved-state frame
    /// preceding it.
    pub unsafe fn set_stack(&self, new_stack: *mut u32) {
        self.stack.store(new_stack, Ordering::Relaxed)
    }

    /// The name given at spawn time
    pub fn name(&self) -> &'static str {
        critical_section::with(|cs| self.name.borrow(cs).get())
    }

    /// The priority given at spawn time
    pub fn priority(&self) -> u8 {
        self.priority.load(Ordering::Relaxed)
    }

    /// Where this task is in its lifecycle
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: TaskState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Can the scheduler switch to this task right now?
    pub fn is_runnable(&self) -> bool {
        self.state() == TaskState::Ready
    }

    /// Stop running this task until the next tick
    pub(crate) fn park(&self) {
        if self.state() == TaskState::Ready {
            self.set_state(TaskState::Parked);
        }
    }

    /// A tick happened, so parked tasks can run again
    pub(crate) fn unpark(&self) {
        if self.state() == TaskState::Parked {
            self.set_state(TaskState::Ready);
        }
    }

    /// Never run this task again
    pub(crate) fn retire(&self) {
        self.set_state(TaskState::Exited);
    }

    /// How many bytes of this task's stack have never been used
    ///
    /// Returns `None` for a slot nobody has spawned into.
    pub fn stack_high_water_mark(&self) -> Option<usize> {
        let bottom = self.stack_bottom.load(Ordering::Relaxed);
        if bottom.is_null() {
            return None;
        }
        let words = self.stack_len.load(Ordering::Relaxed) / 4;
        // SAFETY: `assign` stored the bottom and length of a `'static` Stack
        Some(unsafe { stack::count_painted_words(bottom, words) } * 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn park_only_touches_ready_tasks() {
        let task = Task::empty();
        task.park();
        assert_eq!(task.state(), TaskState::Free);
        task.make_ready();
        task.park();
        assert_eq!(task.state(), TaskState::Parked);
        assert!(!task.is_runnable());
        task.unpark();
        assert!(task.is_runnable());
    }

    #[test]
    fn retired_tasks_stay_retired() {
        let task = Task::empty();
        task.make_ready();
        task.retire();
        task.unpark();
        assert_eq!(task.state(), TaskState::Exited);
    }

    #[test]
    fn empty_slot_has_no_stack_report() {
        assert_eq!(Task::empty().stack_high_water_mark(), None);
    }

    #[test]
    fn layout_fits_the_context_switch() {
        assert_eq!(1usize << Task::SIZE_BITS, core::mem::size_of::<Task>());
    }
}

// End of File
