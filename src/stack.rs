//! Holds the [`Stack`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::cell::{Cell, UnsafeCell};

use critical_section::Mutex;

/// The word written over every task stack before the task first runs.
///
/// Any word still holding this value has never been touched by the task.
pub const STACK_PAINT: u32 = 0xA5A5_A5A5;

/// A task stack, with the given size `LEN` bytes.
///
/// The value of `LEN` must be a multiple of 4, which is checked with an
/// assert.
///
/// We align stacks on 8-byte boundaries, as required by AAPCS.
#[repr(align(8))]
pub struct Stack<const LEN: usize> {
    /// The memory reserved for the task stack
    contents: UnsafeCell<[u8; LEN]>,
    /// Set once a task has been given this stack
    in_use: Mutex<Cell<bool>>,
}

impl<const LEN: usize> Stack<LEN> {
    /// Create a new stack
    pub const fn new() -> Self {
        assert!(LEN.is_multiple_of(4));
        Self {
            contents: UnsafeCell::new([0u8; LEN]),
            in_use: Mutex::new(Cell::new(false)),
        }
    }

    /// Size of this stack, in bytes
    pub const fn len(&self) -> usize {
        LEN
    }

    /// Is this a zero-sized stack?
    pub const fn is_empty(&self) -> bool {
        LEN == 0
    }

    /// Get the top of the stack
    pub const fn top(&self) -> *mut u32 {
        // SAFETY: Pointing one past this object is allowed, as this is full
        // descending stack and we never write to the 'top' address - only
        // below it
        unsafe { self.contents.get().add(1) as *mut u32 }
    }

    /// Get the lowest address in the stack
    pub const fn bottom(&self) -> *mut u32 {
        self.contents.get() as *mut u32
    }

    /// Mark this stack as belonging to a task.
    ///
    /// Returns `false` if some task already owns it.
    pub(crate) fn claim(&self) -> bool {
        critical_section::with(|cs| {
            let in_use = self.in_use.borrow(cs);
            !in_use.replace(true)
        })
    }

    /// Fill the whole stack with [`STACK_PAINT`]
    ///
    /// # Safety
    ///
    /// No task may be running on this stack.
    pub(crate) unsafe fn paint(&self) {
        // SAFETY: the caller promises nobody is using the stack, and `bottom`
        // is 8-byte aligned with room for `LEN / 4` words
        unsafe { paint_words(self.bottom(), LEN / 4) }
    }

    /// How many bytes at the bottom of the stack have never been written.
    ///
    /// This is the high water mark: the least free space the task has had
    /// since the stack was painted.
    pub fn unused_bytes(&self) -> usize {
        // SAFETY: we only read, and reading a word a task may be writing
        // concurrently just gives us a slightly stale answer
        unsafe { count_painted_words(self.bottom(), LEN / 4) * 4 }
    }
}

/// Write [`STACK_PAINT`] into `words` consecutive words from `bottom`
///
/// # Safety
///
/// `bottom` must be valid for writes of `words` aligned `u32`s
pub(crate) unsafe fn paint_words(bottom: *mut u32, words: usize) {
    for idx in 0..words {
        unsafe { bottom.add(idx).write_volatile(STACK_PAINT) };
    }
}

/// Count the words from `bottom` upwards that still hold [`STACK_PAINT`]
///
/// # Safety
///
/// `bottom` must be valid for reads of `words` aligned `u32`s
pub(crate) unsafe fn count_painted_words(bottom: *const u32, words: usize) -> usize {
    (0..words)
        .take_while(|&idx| unsafe { bottom.add(idx).read_volatile() } == STACK_PAINT)
        .count()
}

/// SAFETY: Our stack object only exposes pointers to itself, so is thread-safe
/// despite containing an `UnsafeCell`.
unsafe impl<const LEN: usize> Sync for Stack<LEN> {}

impl<const LEN: usize> Default for Stack<LEN> {
    fn default() -> Self {
        Stack::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_paint_is_all_unused() {
        let stack: Stack<256> = Stack::new();
        unsafe { stack.paint() };
        assert_eq!(stack.unused_bytes(), 256);
    }

    #[test]
    fn deepest_write_sets_the_mark() {
        let stack: Stack<256> = Stack::new();
        unsafe { stack.paint() };
        // a full descending stack grows down from the top, so the deepest
        // word a task touched is the one closest to the bottom
        unsafe { stack.bottom().add(10).write_volatile(0) };
        assert_eq!(stack.unused_bytes(), 40);
        unsafe { stack.bottom().add(3).write_volatile(0) };
        assert_eq!(stack.unused_bytes(), 12);
    }

    #[test]
    fn unpainted_stack_reports_nothing_free() {
        let stack: Stack<64> = Stack::new();
        assert_eq!(stack.unused_bytes(), 0);
    }

    #[test]
    fn a_stack_is_claimed_once() {
        let stack: Stack<64> = Stack::new();
        assert!(stack.claim());
        assert!(!stack.claim());
    }

    #[test]
    fn top_is_one_past_the_end() {
        let stack: Stack<64> = Stack::new();
        assert_eq!(stack.top() as usize - stack.bottom() as usize, 64);
    }
}

// End of File
