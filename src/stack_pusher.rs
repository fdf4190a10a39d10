//! Holds the [`StackPusher`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// The value of the Processor Status Register when a task starts
///
/// The only bit we need to set is the T bit, to indicate that the
/// task should run in Thumb mode (the only supported mode on Armv7-M)
const DEFAULT_XPSR: u32 = 1 << 24;

/// EXC_RETURN value for "Thread mode, Process Stack, no FPU frame"
const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

/// A helper for pushing things into a full-descending Arm EABI stack
pub(crate) struct StackPusher(*mut u32);

impl StackPusher {
    /// Make a new full-descending stack from the given pointer
    ///
    /// It will not write to the given pointer, but it will write immediately
    /// below it - because this is a Full Descending stack.
    ///
    /// # Safety
    ///
    /// There must be enough free space below the given pointer to accept all
    /// the items you are going to push.
    pub(crate) unsafe fn new(stack_top: *mut u32) -> StackPusher {
        StackPusher(stack_top)
    }

    /// Push something onto the stack, decrementing the pointer
    pub(crate) fn push(&mut self, value: u32) {
        self.0 = unsafe { self.0.offset(-1) };
        unsafe {
            self.0.write_volatile(value);
        }
    }

    /// Push the frame a task needs so that PendSV can 'return' into it.
    ///
    /// First comes the standard Arm exception frame, which the hardware pops
    /// on exception return, with `arg` in R0 so the entry function receives
    /// it as its first argument. Then the registers our PendSV handler pops
    /// itself: a copy of LR (EXC_RETURN) and R4 to R11.
    pub(crate) fn push_initial_frame(&mut self, entry: usize, arg: usize) {
        // xPSR
        self.push(DEFAULT_XPSR);
        // PC
        self.push(entry as u32);
        // LR - tasks never return, so there is nothing to return to
        self.push(0);
        // R12
        self.push(0);
        // R3, R2, R1
        self.push(0);
        self.push(0);
        self.push(0);
        // R0
        self.push(arg as u32);

        // This copy of LR does not have the FPU bit set, so we don't need to
        // push an Extended Frame above, or the high FPU registers.
        self.push(EXC_RETURN_THREAD_PSP);

        // R11 down to R4
        for _ in 0..8 {
            self.push(0);
        }
    }

    /// Get the current stack value
    pub(crate) fn current(&self) -> *mut u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_frame_layout() {
        let mut buffer = [0u32; 32];
        let top = unsafe { buffer.as_mut_ptr().add(buffer.len()) };
        let mut pusher = unsafe { StackPusher::new(top) };
        pusher.push_initial_frame(0x0800_1235, 0x2000_0040);
        let sp = pusher.current();
        // seventeen words: 8 hardware-stacked, EXC_RETURN, R4-R11
        assert_eq!(top as usize - sp as usize, 17 * 4);
        assert_eq!(buffer[31], DEFAULT_XPSR);
        assert_eq!(buffer[30], 0x0800_1235);
        assert_eq!(buffer[24], 0x2000_0040);
        assert_eq!(buffer[23], EXC_RETURN_THREAD_PSP);
        assert!(buffer[15..23].iter().all(|&word| word == 0));
    }
}

// End of File
