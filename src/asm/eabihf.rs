//! Armv7-M EABIHF code

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Scheduler, Task, scheduler};

/// PendSV Handler for Armv7-M or Armv8-M Mainline EABIHF
///
/// This is the task switch code. It is called by hardware when the PendSV bit
/// is set and all other interrupts have finished.
///
/// It works like the EABI version, except that a task may have been using
/// the FPU. The hardware tells us so by clearing bit 4 of EXC_RETURN, in
/// which case it has already stacked S0 to S15 and FPSCR, and we must save
/// and restore S16 to S31 ourselves.
///
/// It is a naked function because we do not want the compiler pushing
/// anything else to the stack and re-using registers containing precious task
/// state.
#[unsafe(no_mangle)]
#[unsafe(naked)]
unsafe extern "C" fn PendSV() {
    // NOTE: This code must NOT touch r4-r11. It can ONLY touch r0-r3 and r12,
    // because those registers were stacked by the hardware on exception entry.

    core::arch::naked_asm!(r#"
    // Workaround https://github.com/rust-lang/rust/issues/127269
    .fpu vfpv3

    // r1 = the address of the Scheduler object
    ldr      r1, ={scheduler_ptr}
    ldr      r1, [r1]

    // r2 = the current task ID
    ldr      r2, [r1, {current_task_offset}]

    // r3 = the base of the task table
    ldr      r3, [r1, {task_list_offset}]

    // no current task (first switch after start) means nothing to save
    cmp      r2, #-1
    beq      1f

    // r12 = the current task's slot
    add      r12, r3, r2, lsl #{task_size_bits}

    mrs      r0, psp

    // bit 4 of EXC_RETURN clear means the task used the FPU
    tst      lr, #0x10
    it       eq
    vstmdbeq r0!, {{ s16 - s31 }}

    // save r4-r11 and EXC_RETURN
    stmdb    r0!, {{ r4 - r11, lr }}
    str      r0, [r12, #{task_stack_offset}]

    1:

    // r2 = the next task ID, r12 = its slot
    ldr      r2, [r1, {next_task_offset}]
    add      r12, r3, r2, lsl #{task_size_bits}

    // restore r4-r11 and EXC_RETURN
    ldr      r0, [r12, #{task_stack_offset}]
    ldmia    r0!, {{ r4 - r11, lr }}

    // and the high FPU registers, if this task had them saved
    tst      lr, #0x10
    it       eq
    vldmiaeq r0!, {{ s16 - s31 }}

    msr      psp, r0

    // the next task is now the current task
    str      r2, [r1, {current_task_offset}]

    // exception return into the task
    bx       lr
    "#,
    scheduler_ptr = sym scheduler::SCHEDULER_PTR,
    current_task_offset = const Scheduler::CURRENT_TASK_OFFSET,
    next_task_offset = const Scheduler::NEXT_TASK_OFFSET,
    task_list_offset = const Scheduler::TASK_LIST_OFFSET,
    task_size_bits = const Task::SIZE_BITS,
    task_stack_offset = const Task::STACK_OFFSET,
    );
}

// End of File
