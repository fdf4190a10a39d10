//! Appropriate assembly language routines for the architecture, plus the
//! handful of processor operations the scheduler needs.
//!
//! On anything other than an Arm target (i.e. host-side unit tests) the
//! processor operations do nothing and there is no context switch code.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#[cfg(any(arm_architecture = "v6-m", arm_architecture = "v8-m.base"))]
compile_error!("postbox needs an Armv7-M or Armv8-M Mainline processor");

#[cfg(arm_abi = "eabi")]
mod eabi;

#[cfg(arm_abi = "eabihf")]
mod eabihf;

/// Ask for PendSV, which switches to `Scheduler::next_task` once every
/// other exception has finished.
#[cfg(target_arch = "arm")]
pub(crate) fn request_task_switch() {
    cortex_m::peripheral::SCB::set_pendsv();
    // flush the pipeline so the PendSV fires before we carry on
    cortex_m::asm::isb();
}

/// Ask for PendSV, which switches to `Scheduler::next_task` once every
/// other exception has finished.
#[cfg(not(target_arch = "arm"))]
pub(crate) fn request_task_switch() {}

/// Sleep until an interrupt arrives
#[cfg(target_arch = "arm")]
pub(crate) fn wait_for_interrupt() {
    cortex_m::asm::wfi();
    cortex_m::asm::isb();
}

/// Sleep until an interrupt arrives
#[cfg(not(target_arch = "arm"))]
pub(crate) fn wait_for_interrupt() {
    core::hint::spin_loop();
}

// End of File
