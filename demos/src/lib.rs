//! Common panic/fault/timestamp handlers and board settings for the demos

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]

use defmt_semihosting as _;

/// SysTick counts at the core clock, which QEMU's LM3S6965 runs at 12 MHz
pub const CORE_CLOCK_HZ: u32 = 12_000_000;

/// SysTick reload value that gives us [`postbox::TICK_RATE_HZ`] ticks a second
pub const SYSTICKS_PER_SCHED_TICK: u32 = CORE_CLOCK_HZ / postbox::TICK_RATE_HZ;

/// Give up before the scheduler ever started.
///
/// Logs the error, then ends the QEMU session with a failure code.
pub fn exit_on_fatal_error(err: postbox::Error) -> ! {
    defmt::error!("Fatal error during start-up: {}", err);
    defmt::info!("Exiting");
    semihosting::process::exit(1);
}

/// Called when a panic occurs.
///
/// Logs the panic to defmt and then ends the QEMU session.
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    defmt::println!("PANIC: {}", defmt::Debug2Format(info));
    semihosting::process::abort();
}

/// Called when a HardFault occurs.
///
/// Logs the fault to defmt and then crashes the CPU.
#[cortex_m_rt::exception]
unsafe fn HardFault(info: &cortex_m_rt::ExceptionFrame) -> ! {
    defmt::println!("FAULT: {}", defmt::Debug2Format(info));
    cortex_m::asm::udf();
}

// Log scheduler ticks and the running task in the defmt logs
defmt::timestamp!("{=u32:010} {}", postbox::now(), postbox::task_id());

// End of File
