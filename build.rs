//! Build script for postbox
//!
//! Emits the `arm_abi` and `arm_architecture` cfgs the context switch code
//! is selected on. Host builds get neither, which leaves the assembly out.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// Entry point to the build script
fn main() {
    arm_targets::process();
}

// End of File
