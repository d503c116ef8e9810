// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode virtual machine.
//!
//! ## Structure
//!
//! - `interpreter` - The dispatch loop, operand stack and call frames
//! - `frame` - Call frame records
//! - `operators` - Arithmetic, comparison and indexing semantics

mod frame;
mod interpreter;
pub mod operators;

pub use frame::Frame;
pub use interpreter::Vm;

/// Default operand stack size, in values.
pub const STACK_SIZE: usize = 2048;
/// Default global store size, in slots.
pub const GLOBALS_SIZE: usize = 65536;
/// Default call frame limit.
pub const MAX_FRAMES: usize = 1024;

/// Resource limits for a VM run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Operand stack capacity
    pub stack_size: usize,
    /// Global store capacity
    pub globals_size: usize,
    /// Maximum call depth, including the top-level frame
    pub max_frames: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            stack_size: STACK_SIZE,
            globals_size: GLOBALS_SIZE,
            max_frames: MAX_FRAMES,
        }
    }
}
