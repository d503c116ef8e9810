// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

use std::sync::Arc;

use crate::compiler::Instructions;
use crate::runtime::function::Closure;

/// One active call.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The executing closure
    pub closure: Arc<Closure>,
    /// Offset of the next instruction to execute
    pub ip: usize,
    /// Stack index of the frame's first local (its first argument)
    pub base_pointer: usize,
}

impl Frame {
    /// Creates a frame positioned at the start of `closure`.
    pub fn new(closure: Arc<Closure>, base_pointer: usize) -> Self {
        Self {
            closure,
            ip: 0,
            base_pointer,
        }
    }

    /// The instructions being executed.
    pub fn instructions(&self) -> &Instructions {
        &self.closure.function.instructions
    }
}
