// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-function compilation state.

use crate::compiler::bytecode::Instructions;

/// Jump positions collected while compiling one loop body.
#[derive(Debug, Default)]
pub struct LoopContext {
    /// Positions of `break` jumps, patched to the loop exit
    pub breaks: Vec<usize>,
    /// Positions of `continue` jumps, patched to the condition or update
    pub continues: Vec<usize>,
}

/// The instruction buffer of one function being compiled.
///
/// Loop contexts live here rather than on the compiler, so a `break`
/// inside a nested function literal never sees the enclosing loop.
#[derive(Debug, Default)]
pub struct CompilationScope {
    /// Instructions emitted so far
    pub instructions: Instructions,
    /// Enclosing loops within this function, innermost last
    pub loops: Vec<LoopContext>,
}

impl CompilationScope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a loop.
    pub fn begin_loop(&mut self) {
        self.loops.push(LoopContext::default());
    }

    /// Leaves the innermost loop, returning its collected jumps.
    pub fn end_loop(&mut self) -> LoopContext {
        self.loops.pop().unwrap_or_default()
    }

    /// The innermost loop, if any.
    pub fn current_loop(&mut self) -> Option<&mut LoopContext> {
        self.loops.last_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loops_nest() {
        let mut scope = CompilationScope::new();
        assert!(scope.current_loop().is_none());

        scope.begin_loop();
        scope.current_loop().unwrap().breaks.push(3);
        scope.begin_loop();
        scope.current_loop().unwrap().continues.push(7);

        let inner = scope.end_loop();
        assert!(inner.breaks.is_empty());
        assert_eq!(inner.continues, vec![7]);

        let outer = scope.end_loop();
        assert_eq!(outer.breaks, vec![3]);
        assert!(scope.current_loop().is_none());
    }
}
