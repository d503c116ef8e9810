// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime types and execution context.

pub mod context;
pub mod function;
pub mod value;

pub use context::{Context, SharedOutput};
pub use function::{Builtin, Closure, CompiledFunction, NativeFunction};
pub use value::{HashEntries, HashKey, HashPair, Value};
