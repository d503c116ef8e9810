// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode compiler for Chimp.
//!
//! Transforms AST into bytecode that can be executed by the VM.
//!
//! # Module Structure
//!
//! - `bytecode`: Opcode table, encoding and disassembly
//! - `symbol_table`: Name resolution and free-variable analysis
//! - `codegen`: Code generation from AST
//!   - `codegen::scope`: Per-function instruction buffers and loop targets

pub mod bytecode;
pub mod codegen;
pub mod symbol_table;

pub use bytecode::{Bytecode, Definition, Instructions, OpCode};
pub use codegen::{Compiler, Snapshot};
pub use symbol_table::{Symbol, SymbolScope, SymbolTable};
