// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Name resolution for the compiler.
//!
//! Tables nest: the outermost table holds globals, each function literal
//! gets a function table, and each block gets a block table. Block tables
//! share their function's frame, so they continue its slot counter and
//! never capture. Function tables turn locals of enclosing frames into
//! free variables.

use rustc_hash::FxHashMap;

/// Where a symbol's value lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolScope {
    /// Slot in the global store
    Global,
    /// Slot in the current frame
    Local,
    /// Entry in the builtin registry
    Builtin,
    /// Entry in the current closure's captured values
    Free,
    /// The currently executing closure itself
    FunctionSelf,
}

/// A resolved name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// The bound name
    pub name: String,
    /// Storage kind
    pub scope: SymbolScope,
    /// Index within the storage kind
    pub index: usize,
}

/// A scope of name bindings.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    store: FxHashMap<String, Symbol>,
    num_definitions: usize,
    max_locals: usize,
    free_symbols: Vec<Symbol>,
    block: bool,
    outer: Option<Box<SymbolTable>>,
}

impl SymbolTable {
    /// Creates the global table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a function table nested in `outer`.
    pub fn new_enclosed(outer: SymbolTable) -> Self {
        Self {
            outer: Some(Box::new(outer)),
            ..Self::default()
        }
    }

    /// Creates a block table nested in `outer`, continuing the slot counter
    /// of the frame `outer` belongs to.
    pub fn new_block(outer: SymbolTable) -> Self {
        let seed = if outer.is_global() {
            0
        } else {
            outer.num_definitions
        };
        Self {
            num_definitions: seed,
            max_locals: seed,
            block: true,
            outer: Some(Box::new(outer)),
            ..Self::default()
        }
    }

    /// Unwraps the enclosing table. Leaving a block hands its slot
    /// high-water mark to the enclosing table.
    pub fn into_outer(self) -> Option<SymbolTable> {
        let mut outer = *self.outer?;
        if self.block {
            outer.max_locals = outer.max_locals.max(self.max_locals);
        }
        Some(outer)
    }

    /// True for the outermost table.
    pub fn is_global(&self) -> bool {
        self.outer.is_none()
    }

    /// True for a block table.
    pub fn is_block(&self) -> bool {
        self.block
    }

    /// Binds `name` at the next slot.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.is_global() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: self.num_definitions,
        };
        self.num_definitions += 1;
        if scope == SymbolScope::Local {
            self.max_locals = self.max_locals.max(self.num_definitions);
        }
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Binds a builtin at a fixed registry index.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Binds the enclosing function's own name inside its body.
    pub fn define_function_name(&mut self, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::FunctionSelf,
            index: 0,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    fn define_free(&mut self, original: Symbol) -> Symbol {
        let symbol = Symbol {
            name: original.name.clone(),
            scope: SymbolScope::Free,
            index: self.free_symbols.len(),
        };
        self.free_symbols.push(original);
        self.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// Resolves `name`, registering free variables at every function
    /// boundary crossed on the way to its definition.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.store.get(name) {
            return Some(symbol.clone());
        }

        let symbol = self.outer.as_mut()?.resolve(name)?;
        match symbol.scope {
            SymbolScope::Global | SymbolScope::Builtin => Some(symbol),
            SymbolScope::Local | SymbolScope::Free | SymbolScope::FunctionSelf => {
                if self.block {
                    Some(symbol)
                } else {
                    Some(self.define_free(symbol))
                }
            }
        }
    }

    /// Symbols captured by this function, in capture order, as seen from
    /// the enclosing scope.
    pub fn free_symbols(&self) -> &[Symbol] {
        &self.free_symbols
    }

    /// Names bound so far in this table.
    pub fn num_definitions(&self) -> usize {
        self.num_definitions
    }

    /// Highest number of frame slots in use at once, including nested blocks
    /// already left.
    pub fn max_locals(&self) -> usize {
        self.max_locals
    }

    /// Every name visible from this table, innermost first.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.store.keys().cloned().collect();
        if let Some(outer) = &self.outer {
            names.extend(outer.names());
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str, scope: SymbolScope, index: usize) -> Symbol {
        Symbol {
            name: name.to_string(),
            scope,
            index,
        }
    }

    #[test]
    fn test_define() {
        let mut global = SymbolTable::new();
        assert_eq!(global.define("a"), sym("a", SymbolScope::Global, 0));
        assert_eq!(global.define("b"), sym("b", SymbolScope::Global, 1));

        let mut first = SymbolTable::new_enclosed(global);
        assert_eq!(first.define("c"), sym("c", SymbolScope::Local, 0));
        assert_eq!(first.define("d"), sym("d", SymbolScope::Local, 1));

        let mut second = SymbolTable::new_enclosed(first);
        assert_eq!(second.define("e"), sym("e", SymbolScope::Local, 0));
    }

    #[test]
    fn test_resolve_global_from_nested() {
        let mut global = SymbolTable::new();
        global.define("a");
        let mut local = SymbolTable::new_enclosed(global);
        local.define("c");

        assert_eq!(local.resolve("a"), Some(sym("a", SymbolScope::Global, 0)));
        assert_eq!(local.resolve("c"), Some(sym("c", SymbolScope::Local, 0)));
        assert!(local.free_symbols().is_empty());
    }

    #[test]
    fn test_resolve_builtins() {
        let mut global = SymbolTable::new();
        global.define_builtin(0, "len");
        global.define_builtin(3, "rest");
        let first = SymbolTable::new_enclosed(global);
        let mut second = SymbolTable::new_enclosed(first);

        assert_eq!(second.resolve("len"), Some(sym("len", SymbolScope::Builtin, 0)));
        assert_eq!(second.resolve("rest"), Some(sym("rest", SymbolScope::Builtin, 3)));
        assert!(second.free_symbols().is_empty());
    }

    #[test]
    fn test_resolve_free() {
        let mut global = SymbolTable::new();
        global.define("a");
        let mut first = SymbolTable::new_enclosed(global);
        first.define("c");
        let mut second = SymbolTable::new_enclosed(first);
        second.define("e");

        assert_eq!(second.resolve("a"), Some(sym("a", SymbolScope::Global, 0)));
        assert_eq!(second.resolve("c"), Some(sym("c", SymbolScope::Free, 0)));
        assert_eq!(second.resolve("e"), Some(sym("e", SymbolScope::Local, 0)));
        assert_eq!(second.free_symbols(), &[sym("c", SymbolScope::Local, 0)]);

        // Resolving again reuses the capture.
        assert_eq!(second.resolve("c"), Some(sym("c", SymbolScope::Free, 0)));
        assert_eq!(second.free_symbols().len(), 1);
    }

    #[test]
    fn test_resolve_chains_through_intermediate_function() {
        let global = SymbolTable::new();
        let mut grandparent = SymbolTable::new_enclosed(global);
        grandparent.define("x");
        let parent = SymbolTable::new_enclosed(grandparent);
        let mut child = SymbolTable::new_enclosed(parent);

        assert_eq!(child.resolve("x"), Some(sym("x", SymbolScope::Free, 0)));
        assert_eq!(child.free_symbols(), &[sym("x", SymbolScope::Free, 0)]);

        let parent = child.into_outer().unwrap();
        assert_eq!(parent.free_symbols(), &[sym("x", SymbolScope::Local, 0)]);
    }

    #[test]
    fn test_unresolvable() {
        let mut global = SymbolTable::new();
        global.define("a");
        let mut local = SymbolTable::new_enclosed(global);
        assert_eq!(local.resolve("b"), None);
    }

    #[test]
    fn test_function_name() {
        let global = SymbolTable::new();
        let mut func = SymbolTable::new_enclosed(global);
        func.define_function_name("fib");
        assert_eq!(func.resolve("fib"), Some(sym("fib", SymbolScope::FunctionSelf, 0)));

        // A parameter of the same name shadows it.
        func.define("fib");
        assert_eq!(func.resolve("fib"), Some(sym("fib", SymbolScope::Local, 0)));
    }

    #[test]
    fn test_function_name_captured_by_inner_function() {
        let global = SymbolTable::new();
        let mut outer = SymbolTable::new_enclosed(global);
        outer.define_function_name("walk");
        let mut inner = SymbolTable::new_enclosed(outer);

        assert_eq!(inner.resolve("walk"), Some(sym("walk", SymbolScope::Free, 0)));
        assert_eq!(
            inner.free_symbols(),
            &[sym("walk", SymbolScope::FunctionSelf, 0)]
        );
    }

    #[test]
    fn test_block_continues_slot_counter() {
        let global = SymbolTable::new();
        let mut func = SymbolTable::new_enclosed(global);
        func.define("a");
        func.define("b");

        let mut block = SymbolTable::new_block(func);
        assert_eq!(block.define("c"), sym("c", SymbolScope::Local, 2));
        assert_eq!(block.resolve("a"), Some(sym("a", SymbolScope::Local, 0)));
        assert!(block.free_symbols().is_empty());

        let func = block.into_outer().unwrap();
        assert_eq!(func.num_definitions(), 2);
        assert_eq!(func.max_locals(), 3);
    }

    #[test]
    fn test_sibling_blocks_share_slots() {
        let global = SymbolTable::new();
        let func = SymbolTable::new_enclosed(global);

        let mut first = SymbolTable::new_block(func);
        assert_eq!(first.define("x").index, 0);
        assert_eq!(first.define("y").index, 1);
        let func = first.into_outer().unwrap();

        let mut second = SymbolTable::new_block(func);
        assert_eq!(second.define("z").index, 0);
        let func = second.into_outer().unwrap();

        assert_eq!(func.max_locals(), 2);
    }

    #[test]
    fn test_top_level_block_uses_frame_slots() {
        let mut global = SymbolTable::new();
        global.define("g");

        let mut block = SymbolTable::new_block(global);
        assert_eq!(block.define("x"), sym("x", SymbolScope::Local, 0));
        assert_eq!(block.resolve("g"), Some(sym("g", SymbolScope::Global, 0)));

        let mut nested = SymbolTable::new_block(block);
        assert_eq!(nested.define("y"), sym("y", SymbolScope::Local, 1));
        let block = nested.into_outer().unwrap();
        let global = block.into_outer().unwrap();

        assert_eq!(global.max_locals(), 2);
        assert_eq!(global.num_definitions(), 1);
    }

    #[test]
    fn test_function_inside_block_captures_block_local() {
        let global = SymbolTable::new();
        let func = SymbolTable::new_enclosed(global);
        let mut block = SymbolTable::new_block(func);
        block.define("n");
        let mut inner = SymbolTable::new_enclosed(block);

        assert_eq!(inner.resolve("n"), Some(sym("n", SymbolScope::Free, 0)));
        assert_eq!(inner.free_symbols(), &[sym("n", SymbolScope::Local, 0)]);
    }
}
