//! The evaluation environment: base directory, function table, the tree,
//! and the enabled warnings.
//!
//! The function table maps a mangled `name/arity` key to a stack of
//! overloads. Definitions shadow rather than replace; `drop` pops one
//! overload and resurfaces whatever it shadowed.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::ast::{Ast, NodeId};
use crate::diagnostics::Warnings;

/// Bound arguments for one call frame: parameter name to evaluated text.
/// Each frame owns its map; callees copy and extend the caller's.
pub type Arguments = HashMap<String, String>;

/// Key for the function table. Overloading is by arity alone.
pub fn mangle(name: &str, arity: usize) -> String {
    format!("{name}/{arity}")
}

pub struct Environment {
    /// Directory of the input file; included files report their logical
    /// path relative to it.
    pub base: PathBuf,
    /// Overload stacks keyed by mangled name. The last entry is active.
    pub functions: HashMap<String, Vec<NodeId>>,
    pub tree: Ast,
    pub warnings: Warnings,
}

impl Environment {
    pub fn new(base: PathBuf, warnings: Warnings) -> Self {
        Self {
            base,
            functions: HashMap::new(),
            tree: Ast::new(),
            warnings,
        }
    }

    /// Pushes an overload for `(name, arity)`. Returns true when a
    /// previous overload is now shadowed; the caller picks the warning
    /// that applies.
    pub fn define(&mut self, name: &str, arity: usize, id: NodeId) -> bool {
        let stack = self.functions.entry(mangle(name, arity)).or_default();
        let shadowed = !stack.is_empty();
        stack.push(id);
        shadowed
    }

    /// The active overload for `(name, arity)`. An empty stack counts as
    /// not found.
    pub fn lookup(&self, name: &str, arity: usize) -> Option<NodeId> {
        self.functions
            .get(&mangle(name, arity))
            .and_then(|stack| stack.last().copied())
    }

    /// Pops the active overload; the mapping is removed once its stack is
    /// empty. Returns false when no mapping exists at all.
    pub fn drop_overload(&mut self, name: &str, arity: usize) -> bool {
        let mangled = mangle(name, arity);
        let Some(stack) = self.functions.get_mut(&mangled) else {
            return false;
        };
        stack.pop();
        if stack.is_empty() {
            self.functions.remove(&mangled);
        }
        true
    }
}
