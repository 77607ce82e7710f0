pub use crate::ast::{Ast, IntrinsicKind, Node, NodeId, Position, NODE_EMPTY};
pub use crate::diagnostics::{ErrorKind, Warnings, WppError};

pub mod ast;
pub mod cli;
pub mod diagnostics;
pub mod repl;
pub mod runtime;
pub mod syntax;
