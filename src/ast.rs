//! AST module for the wpp language.
//!
//! Nodes live in an append-mostly arena and refer to each other by index.
//! Ids are stable for the lifetime of the arena; evaluation mutates the
//! tree in two narrow ways: a `Var` definition is replaced in place by a
//! `Fn` with a cached body, and `prefix` blocks rewrite the names of the
//! definitions inside them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Index of a node in the arena.
pub type NodeId = usize;

/// Sentinel id meaning "no node", e.g. a `match` without a default arm.
pub const NODE_EMPTY: NodeId = usize::MAX;

/// Rough upper bound on node storage reserved up front, so large inputs
/// don't pay for incremental reallocation.
const PREALLOC_BYTES: usize = 10 * 1024 * 1024;

/// A source location: logical file path, 1-based line and column.
///
/// Every node carries one for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub file: Arc<String>,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(file: Arc<String>, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Tag for a built-in operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntrinsicKind {
    Assert,
    Error,
    File,
    Source,
    Escape,
    Eval,
    Run,
    Pipe,
    Slice,
    Find,
    Length,
    Log,
}

impl IntrinsicKind {
    /// The exact number of arguments the intrinsic takes.
    pub const fn arity(self) -> usize {
        match self {
            Self::Slice => 3,
            Self::Find | Self::Assert | Self::Pipe => 2,
            Self::Error
            | Self::File
            | Self::Source
            | Self::Escape
            | Self::Eval
            | Self::Run
            | Self::Length
            | Self::Log => 1,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "assert" => Some(Self::Assert),
            "error" => Some(Self::Error),
            "file" => Some(Self::File),
            "source" => Some(Self::Source),
            "escape" => Some(Self::Escape),
            "eval" => Some(Self::Eval),
            "run" => Some(Self::Run),
            "pipe" => Some(Self::Pipe),
            "slice" => Some(Self::Slice),
            "find" => Some(Self::Find),
            "length" => Some(Self::Length),
            "log" => Some(Self::Log),
            _ => None,
        }
    }
}

/// The core AST node for wpp programs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Literal text.
    String { value: String, pos: Position },
    /// Concatenation of two expressions, in source order.
    Concat {
        lhs: NodeId,
        rhs: NodeId,
        pos: Position,
    },
    /// Invocation of a named function, or a reference to a bound parameter.
    FnInvoke {
        name: String,
        args: Vec<NodeId>,
        pos: Position,
    },
    /// Function definition. `prefix` blocks rewrite `name` in place.
    Fn {
        name: String,
        params: Vec<String>,
        body: NodeId,
        pos: Position,
    },
    /// Variable definition; replaced by a zero-parameter `Fn` with a
    /// cached body when first evaluated.
    Var {
        name: String,
        body: NodeId,
        pos: Position,
    },
    /// Removes the active overload named by the target invocation.
    Drop { target: NodeId, pos: Position },
    /// Built-in call.
    Intrinsic {
        kind: IntrinsicKind,
        name: String,
        args: Vec<NodeId>,
        pos: Position,
    },
    /// `!expr`, equivalent to `eval(expr)`.
    Codeify { expr: NodeId, pos: Position },
    /// Statements evaluated for their effects, then `expr` for the result.
    Block {
        stmts: Vec<NodeId>,
        expr: NodeId,
        pos: Position,
    },
    /// String-equality switch. `default` is `NODE_EMPTY` when absent.
    Match {
        test: NodeId,
        cases: Vec<(NodeId, NodeId)>,
        default: NodeId,
        pos: Position,
    },
    /// Prefixes the names of functions defined in `stmts`.
    Prefix {
        prefixes: Vec<NodeId>,
        stmts: Vec<NodeId>,
        pos: Position,
    },
    /// Top level of a file or parsed fragment.
    Document { stmts: Vec<NodeId>, pos: Position },
}

impl Node {
    /// Returns the position of this node.
    pub fn pos(&self) -> &Position {
        match self {
            Node::String { pos, .. }
            | Node::Concat { pos, .. }
            | Node::FnInvoke { pos, .. }
            | Node::Fn { pos, .. }
            | Node::Var { pos, .. }
            | Node::Drop { pos, .. }
            | Node::Intrinsic { pos, .. }
            | Node::Codeify { pos, .. }
            | Node::Block { pos, .. }
            | Node::Match { pos, .. }
            | Node::Prefix { pos, .. }
            | Node::Document { pos, .. } => pos,
        }
    }

    /// True for nodes that only make sense in statement position; a block
    /// may not end with one of these.
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Node::Fn { .. } | Node::Var { .. } | Node::Drop { .. } | Node::Prefix { .. }
        )
    }
}

/// Append-mostly arena of nodes.
///
/// `replace` swaps the variant stored at an id without invalidating the
/// id itself; nodes are never removed.
#[derive(Debug)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(PREALLOC_BYTES / std::mem::size_of::<Node>()),
        }
    }

    /// Allocates a fresh id holding `node`.
    pub fn append(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Overwrites the node at `id`, preserving the id.
    pub fn replace(&mut self, id: NodeId, node: Node) {
        self.nodes[id] = node;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Renders the subtree rooted at `id` as an S-expression.
    pub fn sexpr(&self, id: NodeId) -> String {
        match self.get(id) {
            Node::String { value, .. } => format!("{value:?}"),
            Node::Concat { lhs, rhs, .. } => {
                format!("(.. {} {})", self.sexpr(*lhs), self.sexpr(*rhs))
            }
            Node::FnInvoke { name, args, .. } => {
                let mut out = format!("(call {name}");
                for arg in args {
                    out.push(' ');
                    out.push_str(&self.sexpr(*arg));
                }
                out.push(')');
                out
            }
            Node::Fn {
                name, params, body, ..
            } => {
                format!("(let {name} ({}) {})", params.join(" "), self.sexpr(*body))
            }
            Node::Var { name, body, .. } => format!("(var {name} {})", self.sexpr(*body)),
            Node::Drop { target, .. } => format!("(drop {})", self.sexpr(*target)),
            Node::Intrinsic { name, args, .. } => {
                let mut out = format!("({name}");
                for arg in args {
                    out.push(' ');
                    out.push_str(&self.sexpr(*arg));
                }
                out.push(')');
                out
            }
            Node::Codeify { expr, .. } => format!("(! {})", self.sexpr(*expr)),
            Node::Block { stmts, expr, .. } => {
                let mut out = String::from("(block");
                for stmt in stmts {
                    out.push(' ');
                    out.push_str(&self.sexpr(*stmt));
                }
                out.push(' ');
                out.push_str(&self.sexpr(*expr));
                out.push(')');
                out
            }
            Node::Match {
                test,
                cases,
                default,
                ..
            } => {
                let mut out = format!("(match {}", self.sexpr(*test));
                for (key, value) in cases {
                    out.push_str(&format!(" ({} {})", self.sexpr(*key), self.sexpr(*value)));
                }
                if *default != NODE_EMPTY {
                    out.push_str(&format!(" (* {})", self.sexpr(*default)));
                }
                out.push(')');
                out
            }
            Node::Prefix {
                prefixes, stmts, ..
            } => {
                let mut out = String::from("(prefix (");
                for (i, prefix) in prefixes.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&self.sexpr(*prefix));
                }
                out.push(')');
                for stmt in stmts {
                    out.push(' ');
                    out.push_str(&self.sexpr(*stmt));
                }
                out.push(')');
                out
            }
            Node::Document { stmts, .. } => {
                let mut out = String::from("(document");
                for stmt in stmts {
                    out.push(' ');
                    out.push_str(&self.sexpr(*stmt));
                }
                out.push(')');
                out
            }
        }
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}
