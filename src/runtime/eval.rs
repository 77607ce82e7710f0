//! The tree-walking evaluator.
//!
//! `eval` takes a node id, the environment, and the bound arguments of
//! the enclosing call frame; it returns the text the subtree produces.
//! Definitions yield the empty string and mutate the environment (and,
//! for `Var` and `prefix`, the tree itself).

use crate::ast::{Node, NodeId, Position, NODE_EMPTY};
use crate::diagnostics::{self, ErrorKind, Warnings, WppError};
use crate::runtime::env::{Arguments, Environment};
use crate::runtime::intrinsics;

/// Evaluates the subtree rooted at `node`, returning the text it yields.
pub fn eval(
    node: NodeId,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    // The tree grows and mutates underneath us (eval/source append,
    // Var rewrites in place), so dispatch works on a copy of the node.
    let current = env.tree.get(node).clone();

    match current {
        Node::String { value, .. } => Ok(value),

        Node::Concat { lhs, rhs, .. } => {
            let mut out = eval(lhs, env, args)?;
            out.push_str(&eval(rhs, env, args)?);
            Ok(out)
        }

        Node::Document { stmts, .. } => {
            let mut out = String::new();
            for stmt in stmts {
                out.push_str(&eval(stmt, env, args)?);
            }
            Ok(out)
        }

        Node::Block { stmts, expr, .. } => {
            // Statements only contribute their effects; the trailing
            // expression alone decides the block's text.
            for stmt in stmts {
                eval(stmt, env, args)?;
            }
            eval(expr, env, args)
        }

        Node::Fn {
            name, params, pos, ..
        } => {
            let shadowed = env.define(&name, params.len(), node);
            if shadowed && env.warnings.contains(Warnings::FUNC_REDEFINED) {
                diagnostics::warn(&pos, &format!("function '{name}' redefined"));
            }
            Ok(String::new())
        }

        Node::Var { name, body, pos } => {
            // Materialize: cache the evaluated body as a literal, then
            // turn this very node into a zero-parameter function.
            let text = eval(body, env, args)?;
            env.tree.replace(
                body,
                Node::String {
                    value: text,
                    pos: pos.clone(),
                },
            );
            env.tree.replace(
                node,
                Node::Fn {
                    name: name.clone(),
                    params: Vec::new(),
                    body,
                    pos: pos.clone(),
                },
            );

            let shadowed = env.define(&name, 0, node);
            if shadowed && env.warnings.contains(Warnings::VARFUNC_REDEFINED) {
                diagnostics::warn(&pos, &format!("function/variable '{name}' redefined"));
            }
            Ok(String::new())
        }

        Node::Drop { target, pos } => {
            let Node::FnInvoke { name, args: invoke_args, .. } = env.tree.get(target) else {
                return Err(WppError::new(
                    pos,
                    ErrorKind::Internal {
                        message: "drop target is not a function invocation".into(),
                    },
                ));
            };
            let name = name.clone();
            let arity = invoke_args.len();

            if !env.drop_overload(&name, arity) {
                return Err(WppError::new(pos, ErrorKind::UndefinedDrop { name, arity }));
            }
            Ok(String::new())
        }

        Node::Codeify { expr, pos } => intrinsics::eval_fragment(expr, &pos, env, args),

        Node::Match {
            test,
            cases,
            default,
            pos,
        } => {
            let test_text = eval(test, env, args)?;
            for (key, value) in cases {
                if eval(key, env, args)? == test_text {
                    return eval(value, env, args);
                }
            }
            if default != NODE_EMPTY {
                return eval(default, env, args);
            }
            Err(WppError::new(pos, ErrorKind::NoMatch))
        }

        Node::Prefix {
            prefixes, stmts, ..
        } => {
            let mut out = String::new();
            for stmt in stmts {
                let is_definition = matches!(env.tree.get(stmt), Node::Fn { .. });
                let is_nested_prefix = matches!(env.tree.get(stmt), Node::Prefix { .. });

                if is_definition {
                    // Composite prefix: the list is walked back to front
                    // so the outermost block contributes first.
                    let mut qualified = String::new();
                    for expr in prefixes.iter().rev() {
                        qualified.push_str(&eval(*expr, env, args)?);
                    }
                    if let Node::Fn { name, .. } = env.tree.get_mut(stmt) {
                        name.insert_str(0, &qualified);
                    }
                } else if is_nested_prefix {
                    // A nested prefix inherits the outer qualifiers.
                    if let Node::Prefix { prefixes: inner, .. } = env.tree.get_mut(stmt) {
                        inner.extend_from_slice(&prefixes);
                    }
                }

                out.push_str(&eval(stmt, env, args)?);
            }
            Ok(out)
        }

        Node::Intrinsic {
            kind,
            name,
            args: exprs,
            pos,
        } => {
            if exprs.len() != kind.arity() {
                return Err(WppError::new(
                    pos,
                    ErrorKind::BadArity {
                        name,
                        expected: kind.arity(),
                    },
                ));
            }
            intrinsics::dispatch(kind, &exprs, &pos, env, args)
        }

        Node::FnInvoke {
            name,
            args: call_args,
            pos,
        } => eval_invoke(name, call_args, pos, env, args),
    }
}

/// Resolves a name: bound parameters win over functions, and functions
/// are looked up by `(name, argument count)`.
fn eval_invoke(
    name: String,
    call_args: Vec<NodeId>,
    pos: Position,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    if let Some(bound) = args {
        if let Some(text) = bound.get(&name) {
            if !call_args.is_empty() {
                return Err(WppError::new(pos, ErrorKind::ArgAsFn { name }));
            }
            if env.warnings.contains(Warnings::PARAM_SHADOW_FUNC) && env.lookup(&name, 0).is_some()
            {
                diagnostics::warn(&pos, &format!("parameter '{name}' is shadowing a function"));
            }
            return Ok(text.clone());
        }
    }

    let Some(fn_id) = env.lookup(&name, call_args.len()) else {
        return Err(WppError::new(pos, ErrorKind::UndefinedFn { name }));
    };

    let Node::Fn {
        name: callee_name,
        params,
        body,
        pos: callee_pos,
    } = env.tree.get(fn_id).clone()
    else {
        return Err(WppError::new(
            pos,
            ErrorKind::Internal {
                message: "function table entry is not a definition".into(),
            },
        ));
    };

    // The callee inherits the caller's bindings, then binds its own
    // parameters over the top. Argument expressions are evaluated once,
    // left to right, in the caller's frame.
    let mut frame: Arguments = args.cloned().unwrap_or_default();
    for (param, expr) in params.iter().zip(&call_args) {
        let value = eval(*expr, env, args)?;
        let shadowed = frame.insert(param.clone(), value).is_some();
        if shadowed && env.warnings.contains(Warnings::PARAM_SHADOW_PARAM) {
            diagnostics::warn(
                &callee_pos,
                &format!(
                    "parameter '{param}' inside function '{callee_name}' shadows a parameter from the parent scope"
                ),
            );
        }
    }

    eval(body, env, Some(&frame))
}
