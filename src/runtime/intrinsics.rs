//! Built-in operations.
//!
//! Every intrinsic evaluates its argument expressions left to right and
//! then acts. `eval` and `source` re-enter the parser, appending to the
//! shared tree; `file`, `source`, `run` and `pipe` touch the host.
//! Arity is checked by the evaluator before dispatch.

use std::fs;
use std::path::{Path, PathBuf};

use crate::ast::{IntrinsicKind, NodeId, Position};
use crate::diagnostics::{ErrorKind, WppError};
use crate::runtime::env::{Arguments, Environment};
use crate::runtime::eval::eval;
use crate::syntax::parser;

#[cfg(feature = "run")]
use crate::runtime::exec;

pub fn dispatch(
    kind: IntrinsicKind,
    exprs: &[NodeId],
    pos: &Position,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    match kind {
        IntrinsicKind::Assert => assert_equal(exprs[0], exprs[1], pos, env, args),
        IntrinsicKind::Error => raise(exprs[0], pos, env, args),
        IntrinsicKind::File => file(exprs[0], pos, env, args),
        IntrinsicKind::Source => source(exprs[0], pos, env, args),
        IntrinsicKind::Escape => escape(exprs[0], env, args),
        IntrinsicKind::Eval => eval_fragment(exprs[0], pos, env, args),
        IntrinsicKind::Run => run(exprs[0], pos, env, args),
        IntrinsicKind::Pipe => pipe(exprs[0], exprs[1], pos, env, args),
        IntrinsicKind::Slice => slice(exprs[0], exprs[1], exprs[2], pos, env, args),
        IntrinsicKind::Find => find(exprs[0], exprs[1], env, args),
        IntrinsicKind::Length => length(exprs[0], env, args),
        IntrinsicKind::Log => log(exprs[0], env, args),
    }
}

fn bad_range(pos: &Position, message: &str) -> WppError {
    WppError::new(
        pos.clone(),
        ErrorKind::BadRange {
            message: message.into(),
        },
    )
}

/// Fails unless both arguments evaluate to the same text.
///
/// Usage: assert(<a>, <b>)
///
/// Returns: empty.
fn assert_equal(
    a: NodeId,
    b: NodeId,
    pos: &Position,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    let text_a = eval(a, env, args)?;
    let text_b = eval(b, env, args)?;

    if text_a != text_b {
        return Err(WppError::new(pos.clone(), ErrorKind::AssertFailed));
    }
    Ok(String::new())
}

/// Raises a user error carrying the evaluated message.
///
/// Usage: error(<message>)
///
/// Returns: never returns normally.
fn raise(
    expr: NodeId,
    pos: &Position,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    let message = eval(expr, env, args)?;
    Err(WppError::new(pos.clone(), ErrorKind::UserError { message }))
}

/// Reads a file relative to the current working directory.
///
/// Usage: file(<path>)
///
/// Returns: the file's contents.
fn file(
    expr: NodeId,
    pos: &Position,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    let path = eval(expr, env, args)?;
    fs::read_to_string(&path).map_err(|_| WppError::new(pos.clone(), ErrorKind::FileRead { path }))
}

/// Restores the working directory it captured when dropped, so an
/// included file that fails still puts the directory back.
struct CwdGuard {
    previous: PathBuf,
}

impl CwdGuard {
    fn enter(dir: &Path) -> std::io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        Ok(Self { previous })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.previous);
    }
}

/// Includes another source file: parses it into the shared tree and
/// evaluates it with the working directory moved to its parent, so its
/// own `file`/`source` calls resolve relative to it.
///
/// Usage: source(<path>)
///
/// Returns: the text the included document produces.
fn source(
    expr: NodeId,
    pos: &Position,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    let fname = eval(expr, env, args)?;

    let old_path = std::env::current_dir().map_err(|error| {
        WppError::new(
            pos.clone(),
            ErrorKind::Internal {
                message: format!("cannot determine working directory: {error}"),
            },
        )
    })?;
    let new_path = old_path.join(&fname);

    let text = fs::read_to_string(&new_path)
        .map_err(|_| WppError::new(pos.clone(), ErrorKind::FileNotFound { path: fname.clone() }))?;

    // Included files report positions relative to the original base.
    let logical = new_path
        .strip_prefix(&env.base)
        .unwrap_or(&new_path)
        .display()
        .to_string();
    let root = parser::parse(&text, &logical, &mut env.tree)?;

    let parent = new_path.parent().unwrap_or(old_path.as_path());
    let _guard = CwdGuard::enter(parent).map_err(|error| {
        WppError::new(
            pos.clone(),
            ErrorKind::Internal {
                message: format!("cannot enter directory '{}': {error}", parent.display()),
            },
        )
    })?;

    eval(root, env, args)
}

/// Replaces `"` `'` and the newline, tab and carriage-return characters
/// with their two-character escape forms.
///
/// Usage: escape(<text>)
///
/// Returns: the escaped text.
fn escape(
    expr: NodeId,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    let input = eval(expr, env, args)?;
    let mut out = String::with_capacity(input.len());

    for c in input.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Parses the evaluated text as a document and evaluates it in the same
/// environment. Failures inside the fragment are re-raised at the call
/// site with an `inside eval` prefix.
///
/// Usage: eval(<code>)
///
/// Returns: the text the fragment produces.
///
/// Also backs the `!expr` form.
pub fn eval_fragment(
    expr: NodeId,
    pos: &Position,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    let code = eval(expr, env, args)?;

    let result = match parser::parse(&code, "<eval>", &mut env.tree) {
        Ok(root) => eval(root, env, args),
        Err(error) => Err(error),
    };

    result.map_err(|error| {
        WppError::new(
            pos.clone(),
            ErrorKind::InsideEval {
                message: error.to_string(),
            },
        )
    })
}

/// Runs a shell command and captures its stdout, minus one trailing
/// newline. A non-zero exit status is an error.
///
/// Usage: run(<command>)
///
/// Returns: the command's output.
#[cfg(feature = "run")]
fn run(
    expr: NodeId,
    pos: &Position,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    let cmd = eval(expr, env, args)?;

    let (mut out, status) = exec::run_command(&cmd)
        .map_err(|_| WppError::new(pos.clone(), ErrorKind::SubprocNonZero))?;

    if out.ends_with('\n') {
        out.pop();
    }
    if !status.success() {
        return Err(WppError::new(pos.clone(), ErrorKind::SubprocNonZero));
    }
    Ok(out)
}

#[cfg(not(feature = "run"))]
fn run(
    _expr: NodeId,
    pos: &Position,
    _env: &mut Environment,
    _args: Option<&Arguments>,
) -> Result<String, WppError> {
    Err(WppError::new(pos.clone(), ErrorKind::RunDisabled))
}

/// Like `run`, but feeds the second argument to the command's stdin.
///
/// Usage: pipe(<command>, <input>)
///
/// Returns: the command's output.
#[cfg(feature = "run")]
fn pipe(
    cmd_expr: NodeId,
    data_expr: NodeId,
    pos: &Position,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    let cmd = eval(cmd_expr, env, args)?;
    let data = eval(data_expr, env, args)?;

    let (mut out, status) = exec::run_command_with_input(&cmd, &data)
        .map_err(|_| WppError::new(pos.clone(), ErrorKind::SubprocNonZero))?;

    if out.ends_with('\n') {
        out.pop();
    }
    if !status.success() {
        return Err(WppError::new(pos.clone(), ErrorKind::SubprocNonZero));
    }
    Ok(out)
}

#[cfg(not(feature = "run"))]
fn pipe(
    _cmd_expr: NodeId,
    _data_expr: NodeId,
    pos: &Position,
    _env: &mut Environment,
    _args: Option<&Arguments>,
) -> Result<String, WppError> {
    Err(WppError::new(pos.clone(), ErrorKind::RunDisabled))
}

/// Takes the inclusive byte range `start..=end` out of a string. Either
/// endpoint may be negative to count from the end.
///
/// Usage: slice(<text>, <start>, <end>)
///
/// Returns: the selected substring.
fn slice(
    string_expr: NodeId,
    start_expr: NodeId,
    end_expr: NodeId,
    pos: &Position,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    let string = eval(string_expr, env, args)?;
    let start_raw = eval(start_expr, env, args)?;
    let end_raw = eval(end_expr, env, args)?;

    let (Ok(start), Ok(end)) = (start_raw.parse::<i64>(), end_raw.parse::<i64>()) else {
        return Err(bad_range(pos, "slice range must be numerical"));
    };

    let len = string.len() as i64;

    let begin = if start < 0 { len + start } else { start };
    let count = if end < 0 {
        (len + end) - begin + 1
    } else {
        end - begin + 1
    };

    // The check order decides which message surfaces when several apply.
    if count <= 0 {
        return Err(bad_range(pos, "end of slice cannot be before the start"));
    }
    if begin + count > len {
        return Err(WppError::new(pos.clone(), ErrorKind::OobRange));
    }
    if start < 0 && end >= 0 {
        return Err(bad_range(pos, "start cannot be negative where end is positive"));
    }
    if begin < 0 {
        // start reached below the front of the string
        return Err(WppError::new(pos.clone(), ErrorKind::OobRange));
    }

    let bytes = &string.as_bytes()[begin as usize..(begin + count) as usize];
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// Finds the first occurrence of a pattern.
///
/// Usage: find(<text>, <pattern>)
///
/// Returns: the byte index as decimal text, or empty when absent.
fn find(
    string_expr: NodeId,
    pattern_expr: NodeId,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    let string = eval(string_expr, env, args)?;
    let pattern = eval(pattern_expr, env, args)?;

    Ok(string
        .find(&pattern)
        .map(|index| index.to_string())
        .unwrap_or_default())
}

/// Usage: length(<text>)
///
/// Returns: the byte length as decimal text.
fn length(
    expr: NodeId,
    env: &mut Environment,
    args: Option<&Arguments>,
) -> Result<String, WppError> {
    Ok(eval(expr, env, args)?.len().to_string())
}

/// Writes the evaluated text to the diagnostic stream.
///
/// Usage: log(<text>)
///
/// Returns: empty.
fn log(expr: NodeId, env: &mut Environment, args: Option<&Arguments>) -> Result<String, WppError> {
    eprint!("{}", eval(expr, env, args)?);
    Ok(String::new())
}
