//! Diagnostics for the wpp interpreter.
//!
//! All fatal failures are a single type, [`WppError`]: a position plus a
//! kind. Errors propagate untouched to the top of the interpreter; the
//! `eval` intrinsic is the one place that re-wraps them. Warnings are
//! non-fatal, gated by a [`Warnings`] bitset, and written to stderr.

use std::fmt;
use std::ops::BitOr;

use miette::Diagnostic;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use thiserror::Error;

use crate::ast::Position;

/// A fatal parse or evaluation failure.
#[derive(Debug, Error)]
#[error("{pos}: {kind}")]
pub struct WppError {
    pub pos: Position,
    pub kind: ErrorKind,
}

impl WppError {
    pub fn new(pos: Position, kind: ErrorKind) -> Self {
        Self { pos, kind }
    }
}

/// Everything that can go wrong, with the user-facing message for each.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("{message}")]
    Parse { message: String },
    #[error("{name} takes exactly {expected} arguments")]
    BadArity { name: String, expected: usize },
    #[error("function '{name}' not found")]
    UndefinedFn { name: String },
    #[error("cannot drop undefined function '{name}' ({arity} parameters)")]
    UndefinedDrop { name: String, arity: usize },
    #[error("calling argument '{name}' as if it were a function")]
    ArgAsFn { name: String },
    #[error("no matches found")]
    NoMatch,
    #[error("assertion failed")]
    AssertFailed,
    #[error("{message}")]
    UserError { message: String },
    #[error("{message}")]
    BadRange { message: String },
    #[error("slice extends outside of string bounds")]
    OobRange,
    #[error("failed reading file '{path}'")]
    FileRead { path: String },
    #[error("file '{path}' not found")]
    FileNotFound { path: String },
    #[error("inside eval: {message}")]
    InsideEval { message: String },
    #[error("subprocess exited with non-zero status")]
    SubprocNonZero,
    #[error("run not available")]
    RunDisabled,
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ErrorKind {
    /// Diagnostic code suffix for this kind.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse",
            Self::BadArity { .. } => "bad-arity",
            Self::UndefinedFn { .. } => "undefined-fn",
            Self::UndefinedDrop { .. } => "undefined-drop",
            Self::ArgAsFn { .. } => "arg-as-fn",
            Self::NoMatch => "no-match",
            Self::AssertFailed => "assert-failed",
            Self::UserError { .. } => "user-error",
            Self::BadRange { .. } => "bad-range",
            Self::OobRange => "oob-range",
            Self::FileRead { .. } => "file-read",
            Self::FileNotFound { .. } => "file-not-found",
            Self::InsideEval { .. } => "inside-eval",
            Self::SubprocNonZero => "subproc-nonzero",
            Self::RunDisabled => "run-disabled",
            Self::Internal { .. } => "internal",
        }
    }
}

impl Diagnostic for WppError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("wpp::{}", self.kind.code())))
    }
}

/// Prints a fatal error with full miette diagnostics.
pub fn print_error(error: WppError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}

/// Bitset of enabled warnings. The driver enables all of them; library
/// callers pick their own set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Warnings(u32);

impl Warnings {
    /// A function definition shadowed an existing overload.
    pub const FUNC_REDEFINED: Warnings = Warnings(1 << 0);
    /// A bound parameter hides a zero-parameter function of the same name.
    pub const PARAM_SHADOW_FUNC: Warnings = Warnings(1 << 1);
    /// A parameter rebinds a name inherited from the calling frame.
    pub const PARAM_SHADOW_PARAM: Warnings = Warnings(1 << 2);
    /// A variable definition shadowed an existing overload.
    pub const VARFUNC_REDEFINED: Warnings = Warnings(1 << 3);

    pub const fn none() -> Self {
        Warnings(0)
    }

    pub const fn all() -> Self {
        Warnings(
            Self::FUNC_REDEFINED.0
                | Self::PARAM_SHADOW_FUNC.0
                | Self::PARAM_SHADOW_PARAM.0
                | Self::VARFUNC_REDEFINED.0,
        )
    }

    pub const fn contains(self, other: Warnings) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Warnings {
    type Output = Warnings;

    fn bitor(self, rhs: Warnings) -> Warnings {
        Warnings(self.0 | rhs.0)
    }
}

/// Writes a warning with its position to stderr, colorized when the
/// terminal supports it.
pub fn warn(pos: &Position, message: &str) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    if write_warning(&mut stderr, pos, message).is_err() {
        eprintln!("warning [{pos}]: {message}");
    }
}

fn write_warning(writer: &mut impl WriteColor, pos: &Position, message: &str) -> std::io::Result<()> {
    writer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
    write!(writer, "warning")?;
    writer.reset()?;
    writeln!(writer, " [{pos}]: {message}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_bits_are_independent() {
        let set = Warnings::FUNC_REDEFINED | Warnings::PARAM_SHADOW_PARAM;
        assert!(set.contains(Warnings::FUNC_REDEFINED));
        assert!(set.contains(Warnings::PARAM_SHADOW_PARAM));
        assert!(!set.contains(Warnings::PARAM_SHADOW_FUNC));
        assert!(Warnings::all().contains(Warnings::VARFUNC_REDEFINED));
        assert!(!Warnings::none().contains(Warnings::FUNC_REDEFINED));
    }

    #[test]
    fn error_display_carries_position_and_message() {
        let pos = Position::new(std::sync::Arc::new("input.wpp".to_string()), 3, 7);
        let error = WppError::new(
            pos,
            ErrorKind::UndefinedFn {
                name: "missing".into(),
            },
        );
        assert_eq!(
            error.to_string(),
            "input.wpp:3:7: function 'missing' not found"
        );
        assert_eq!(error.kind.code(), "undefined-fn");
    }
}
