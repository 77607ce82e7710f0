//! The wpp command-line driver.
//!
//! Loads the input file, moves the working directory to its parent so
//! `file`/`source` resolve relative to the script, parses, evaluates,
//! and writes the produced text.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::cli::args::WppArgs;
use crate::diagnostics::{print_error, Warnings, WppError};
use crate::repl;
use crate::runtime::env::Environment;
use crate::runtime::eval::eval;
use crate::syntax::parser;

pub mod args;

/// Entry point for the binary; returns the process exit code.
pub fn run() -> i32 {
    let args = WppArgs::parse();

    if args.repl {
        return repl::run_repl();
    }

    // clap enforces the presence of --input when --repl is absent.
    let Some(input) = args.input else {
        return 1;
    };

    run_file(&input, args.output.as_deref(), args.sexpr)
}

fn run_file(input: &Path, output: Option<&Path>, sexpr: bool) -> i32 {
    let Ok(text) = fs::read_to_string(input) else {
        eprintln!("file '{}' not found", input.display());
        return 1;
    };

    let Ok(absolute) = input.canonicalize() else {
        eprintln!("cannot resolve path '{}'", input.display());
        return 1;
    };
    let base = absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    if std::env::set_current_dir(&base).is_err() {
        eprintln!("cannot enter directory '{}'", base.display());
        return 1;
    }

    let mut env = Environment::new(base, Warnings::all());
    let logical = input.display().to_string();

    match evaluate_document(&text, &logical, &mut env, sexpr) {
        Ok(produced) => {
            if let Err(error) = write_output(&produced, output) {
                eprintln!("cannot write output: {error}");
                return 1;
            }
            0
        }
        Err(error) => {
            print_error(error);
            1
        }
    }
}

fn evaluate_document(
    source: &str,
    logical: &str,
    env: &mut Environment,
    sexpr: bool,
) -> Result<String, WppError> {
    let root = parser::parse(source, logical, &mut env.tree)?;

    if sexpr {
        eprintln!("{}", env.tree.sexpr(root));
    }

    eval(root, env, None)
}

fn write_output(text: &str, output: Option<&Path>) -> io::Result<()> {
    match output {
        Some(path) => fs::write(path, text),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()
        }
    }
}
