//! Defines the command-line arguments for the wpp binary.
//!
//! This module uses the `clap` crate with its "derive" feature to create
//! a declarative and type-safe argument parsing structure.

use clap::Parser;
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "wpp",
    version,
    about = "A small macro language for producing and manipulating strings"
)]
pub struct WppArgs {
    /// File to read input from.
    #[arg(short, long, required_unless_present = "repl")]
    pub input: Option<PathBuf>,

    /// File to output to (stdout by default).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the AST as an S-expression.
    #[arg(short, long)]
    pub sexpr: bool,

    /// Start an interactive prompt.
    #[arg(short, long)]
    pub repl: bool,
}
