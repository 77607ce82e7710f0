//! wpp REPL (Read-Eval-Print Loop)
//!
//! Provides an interactive shell for evaluating wpp code with a
//! persistent environment: definitions from earlier lines stay in scope.

use std::io::{self, Write};
use std::path::PathBuf;

use crate::diagnostics::{print_error, Warnings};
use crate::runtime::env::Environment;
use crate::runtime::eval::eval;
use crate::syntax::parser;

/// REPL state that persists across evaluations.
pub struct ReplState {
    env: Environment,
    line_number: usize,
}

impl ReplState {
    pub fn new() -> Self {
        let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            env: Environment::new(base, Warnings::all()),
            line_number: 1,
        }
    }

    /// Evaluates one input in the persistent context, printing the text
    /// it yields.
    pub fn eval_line(&mut self, input: &str) -> Result<(), ()> {
        let source_name = format!("<repl:{}>", self.line_number);
        self.line_number += 1;

        let result = match parser::parse(input, &source_name, &mut self.env.tree) {
            Ok(root) => eval(root, &mut self.env, None),
            Err(error) => Err(error),
        };

        match result {
            Ok(text) => {
                if !text.is_empty() {
                    println!("{text}");
                }
                Ok(())
            }
            Err(error) => {
                print_error(error);
                Err(())
            }
        }
    }
}

impl Default for ReplState {
    fn default() -> Self {
        Self::new()
    }
}

/// Main REPL entry point; returns the process exit code.
pub fn run_repl() -> i32 {
    println!("wpp interactive prompt");
    println!("Type :help for help, :quit to exit, :clear to reset the state");
    println!();

    let mut repl_state = ReplState::new();
    let mut input_buffer = String::new();

    loop {
        if input_buffer.is_empty() {
            print!("wpp> ");
        } else {
            print!("  -> ");
        }
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                // EOF (Ctrl+D)
                println!();
                return 0;
            }
            Ok(_) => {
                let line = line.trim();

                if input_buffer.is_empty() && line.starts_with(':') {
                    match handle_repl_command(line, &mut repl_state) {
                        ReplCommand::Continue => continue,
                        ReplCommand::Quit => return 0,
                    }
                }

                if !input_buffer.is_empty() {
                    input_buffer.push(' ');
                }
                input_buffer.push_str(line);

                // Hold incomplete input until its delimiters balance; an
                // empty line forces evaluation anyway.
                if is_complete_input(&input_buffer) || line.is_empty() {
                    let _ = repl_state.eval_line(&input_buffer);
                    input_buffer.clear();
                }
            }
            Err(error) => {
                eprintln!("Error reading input: {error}");
                return 1;
            }
        }
    }
}

/// REPL command results.
enum ReplCommand {
    Continue,
    Quit,
}

/// Handle special REPL commands that start with ':'.
fn handle_repl_command(command: &str, state: &mut ReplState) -> ReplCommand {
    match command.to_ascii_lowercase().as_str() {
        ":help" | ":h" => {
            println!("wpp REPL commands:");
            println!("  :help, :h     Show this help");
            println!("  :quit, :q     Exit the REPL");
            println!("  :clear, :c    Reset all definitions");
            println!();
            println!("Enter wpp statements to evaluate them.");
            println!("Multi-line input is held until braces and quotes balance.");
            ReplCommand::Continue
        }
        ":quit" | ":q" => ReplCommand::Quit,
        ":clear" | ":c" => {
            *state = ReplState::new();
            println!("Context cleared.");
            ReplCommand::Continue
        }
        _ => {
            println!("Unknown command: {command}. Type :help for available commands.");
            ReplCommand::Continue
        }
    }
}

/// Heuristic completeness check: braces, parentheses and both quote
/// styles must balance before input is evaluated.
fn is_complete_input(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return false;
    }

    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escape_next = false;

    for c in trimmed.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match (quote, c) {
            (Some(_), '\\') => escape_next = true,
            (Some(open), _) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '{') | (None, '(') => depth += 1,
            (None, '}') | (None, ')') => depth -= 1,
            _ => {}
        }
    }

    depth <= 0 && quote.is_none()
}
