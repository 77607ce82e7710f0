//! Subprocess shim for the `run` and `pipe` intrinsics.
//!
//! Commands go through the platform shell verbatim; the language does no
//! escaping. Stdout is captured, stderr passes through.

use std::io::{self, Write};
use std::process::{Command, ExitStatus, Stdio};

#[cfg(windows)]
const SHELL: (&str, &str) = ("cmd", "/C");
#[cfg(not(windows))]
const SHELL: (&str, &str) = ("sh", "-c");

fn shell(cmd: &str) -> Command {
    let mut command = Command::new(SHELL.0);
    command.arg(SHELL.1).arg(cmd);
    command
}

/// Runs `cmd`, capturing stdout.
pub fn run_command(cmd: &str) -> io::Result<(String, ExitStatus)> {
    let output = shell(cmd)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()?;
    Ok((
        String::from_utf8_lossy(&output.stdout).into_owned(),
        output.status,
    ))
}

/// Runs `cmd` with `input` on its stdin, capturing stdout.
pub fn run_command_with_input(cmd: &str, input: &str) -> io::Result<(String, ExitStatus)> {
    let mut child = shell(cmd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes())?;
        // dropping the handle closes the pipe so the child sees EOF
    }

    let output = child.wait_with_output()?;
    Ok((
        String::from_utf8_lossy(&output.stdout).into_owned(),
        output.status,
    ))
}
