//! Structured, synchronous external process invocation.
//!
//! Commands are described as argument vectors with an explicit working
//! directory and environment map; nothing is ever routed through a shell.
//! All calls block until the child exits. There is no timeout and no
//! cancellation: a hung external command blocks the whole pipeline.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::errors::{ErrorInfo, ReproError};

/// Description of a single external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl Invocation {
    /// Creates an invocation of the given program with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    /// Appends a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends every argument from the iterator.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory the child runs in.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Adds an environment variable override for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// The program being invoked.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The working directory, if one was set.
    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Rendering used for diagnostics only; execution never goes through a
    /// shell, so no quoting is applied.
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    code: i32,
    raw: Vec<u8>,
}

impl CommandOutput {
    /// Exit code exactly as the OS reported it. On unix a child killed by a
    /// signal is reported as the negative signal number.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// True when the command exited zero.
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Combined output decoded as UTF-8, or `None` when the bytes do not
    /// decode. Callers must handle both forms.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.raw).ok()
    }

    /// Combined output with invalid sequences replaced.
    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }

    /// Raw combined output bytes (stdout followed by stderr).
    pub fn bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Synchronous command executor.
///
/// When `verbose` is set, each command line and its captured output are
/// written to stderr before the result is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor {
    verbose: bool,
}

impl Executor {
    /// Creates a quiet executor.
    pub fn new() -> Self {
        Self { verbose: false }
    }

    /// Creates an executor that echoes commands and output to stderr.
    pub fn verbose() -> Self {
        Self { verbose: true }
    }

    /// Runs the command, capturing combined output. A nonzero exit is not an
    /// error here: this is the safe probing form, and the caller inspects
    /// [`CommandOutput::code`]. Only a failure to spawn is an error.
    pub fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ReproError> {
        if self.verbose {
            eprintln!("{}", invocation.display_line());
        }
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }
        let output = command.output().map_err(|err| {
            ReproError::Command(
                ErrorInfo::new("process.spawn", format!("failed to spawn command: {err}"))
                    .with_context("command", invocation.display_line()),
            )
        })?;
        let mut raw = output.stdout;
        raw.extend_from_slice(&output.stderr);
        let code = exit_code(&output.status);
        let captured = CommandOutput { code, raw };
        if self.verbose {
            eprintln!("{}", captured.text_lossy());
        }
        Ok(captured)
    }

    /// Runs the command and fails with a [`ReproError::Command`] carrying the
    /// exit code and captured output when it exits nonzero.
    pub fn run_or_fail(&self, invocation: &Invocation) -> Result<CommandOutput, ReproError> {
        let output = self.run(invocation)?;
        if output.success() {
            return Ok(output);
        }
        Err(ReproError::Command(
            ErrorInfo::new(
                "process.exit",
                format!("command exited with code {}", output.code()),
            )
            .with_context("command", invocation.display_line())
            .with_context("code", output.code().to_string())
            .with_context("output", output.text_lossy().into_owned()),
        ))
    }
}

#[cfg(unix)]
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => code,
        None => -status.signal().unwrap_or(0),
    }
}

#[cfg(not(unix))]
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(0)
}
