//! Bridge to the external make-based build tool.
//!
//! The tool answers location queries (`top`, `pbd`) on its last "real"
//! output line. Recursive invocations interleave log lines of the form
//! `make[1]: Entering directory ...` into the same stream, so the payload
//! is found by scanning from the end past that noise.

use std::path::{Path, PathBuf};

use repro_core::{ErrorInfo, Executor, Invocation, ReproError};

/// Handle for querying the external build tool.
#[derive(Debug, Clone)]
pub struct MakeBridge {
    program: String,
    executor: Executor,
}

impl MakeBridge {
    /// Creates a bridge invoking the conventional `make`.
    pub fn new(executor: Executor) -> Self {
        Self::with_program("make", executor)
    }

    /// Creates a bridge invoking a specific tool binary. Tests use this to
    /// substitute a scripted stand-in.
    pub fn with_program(program: impl Into<String>, executor: Executor) -> Self {
        Self {
            program: program.into(),
            executor,
        }
    }

    /// Name of the tool binary this bridge invokes.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Base name the tool prints in its own recursion log lines.
    fn tool_name(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.program)
    }

    /// The executor used for tool invocations.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Resolves the project root by running `<tool> top` in `start_dir`.
    pub fn project_root(&self, start_dir: &Path) -> Result<PathBuf, ReproError> {
        self.location_query(start_dir, "top")
    }

    /// Resolves the build-output directory for a source directory by running
    /// `<tool> pbd` ("print build directory") inside it.
    pub fn build_directory(&self, source_dir: &Path) -> Result<PathBuf, ReproError> {
        self.location_query(source_dir, "pbd")
    }

    fn location_query(&self, dir: &Path, verb: &str) -> Result<PathBuf, ReproError> {
        let invocation = Invocation::new(&self.program)
            .arg(verb)
            .current_dir(dir);
        let output = self.executor.run_or_fail(&invocation)?;
        let text = output.text_lossy();
        let line = payload_line(&text, self.tool_name()).ok_or_else(|| {
            ReproError::Parse(
                ErrorInfo::new(
                    "bridge.no_payload",
                    "build tool output contained only log noise",
                )
                .with_context("command", invocation.display_line())
                .with_context("directory", dir.display().to_string()),
            )
        })?;
        Ok(PathBuf::from(line))
    }
}

/// Selects the payload line from build tool output: the last line that is
/// neither empty nor a recursive-invocation log line.
pub fn payload_line<'a>(output: &'a str, tool: &str) -> Option<&'a str> {
    output
        .lines()
        .rev()
        .map(str::trim_end)
        .find(|line| !line.is_empty() && !is_recursion_log(line, tool))
}

/// Recursive-invocation log lines start with the tool name, a bracketed
/// nonnegative recursion depth, and a colon, e.g. `make[2]:`.
fn is_recursion_log(line: &str, tool: &str) -> bool {
    let Some(rest) = line.strip_prefix(tool) else {
        return false;
    };
    let Some(rest) = rest.strip_prefix('[') else {
        return false;
    };
    let Some(close) = rest.find(']') else {
        return false;
    };
    let digits = &rest[..close];
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && rest[close + 1..].starts_with(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_last_real_line() {
        let output = "make[1]: Entering directory '/src'\n/src/build\nmake[1]: Leaving directory '/src'\n\n";
        assert_eq!(payload_line(output, "make"), Some("/src/build"));
    }

    #[test]
    fn empty_and_noise_only_output_has_no_payload() {
        assert_eq!(payload_line("", "make"), None);
        assert_eq!(
            payload_line("make[1]: Entering\nmake[12]: Leaving\n", "make"),
            None
        );
    }

    #[test]
    fn noise_detection_requires_full_prefix() {
        assert!(is_recursion_log("make[3]: Entering directory", "make"));
        assert!(!is_recursion_log("make: Nothing to be done", "make"));
        assert!(!is_recursion_log("make[]: odd", "make"));
        assert!(!is_recursion_log("make[x]: odd", "make"));
        assert!(!is_recursion_log("remake[1]: other tool", "make"));
        // Lines from a differently-named tool are payload, not noise.
        assert!(!is_recursion_log("make[1]: Entering", "gmake"));
    }

    #[test]
    fn trailing_whitespace_lines_are_skipped() {
        let output = "/top\n   \n\t\n";
        assert_eq!(payload_line(output, "make"), Some("/top"));
    }
}
