//! Subprocess execution for the document renderer.
//!
//! ```ignore
//! Cmd::new("pandoc")
//!     .args(["--standalone", "index.md", "-o", "index.html"])
//!     .run()?;
//! ```

use std::{
    borrow::Cow,
    ffi::{OsStr, OsString},
    io,
    process::{Command, ExitStatus, Output},
    sync::LazyLock,
};

use regex::Regex;
use thiserror::Error;

use crate::log;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to execute `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Non-zero exit; `stderr` is already stripped of color codes.
    #[error("Command `{program}` failed with {status}{}", tail(.stderr))]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

fn tail(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\n{stderr}")
    }
}

/// Program plus arguments; empty arguments are dropped.
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
}

impl Cmd {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.push(arg.as_ref());
        }
        self
    }

    fn push(&mut self, arg: &OsStr) {
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
    }

    /// Run to completion. Stderr of a successful run is logged as warnings.
    pub fn run(self) -> Result<Output, ExecError> {
        let program = self.program.to_string_lossy().into_owned();

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|source| ExecError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = strip_ansi(stderr.trim()).into_owned();

        if !output.status.success() {
            return Err(ExecError::Failed {
                program,
                status: output.status,
                stderr,
            });
        }

        if !stderr.is_empty() {
            log!(&program; "{}", stderr);
        }
        Ok(output)
    }
}

static ANSI: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").ok());

fn strip_ansi(s: &str) -> Cow<'_, str> {
    match ANSI.as_ref() {
        Some(re) => re.replace_all(s, ""),
        None => Cow::Borrowed(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_args_dropped() {
        let cmd = Cmd::new("pandoc").args(["", "in.md", "", "-o", "out.html"]);
        assert_eq!(cmd.args.len(), 3);
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }

    #[cfg(unix)]
    #[test]
    fn test_success_returns_output() {
        let output = Cmd::new("echo").args(["hello"]).run().unwrap();
        assert!(String::from_utf8_lossy(&output.stdout).contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_carries_stderr() {
        let err = Cmd::new("sh")
            .args(["-c", "printf '\\033[31mboom\\033[0m' >&2; exit 3"])
            .run()
            .unwrap_err();
        let ExecError::Failed { stderr, status, .. } = &err else {
            panic!("expected exit failure, got {err:?}");
        };
        assert_eq!(stderr, "boom");
        assert_eq!(status.code(), Some(3));
        assert!(err.to_string().starts_with("Command `sh` failed"));
        assert!(err.to_string().ends_with("\nboom"));
    }

    #[test]
    fn test_missing_program() {
        let err = Cmd::new("dudu-no-such-renderer").run().unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
        assert!(err.to_string().contains("dudu-no-such-renderer"));
    }
}
