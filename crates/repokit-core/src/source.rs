//! Source readers: run an external command and capture its standard output.
//!
//! Every tool reads its input through a [`CommandRunner`] so that parsers and
//! aggregators can be exercised against captured output in tests. Calls are
//! strictly sequential and blocking. A failing command is surfaced
//! immediately; nothing is retried.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{RepokitError, Result};

pub trait CommandRunner {
    /// Run `program` with `args` and return stdout with trailing whitespace
    /// trimmed. A non-zero exit is an [`RepokitError::ExecutionFailure`].
    fn run(&self, program: &str, args: &[&str]) -> Result<String>;
}

/// Runs commands as real subprocesses from a fixed working directory.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    cwd: PathBuf,
}

impl SystemRunner {
    pub fn new(cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let command_line = render_command(program, args);
        let exe =
            which::which(program).map_err(|_| RepokitError::ToolNotFound(program.to_string()))?;

        tracing::debug!(command = %command_line, cwd = %self.cwd.display(), "running");

        let output = Command::new(exe)
            .args(args)
            .current_dir(&self.cwd)
            .output()
            .map_err(|e| RepokitError::SpawnFailure {
                command: command_line.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(command = %command_line, code = ?output.status.code(), "command failed");
            return Err(RepokitError::ExecutionFailure {
                command: command_line,
                code: output.status.code(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim_end().to_string())
    }
}

/// Render a command line for diagnostics, quoting arguments that contain
/// whitespace.
pub fn render_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    for arg in args {
        if arg.is_empty() || arg.chars().any(char::is_whitespace) {
            parts.push(format!("'{arg}'"));
        } else {
            parts.push((*arg).to_string());
        }
    }
    parts.join(" ")
}

/// Show only the prefix and the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let prefix: String = match secret.find('_') {
        Some(i) if i < 8 => secret[..=i].to_string(),
        _ => String::new(),
    };
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}****{tail}")
}
