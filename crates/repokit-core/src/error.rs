use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepokitError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("`{command}` exited with {}: {stderr}", exit_code_label(.code))]
    ExecutionFailure {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to spawn `{command}`: {reason}")]
    SpawnFailure { command: String, reason: String },

    #[error("'{0}' not found on PATH")]
    ToolNotFound(String),

    #[error("request to {url} failed ({}): {snippet}", status_label(.status))]
    NetworkFailure {
        url: String,
        status: Option<u16>,
        snippet: String,
    },

    #[error("{url} returned {kind} error: {message}")]
    Api {
        url: String,
        kind: String,
        message: String,
    },

    #[error("no records found: {0}")]
    NoRecords(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "a signal".to_string(),
    }
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(s) => format!("HTTP {s}"),
        None => "no response".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, RepokitError>;
