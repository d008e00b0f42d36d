use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("PATH_NOT_FOUND: {0} does not exist")]
    RootMissing(PathBuf),

    #[error("NOT_A_DIRECTORY: {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("walk failed under {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("nothing to analyze: the snapshot contains no files")]
    EmptySnapshot,

    #[error("live analysis unavailable: {0}")]
    Config(String),
}

/// Failures of a single text-generation call. All are non-fatal to an
/// analysis run: the affected dimension degrades to simulated output.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("request timed out")]
    Timeout,

    #[error("authentication rejected (HTTP {0})")]
    Auth(u16),

    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl GenerateError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerateError::Timeout | GenerateError::RateLimited | GenerateError::Transport(_) => true,
            GenerateError::Status { status, .. } => *status >= 500,
            GenerateError::Auth(_) | GenerateError::Malformed(_) => false,
        }
    }
}

impl From<reqwest::Error> for GenerateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerateError::Timeout
        } else if e.is_decode() {
            GenerateError::Malformed(e.to_string())
        } else {
            GenerateError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("report store I/O error: {source} (path: {path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("stored report at {path} is unreadable: {source}")]
    Corrupt {
        source: serde_json::Error,
        path: PathBuf,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("report slot lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("settings file {path} is not valid JSON: {source}")]
    Parse {
        source: serde_json::Error,
        path: PathBuf,
    },

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
