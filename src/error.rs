use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum WebmentionError {
    #[error("webmention request failed: {0}")]
    Http(String),

    #[error("webmention endpoint returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode JSON: {0}")]
    Decode(String),

    #[error("cannot derive slug from target {target:?}: {reason}")]
    Slug { target: String, reason: String },

    #[error("failed to read {path}: {message}")]
    StorageRead { path: String, message: String },

    #[error("failed to write {path}: {message}")]
    StorageWrite { path: String, message: String },

    #[error("failed to serialize mentions: {0}")]
    Serialize(String),

    #[error("fetch cancelled")]
    Cancelled,

    #[error("got an empty batch of mentions")]
    EmptyBatch,

    #[error("could not open state file {0}")]
    StateRead(PathBuf),

    #[error("failed to parse state file: {0}")]
    StateParse(String),

    #[error("failed to write state file: {0}")]
    StateWrite(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    #[diagnostic(help("pass the value on the command line or set it in webmentions.json"))]
    InvalidConfig(String),

    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),
}
