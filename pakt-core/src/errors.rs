// pakt-core/src/errors.rs
use thiserror::Error;

use crate::exit_code::ExitCode;

/// Errors that can occur while running a front-end command.
#[derive(Error, Debug)]
pub enum PaktError {
    /// The run must end now with the given exit status.
    #[error("{reason}")]
    ExitRequest { code: ExitCode, reason: String },

    /// Error related to configuration loading or validation.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error reported by the package engine.
    #[error("Engine Error: {0}")]
    Engine(#[from] EngineError),

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    /// Broken internal invariant.
    #[error("Internal Error: {0}")]
    Internal(String),
}

impl PaktError {
    pub fn exit_request(code: ExitCode, reason: impl Into<String>) -> Self {
        PaktError::ExitRequest {
            code,
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        PaktError::Config(msg.into())
    }

    /// Exit status the process should end with when this error reaches `main`.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            PaktError::ExitRequest { code, .. } => *code,
            PaktError::Config(_) => ExitCode::ErrSyntax,
            PaktError::Engine(EngineError::CommitAborted(_)) => ExitCode::ErrCommit,
            PaktError::Engine(_) => ExitCode::ErrZypp,
            PaktError::Io(_) | PaktError::Internal(_) => ExitCode::ErrBug,
        }
    }
}

/// Errors raised by a [`crate::engine::PackageEngine`] implementation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Catalog Error: {0}")]
    Catalog(String),

    #[error("Parse Error: {0}")]
    Parse(String),

    /// The installed-package state could not be read or written.
    #[error("State Error: {0}")]
    State(String),

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Commit aborted: {0}")]
    CommitAborted(String),
}

pub type Result<T, E = PaktError> = std::result::Result<T, E>;
