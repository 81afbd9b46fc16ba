// pakt-core/src/lib.rs

#![doc = include_str!("../../README.md")]

pub mod capability;
pub mod commands;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exit_code;
pub mod output;
pub mod prompt;
pub mod runtime;
pub mod session;
pub mod solve_commit;

pub use config::SessionConfig;
pub use engine::{CatalogEngine, PackageEngine};
pub use errors::{EngineError, PaktError};
pub use exit_code::ExitCode;
pub use output::{Out, OutputMode, Verbosity};
pub use prompt::{ProblemAction, PromptId, PromptOptions, Prompter};
pub use runtime::{InterruptAction, RuntimeState};
pub use session::Session;
pub use solve_commit::{solve_and_commit, SolveAndCommitPolicy};
