// pakt-core/src/commands/mod.rs

//! Command implementations. Each returns the exit code the run should end with.

pub mod install_remove;
pub mod repos;

#[cfg(test)]
mod commands_tests;

pub use install_remove::{
    handle_feedback, install, remove, repo_specs_to_aliases, InstallOptions, RemoveOptions,
};
pub use repos::repos;
