// pakt-core/src/prompt/mod.rs

//! Interactive prompts: option sets, reply matching, and the prompter that
//! negotiates an answer with the user or substitutes the default.

pub mod input;
pub mod options;
pub mod runner;
pub mod timed;
pub mod yesno;

#[cfg(test)]
mod prompt_tests;

use std::fmt;

pub use input::{Clock, KeyPoll, KeySource, ReplySource, StdinKeys, SystemClock, TtyReplies};
pub use options::PromptOptions;
pub use runner::{PromptSettings, Prompter};
pub use yesno::YesNoLocale;

/// Identifies a prompt occurrence in output and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromptId(u32);

impl PromptId {
    pub const NONE: PromptId = PromptId(0);
    pub const YN_INST_REMOVE_CONTINUE: PromptId = PromptId(1);
    pub const DEP_RESOLVE: PromptId = PromptId(2);
    pub const ARI_MEDIA_PROBLEM: PromptId = PromptId(3);
    pub const YN_UNSIGNED_PACKAGE: PromptId = PromptId(4);

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.0)
    }
}

/// Answer to an "Abort, retry, ignore?" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemAction {
    Abort,
    Retry,
    Ignore,
}

impl ProblemAction {
    /// Option letters, in index order.
    pub const LETTERS: &'static str = "a/r/i";

    pub fn index(self) -> usize {
        match self {
            ProblemAction::Abort => 0,
            ProblemAction::Retry => 1,
            ProblemAction::Ignore => 2,
        }
    }

    pub fn from_index(index: usize) -> Self {
        match index {
            1 => ProblemAction::Retry,
            2 => ProblemAction::Ignore,
            0 => ProblemAction::Abort,
            _ => {
                tracing::error!(index, "Invalid abort/retry/ignore index, using abort.");
                ProblemAction::Abort
            }
        }
    }
}
