// pakt-core/src/session.rs
use std::sync::Arc;

use tracing::debug;

use crate::config::SessionConfig;
use crate::errors::Result;
use crate::exit_code::ExitCode;
use crate::output::Out;
use crate::prompt::Prompter;
use crate::runtime::RuntimeState;

/// Everything a command needs for one run of the program.
pub struct Session {
    pub config: SessionConfig,
    pub out: Out,
    pub prompter: Prompter,
    runtime: Arc<RuntimeState>,
    exit_code: ExitCode,
}

impl Session {
    pub fn new(config: SessionConfig, out: Out, runtime: Arc<RuntimeState>) -> Result<Self> {
        let prompter = Prompter::new(config.prompt_settings()?, out.clone(), Arc::clone(&runtime));
        Ok(Self {
            config,
            out,
            prompter,
            runtime,
            exit_code: ExitCode::Ok,
        })
    }

    /// Replaces the prompter, e.g. with one reading scripted input.
    pub fn with_prompter(mut self, prompter: Prompter) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn runtime(&self) -> &Arc<RuntimeState> {
        &self.runtime
    }

    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }

    pub fn set_exit_code(&mut self, code: ExitCode) {
        if code != self.exit_code {
            debug!(from = %self.exit_code, to = %code, "Exit code changed.");
        }
        self.exit_code = code;
    }
}
