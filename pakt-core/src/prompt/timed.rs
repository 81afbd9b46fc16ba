// pakt-core/src/prompt/timed.rs

//! Prompts that answer themselves when nobody replies in time.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::input::KeyPoll;
use super::options::PromptOptions;
use super::runner::Prompter;
use super::{ProblemAction, PromptId};
use crate::errors::{PaktError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const TICK: Duration = Duration::from_secs(1);

impl Prompter {
    /// "Abort, retry, ignore?" that auto-selects `default` after `timeout` seconds.
    pub fn read_action_ari_with_timeout(
        &mut self,
        id: PromptId,
        timeout: u64,
        default: ProblemAction,
    ) -> Result<ProblemAction> {
        let options = PromptOptions::parse(ProblemAction::LETTERS, default.index());
        let index = self.timed_reply(id, "Abort, retry, ignore?", &options, timeout)?;
        Ok(ProblemAction::from_index(index))
    }

    /// Shows the prompt once and counts down `timeout` seconds, returning the
    /// default unless a key selecting an option arrives first.
    ///
    /// A key selects the first enabled option whose label starts with it,
    /// ignoring case. In non-interactive mode the full timeout is still slept,
    /// the delay paces retries.
    pub fn timed_reply(
        &mut self,
        id: PromptId,
        question: &str,
        options: &PromptOptions,
        timeout: u64,
    ) -> Result<usize> {
        if options.is_empty() {
            return Err(PaktError::Internal(format!("{} has no options to choose from", id)));
        }
        let default = options.default_index();

        if self.settings.non_interactive {
            self.runtime.immediate_exit_check()?;
            self.out.info(&format!("Retrying in {} seconds...", timeout));
            self.clock.sleep(Duration::from_secs(timeout));
            info!(prompt_id = %id, index = default, "Running non-interactively, returning the default.");
            return Ok(default);
        }

        self.out.prompt(id, question, options);
        self.out.newline();

        let runtime = Arc::clone(&self.runtime);
        let _waiting = runtime.begin_input();
        runtime.immediate_exit_check()?;

        let mut remaining = timeout;
        while remaining > 0 {
            loop {
                let key = match self.keys.poll_key(POLL_INTERVAL) {
                    Ok(KeyPoll::Idle) => break,
                    Ok(KeyPoll::Key(key)) => key,
                    Ok(KeyPoll::Eof) => return Ok(self.sleep_out(id, remaining, default)),
                    Err(e) => {
                        warn!(prompt_id = %id, error = %e, "Polling for input failed.");
                        return Ok(self.sleep_out(id, remaining, default));
                    }
                };
                debug!(prompt_id = %id, key = %(key as char).escape_default(), "Key received.");
                if let Some(index) = key_match(options, key) {
                    // eat the rest of the line
                    self.keys.discard_line()?;
                    info!(prompt_id = %id, index, "Timed prompt answered.");
                    return Ok(index);
                }
                if key != b'\n' {
                    warn!(prompt_id = %id, key = %(key as char).escape_default(), "Unknown char.");
                }
            }

            let msg = format!(
                "Autoselecting '{}' after {} second{}.",
                options.default_label(),
                remaining,
                if remaining == 1 { "" } else { "s" }
            );
            self.out.status_line(&msg);
            self.clock.sleep(TICK);
            remaining -= 1;
        }

        if !self.out.is_machine() {
            self.out.finish_status_line("Trying again...");
        }
        info!(prompt_id = %id, index = default, "Timed out, returning the default.");
        Ok(default)
    }

    /// Input is gone: wait out the remaining time, then take the default.
    fn sleep_out(&mut self, id: PromptId, remaining: u64, default: usize) -> usize {
        self.out.info(&format!("Retrying in {} seconds...", remaining));
        warn!(prompt_id = %id, index = default, remaining, "No good input, returning the default after the timeout.");
        self.clock.sleep(Duration::from_secs(remaining));
        default
    }
}

fn key_match(options: &PromptOptions, key: u8) -> Option<usize> {
    let key = key.to_ascii_lowercase();
    options
        .enabled()
        .find(|(_, label)| label.as_bytes().first().map(u8::to_ascii_lowercase) == Some(key))
        .map(|(index, _)| index)
}
