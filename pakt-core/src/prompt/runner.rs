// pakt-core/src/prompt/runner.rs

use std::io;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::input::{Clock, KeySource, ReplySource, StdinKeys, SystemClock, TtyReplies};
use super::options::PromptOptions;
use super::yesno::YesNoLocale;
use super::{ProblemAction, PromptId};
use crate::errors::{PaktError, Result};
use crate::exit_code::ExitCode;
use crate::output::{Out, Verbosity};
use crate::runtime::RuntimeState;

/// Session settings that change how prompts behave.
#[derive(Debug, Clone, Default)]
pub struct PromptSettings {
    /// Answer every prompt with its default without reading input.
    pub non_interactive: bool,
    /// Output is parsed by a program; don't echo auto-selected answers.
    pub machine_readable: bool,
    pub locale: YesNoLocale,
}

/// Asks questions and negotiates an answer from the option set.
pub struct Prompter {
    pub(super) settings: PromptSettings,
    pub(super) out: Out,
    pub(super) runtime: Arc<RuntimeState>,
    pub(super) replies: Box<dyn ReplySource>,
    pub(super) keys: Box<dyn KeySource>,
    pub(super) clock: Box<dyn Clock>,
}

impl Prompter {
    /// Creates a prompter reading from the controlling terminal.
    pub fn new(settings: PromptSettings, out: Out, runtime: Arc<RuntimeState>) -> Self {
        Self {
            settings,
            out,
            runtime,
            replies: Box::new(TtyReplies::new()),
            keys: Box::new(StdinKeys),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_replies(mut self, replies: Box<dyn ReplySource>) -> Self {
        self.replies = replies;
        self
    }

    pub fn with_keys(mut self, keys: Box<dyn KeySource>) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &PromptSettings {
        &self.settings
    }

    /// Shows `question` with the options and returns the chosen option index.
    pub fn ask(&mut self, id: PromptId, question: &str, options: &PromptOptions) -> Result<usize> {
        self.out.prompt(id, question, options);
        self.reply(id, options)
    }

    /// Reads replies until one selects exactly one option; the prompt line
    /// must already be displayed.
    ///
    /// In non-interactive mode the default is returned without reading.
    /// Unreadable input ends the run with [`ExitCode::ErrZypp`].
    pub fn reply(&mut self, id: PromptId, options: &PromptOptions) -> Result<usize> {
        if options.is_empty() {
            return Err(PaktError::Internal(format!("{} has no options to choose from", id)));
        }

        if self.settings.non_interactive {
            let label = options.default_label();
            // print the reply for convenience (only for normal output)
            if !self.settings.machine_readable {
                self.out.info_at(label, Verbosity::Quiet);
            }
            info!(prompt_id = %id, reply = %label, "Running non-interactively, returning the default.");
            return Ok(options.default_index());
        }

        let runtime = Arc::clone(&self.runtime);
        let _waiting = runtime.begin_input();
        // A pending interrupt is honored before blocking on the terminal.
        runtime.immediate_exit_check()?;

        if let Err(e) = self.replies.begin() {
            return Err(self.read_failure(id, Some(e)));
        }

        let yes_no = options.is_yes_no_prompt(&self.settings.locale);
        let mut failures = 0usize;
        loop {
            runtime.immediate_exit_check()?;
            let reply = match self.replies.read_line() {
                Ok(Some(line)) => line.trim().to_string(),
                Ok(None) => return Err(self.read_failure(id, None)),
                Err(e) => return Err(self.read_failure(id, Some(e))),
            };

            if reply.is_empty() {
                info!(
                    prompt_id = %id,
                    default = %options.default_label(),
                    index = options.default_index(),
                    "Reply empty, returning the default."
                );
                return Ok(options.default_index());
            }

            if reply == "?" {
                self.out.prompt_help(options);
                continue;
            }

            if yes_no {
                if let Some(yes) = self.settings.locale.rpmatch(&reply) {
                    let index = if yes { 0 } else { 1 };
                    info!(prompt_id = %id, reply = %reply, index, "Yes/no reply.");
                    return Ok(index);
                }
            }

            let matches = options.reply_matches(&reply);
            if let [index] = matches.as_slice() {
                let index = *index;
                info!(prompt_id = %id, reply = %reply, index, "Prompt answered.");
                return Ok(index);
            }

            failures += 1;
            let mut diag = if matches.is_empty() {
                format!("Invalid answer '{}'.", reply)
            } else {
                format!(
                    "Ambiguous answer '{}'. {}",
                    reply,
                    options.reply_matches_str(&matches)
                )
            };
            if yes_no {
                let (y, n) = self.settings.locale.short_tokens();
                diag.push_str(&format!(
                    " Enter '{}' for '{}' or '{}' for '{}' if nothing else works for you.",
                    y, self.settings.locale.yes, n, self.settings.locale.no
                ));
            } else if failures > 1 {
                diag.push_str(
                    " If nothing else works enter '#1' to select the 1st option, '#2' for the 2nd one, ...",
                );
            }
            debug!(prompt_id = %id, reply = %reply, candidates = matches.len(), "Rejected reply.");
            let question = format!("{}\n", self.out.diagnostic(&diag));
            self.out.prompt(id, &question, options);
        }
    }

    fn read_failure(&self, id: PromptId, err: Option<io::Error>) -> PaktError {
        match err {
            Some(e) => warn!(prompt_id = %id, error = %e, "Could not read the answer."),
            None => warn!(prompt_id = %id, "Could not read the answer - bad stream or EOF."),
        }
        self.out.error(
            "Cannot read input: bad stream or EOF.",
            Some(
                "If you run pakt without a terminal, use '--non-interactive' global\n\
                 option to make pakt use default answers to prompts.",
            ),
        );
        PaktError::exit_request(ExitCode::ErrZypp, "Cannot read input. Bad stream or EOF.")
    }

    /// Asks a yes/no question; `true` means yes.
    pub fn read_bool_answer(&mut self, id: PromptId, question: &str, default: bool) -> Result<bool> {
        let locale = &self.settings.locale;
        let options = PromptOptions::new(
            [locale.yes.clone(), locale.no.clone()],
            if default { 0 } else { 1 },
        );
        Ok(self.ask(id, question, &options)? == 0)
    }

    /// Asks yes/no/always/never. Returns the answer and whether it should be
    /// remembered for later occurrences of the same question.
    pub fn read_bool_answer_opt_save(
        &mut self,
        id: PromptId,
        question: &str,
        default: bool,
    ) -> Result<(bool, bool)> {
        let locale = &self.settings.locale;
        let options = PromptOptions::new(
            [
                locale.yes.clone(),
                locale.no.clone(),
                "always".to_string(),
                "never".to_string(),
            ],
            if default { 0 } else { 1 },
        );
        let index = self.ask(id, question, &options)?;
        Ok((index % 2 == 0, index > 1))
    }

    /// Blocking "Abort, retry, ignore?" prompt.
    pub fn read_action_ari(&mut self, id: PromptId, default: ProblemAction) -> Result<ProblemAction> {
        let options = PromptOptions::parse(ProblemAction::LETTERS, default.index());
        let index = self.ask(id, "Abort, retry, ignore?", &options)?;
        Ok(ProblemAction::from_index(index))
    }
}
