// pakt-core/src/prompt/prompt_tests.rs
#![cfg(test)]

use std::sync::Arc;
use std::time::Duration;

use super::input::testing::{KeyStep, RecordingClock, ScriptedKeys, ScriptedReplies};
use super::*;
use crate::exit_code::ExitCode;
use crate::output::testing::{capture, Captured};
use crate::output::OutputMode;
use crate::runtime::RuntimeState;

struct Harness {
    prompter: Prompter,
    out: Captured,
    replies: ScriptedReplies,
    keys: ScriptedKeys,
    clock: RecordingClock,
    runtime: Arc<RuntimeState>,
}

fn harness(non_interactive: bool, lines: &[&str], keys: ScriptedKeys) -> Harness {
    let (out, captured) = capture(OutputMode::Normal);
    let runtime = Arc::new(RuntimeState::new());
    let replies = ScriptedReplies::new(lines);
    let clock = RecordingClock::default();
    let settings = PromptSettings {
        non_interactive,
        ..Default::default()
    };
    let prompter = Prompter::new(settings, out, Arc::clone(&runtime))
        .with_replies(Box::new(replies.clone()))
        .with_keys(Box::new(keys.clone()))
        .with_clock(Box::new(clock.clone()));
    Harness {
        prompter,
        out: captured,
        replies,
        keys,
        clock,
        runtime,
    }
}

fn interactive(lines: &[&str]) -> Harness {
    harness(false, lines, ScriptedKeys::default())
}

// --- blocking prompts ---

#[test]
fn test_empty_reply_selects_default() {
    let mut h = interactive(&[""]);
    let options = PromptOptions::parse("y/n/p", 2);
    assert_eq!(h.prompter.ask(PromptId::NONE, "Go?", &options).unwrap(), 2);
    assert_eq!(h.out.text(), "Go? [y/n/p] (p): ");
}

#[test]
fn test_non_interactive_returns_default_without_reading() {
    let mut h = harness(true, &["n"], ScriptedKeys::default());
    let options = PromptOptions::parse("y/n", 0);
    assert_eq!(h.prompter.ask(PromptId::NONE, "Go?", &options).unwrap(), 0);
    assert_eq!(h.replies.reads(), 0);
    // the chosen label is echoed for visibility
    assert!(h.out.text().ends_with("(y): y\n"));
}

#[test]
fn test_non_interactive_machine_readable_does_not_echo() {
    let (out, captured) = capture(OutputMode::Machine);
    let settings = PromptSettings {
        non_interactive: true,
        machine_readable: true,
        ..Default::default()
    };
    let mut prompter = Prompter::new(settings, out, Arc::new(RuntimeState::new()));
    let options = PromptOptions::parse("y/n", 1);
    assert_eq!(prompter.reply(PromptId::NONE, &options).unwrap(), 1);
    assert_eq!(captured.text(), "");
}

#[test]
fn test_invalid_then_valid_reply() {
    let mut h = interactive(&["x", "  p  "]);
    let options = PromptOptions::parse("y/n/p", 0);
    assert_eq!(h.prompter.ask(PromptId::NONE, "Go?", &options).unwrap(), 2);
    let text = h.out.text();
    assert!(text.contains("Invalid answer 'x'.\n[y/n/p] (y): "));
    // no ordinal hint after the first failure
    assert!(!text.contains("'#1'"));
}

#[test]
fn test_ordinal_hint_after_repeated_failures() {
    let mut h = interactive(&["x", "z", "#2"]);
    let options = PromptOptions::parse("abort/always/skip", 0);
    assert_eq!(h.prompter.ask(PromptId::NONE, "What now?", &options).unwrap(), 1);
    let text = h.out.text();
    assert!(text.contains("Invalid answer 'z'. If nothing else works enter '#1'"));
}

#[test]
fn test_ambiguous_reply_lists_candidates() {
    let mut h = interactive(&["a", "ab"]);
    let options = PromptOptions::new(["abort", "always"], 0);
    assert_eq!(h.prompter.ask(PromptId::NONE, "Go?", &options).unwrap(), 0);
    assert!(h.out.text().contains("Ambiguous answer 'a'. (abort,always)"));
}

#[test]
fn test_question_mark_shows_help_without_counting_a_failure() {
    let mut h = interactive(&["?", "x", "r"]);
    let mut options = PromptOptions::parse("a/r/i", 0);
    options.set_option_help(1, "try again");
    assert_eq!(h.prompter.ask(PromptId::NONE, "Abort, retry, ignore?", &options).unwrap(), 1);
    let text = h.out.text();
    assert!(text.contains("  r - try again"));
    assert!(text.contains("Invalid answer 'x'."));
    assert!(!text.contains("'#1'"));
}

#[test]
fn test_yes_no_uses_rpmatch_and_its_own_hint() {
    let mut h = interactive(&["maybe", "yup"]);
    assert!(h
        .prompter
        .read_bool_answer(PromptId::YN_INST_REMOVE_CONTINUE, "Continue?", false)
        .unwrap());
    let text = h.out.text();
    assert!(text.starts_with("Continue? [yes/no] (no): "));
    assert!(text.contains("Invalid answer 'maybe'. Enter 'y' for 'yes' or 'n' for 'no'"));
}

#[test]
fn test_read_bool_answer_default() {
    let mut h = interactive(&[""]);
    assert!(!h.prompter.read_bool_answer(PromptId::NONE, "Sure?", false).unwrap());
}

#[test]
fn test_opt_save_answers() {
    let mut h = interactive(&["al", "nev", "no"]);
    let q = "Install unsigned package?";
    assert_eq!(h.prompter.read_bool_answer_opt_save(PromptId::NONE, q, false).unwrap(), (true, true));
    assert_eq!(h.prompter.read_bool_answer_opt_save(PromptId::NONE, q, false).unwrap(), (false, true));
    assert_eq!(h.prompter.read_bool_answer_opt_save(PromptId::NONE, q, true).unwrap(), (false, false));
}

#[test]
fn test_read_failure_is_fatal_backend_error() {
    let mut h = interactive(&["x"]);
    let options = PromptOptions::parse("y/n/p", 0);
    let err = h.prompter.ask(PromptId::NONE, "Go?", &options).unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::ErrZypp);
    assert!(h.out.text().contains("Cannot read input: bad stream or EOF."));
    assert!(h.out.text().contains("--non-interactive"));
    assert!(!h.runtime.waiting_for_input());
}

#[test]
fn test_pending_interrupt_is_honored_before_reading() {
    let mut h = interactive(&["y"]);
    h.runtime.on_interrupt();
    let options = PromptOptions::parse("y/n", 0);
    let err = h.prompter.reply(PromptId::NONE, &options).unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::OnSignal);
    assert_eq!(h.replies.reads(), 0);
    assert!(!h.runtime.waiting_for_input());
}

#[test]
fn test_read_action_ari() {
    let mut h = interactive(&["I"]);
    let action = h
        .prompter
        .read_action_ari(PromptId::ARI_MEDIA_PROBLEM, ProblemAction::Abort)
        .unwrap();
    assert_eq!(action, ProblemAction::Ignore);
}

// --- timed prompts ---

#[test]
fn test_timed_non_interactive_sleeps_full_timeout() {
    let mut h = harness(true, &[], ScriptedKeys::default());
    let action = h
        .prompter
        .read_action_ari_with_timeout(PromptId::ARI_MEDIA_PROBLEM, 5, ProblemAction::Retry)
        .unwrap();
    assert_eq!(action, ProblemAction::Retry);
    assert_eq!(h.clock.total(), Duration::from_secs(5));
    assert_eq!(h.keys.polls(), 0);
    assert!(h.out.text().contains("Retrying in 5 seconds..."));
}

#[test]
fn test_timed_non_interactive_honors_pending_interrupt() {
    let mut h = harness(true, &[], ScriptedKeys::default());
    h.runtime.on_interrupt();
    let err = h
        .prompter
        .read_action_ari_with_timeout(PromptId::ARI_MEDIA_PROBLEM, 30, ProblemAction::Retry)
        .unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::OnSignal);
    assert_eq!(h.clock.total(), Duration::ZERO);
    assert!(!h.out.text().contains("Retrying in"));
}

#[test]
fn test_problem_action_from_index() {
    assert_eq!(ProblemAction::from_index(0), ProblemAction::Abort);
    assert_eq!(ProblemAction::from_index(1), ProblemAction::Retry);
    assert_eq!(ProblemAction::from_index(2), ProblemAction::Ignore);
    // out of range is logged and falls back to abort
    assert_eq!(ProblemAction::from_index(7), ProblemAction::Abort);
}

#[test]
fn test_timed_key_answers_immediately() {
    let mut h = harness(false, &[], ScriptedKeys::typed("r\n"));
    let options = PromptOptions::new(["retry", "abort"], 0);
    let index = h.prompter.timed_reply(PromptId::NONE, "Retry?", &options, 10).unwrap();
    assert_eq!(index, 0);
    assert_eq!(h.keys.polls(), 1);
    assert_eq!(h.keys.discarded_lines(), 1);
    assert!(h.clock.sleeps().is_empty());
}

#[test]
fn test_timed_key_match_ignores_case() {
    let mut h = harness(false, &[], ScriptedKeys::typed("A\n"));
    let action = h
        .prompter
        .read_action_ari_with_timeout(PromptId::ARI_MEDIA_PROBLEM, 3, ProblemAction::Retry)
        .unwrap();
    assert_eq!(action, ProblemAction::Abort);
}

#[test]
fn test_timed_unknown_keys_are_skipped() {
    let keys = ScriptedKeys::new(&[KeyStep::Key(b'x'), KeyStep::Idle, KeyStep::Key(b'i')]);
    let mut h = harness(false, &[], keys);
    let action = h
        .prompter
        .read_action_ari_with_timeout(PromptId::ARI_MEDIA_PROBLEM, 3, ProblemAction::Retry)
        .unwrap();
    assert_eq!(action, ProblemAction::Ignore);
    // one tick passed between the unknown key and the answer
    assert_eq!(h.clock.sleeps(), vec![Duration::from_secs(1)]);
}

#[test]
fn test_timed_countdown_expires_to_default() {
    let mut h = harness(false, &[], ScriptedKeys::default());
    let action = h
        .prompter
        .read_action_ari_with_timeout(PromptId::ARI_MEDIA_PROBLEM, 3, ProblemAction::Retry)
        .unwrap();
    assert_eq!(action, ProblemAction::Retry);
    assert_eq!(h.clock.sleeps(), vec![Duration::from_secs(1); 3]);
    let text = h.out.text();
    assert!(text.contains("Autoselecting 'r' after 3 seconds."));
    assert!(text.contains("Autoselecting 'r' after 1 second."));
    assert!(text.contains("Trying again..."));
    assert!(!h.runtime.waiting_for_input());
}

#[test]
fn test_timed_eof_sleeps_out_the_remaining_time() {
    let keys = ScriptedKeys::new(&[KeyStep::Idle, KeyStep::Eof]);
    let mut h = harness(false, &[], keys);
    let action = h
        .prompter
        .read_action_ari_with_timeout(PromptId::ARI_MEDIA_PROBLEM, 4, ProblemAction::Ignore)
        .unwrap();
    assert_eq!(action, ProblemAction::Ignore);
    assert_eq!(
        h.clock.sleeps(),
        vec![Duration::from_secs(1), Duration::from_secs(3)]
    );
    assert!(h.out.text().contains("Retrying in 3 seconds..."));
}
