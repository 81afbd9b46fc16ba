// pakt-core/src/commands/commands_tests.rs
#![cfg(test)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::*;
use crate::capability::ResKind;
use crate::config::SessionConfig;
use crate::engine::{
    CommitCallbacks, CommitOutcome, CommitPolicy, Feedback, FeedbackKind, PackageEngine,
    PackageRef, Problem, RepoInfo, RequestAction, Resolution, Solution, SolverRequest,
    TransactionSummary,
};
use crate::errors::{EngineError, PaktError};
use crate::exit_code::ExitCode;
use crate::output::testing::{capture, Captured};
use crate::output::OutputMode;
use crate::prompt::input::testing::{RecordingClock, ScriptedKeys, ScriptedReplies};
use crate::prompt::{ProblemAction, Prompter};
use crate::runtime::RuntimeState;
use crate::session::Session;

// --- Mock Engine ---

#[derive(Clone, Default)]
struct MockEngine {
    call_log: Arc<Mutex<Vec<String>>>,
    feedback: Vec<Feedback>,
    /// Returned by successive `resolve` calls; the last one repeats.
    resolutions: Vec<Resolution>,
    resolved: Arc<Mutex<usize>>,
    repos: Vec<RepoInfo>,
    unsigned: Vec<PackageRef>,
    media_problems: Vec<PackageRef>,
}

impl MockEngine {
    fn log(&self, entry: String) {
        self.call_log.lock().unwrap().push(entry);
    }

    fn calls(&self) -> Vec<String> {
        self.call_log.lock().unwrap().clone()
    }

    fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }
}

impl PackageEngine for MockEngine {
    fn mark(&mut self, request: &SolverRequest) -> Result<Vec<Feedback>, EngineError> {
        let action = match request.action {
            RequestAction::Install => "install",
            RequestAction::Remove => "remove",
        };
        let args: Vec<&str> = request.args.iter().map(|a| a.raw.as_str()).collect();
        self.log(format!(
            "mark {} {} from={}",
            action,
            args.join(","),
            request.options.from_repos.join(",")
        ));
        Ok(self.feedback.clone())
    }

    fn resolve(&mut self) -> Result<Resolution, EngineError> {
        let mut count = self.resolved.lock().unwrap();
        let index = (*count).min(self.resolutions.len().saturating_sub(1));
        *count += 1;
        self.log("resolve".to_string());
        Ok(self.resolutions.get(index).cloned().unwrap_or_default())
    }

    fn apply_solution(&mut self, problem: usize, solution: usize) -> Result<(), EngineError> {
        self.log(format!("apply {} {}", problem, solution));
        Ok(())
    }

    fn commit(
        &mut self,
        policy: &CommitPolicy,
        callbacks: &mut dyn CommitCallbacks,
    ) -> Result<CommitOutcome, PaktError> {
        self.log(format!("commit dry_run={}", policy.dry_run));
        let mut outcome = CommitOutcome::default();
        for package in &self.unsigned {
            let accepted = callbacks.accept_unsigned(package)?;
            self.log(format!("unsigned {} {}", package.name, accepted));
            if accepted {
                outcome.installed.push(package.clone());
            } else {
                outcome.skipped.push(package.clone());
            }
        }
        for package in &self.media_problems {
            let action = callbacks.media_problem(package, "File not found on medium.")?;
            self.log(format!("media {} {:?}", package.name, action));
            if action == ProblemAction::Abort {
                return Err(EngineError::CommitAborted(format!("{}", package)).into());
            }
        }
        Ok(outcome)
    }

    fn repositories(&self) -> Vec<RepoInfo> {
        self.repos.clone()
    }
}

// --- Test Helpers ---

struct Fixture {
    session: Session,
    out: Captured,
    replies: ScriptedReplies,
    clock: RecordingClock,
}

fn fixture_with(config: SessionConfig, lines: &[&str], keys: ScriptedKeys) -> Fixture {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (out, captured) = capture(OutputMode::Normal);
    let runtime = Arc::new(RuntimeState::new());
    let replies = ScriptedReplies::new(lines);
    let clock = RecordingClock::default();
    let prompter = Prompter::new(
        config.prompt_settings().unwrap(),
        out.clone(),
        Arc::clone(&runtime),
    )
    .with_replies(Box::new(replies.clone()))
    .with_keys(Box::new(keys))
    .with_clock(Box::new(clock.clone()));
    let session = Session::new(config, out, runtime)
        .unwrap()
        .with_prompter(prompter);
    Fixture {
        session,
        out: captured,
        replies,
        clock,
    }
}

fn fixture(lines: &[&str]) -> Fixture {
    fixture_with(SessionConfig::default(), lines, ScriptedKeys::default())
}

fn non_interactive() -> Fixture {
    let config = SessionConfig {
        non_interactive: true,
        ..Default::default()
    };
    fixture_with(config, &[], ScriptedKeys::default())
}

fn pkg(name: &str) -> PackageRef {
    PackageRef {
        name: name.to_string(),
        version: "1.0".to_string(),
        arch: "noarch".to_string(),
        kind: ResKind::Package,
    }
}

fn repo(alias: &str, url: &str) -> RepoInfo {
    RepoInfo {
        alias: alias.to_string(),
        name: alias.to_uppercase(),
        url: url.to_string(),
        enabled: true,
        priority: 99,
    }
}

fn installing(names: &[&str]) -> MockEngine {
    let packages: Vec<PackageRef> = names.iter().map(|n| pkg(n)).collect();
    MockEngine {
        feedback: packages
            .iter()
            .map(|p| Feedback::new(FeedbackKind::SetToInstall, &p.name).with_package(p.clone()))
            .collect(),
        resolutions: vec![Resolution {
            problems: vec![],
            summary: TransactionSummary {
                install: packages,
                remove: vec![],
            },
        }],
        repos: vec![repo("oss", "https://example.org/oss"), repo("extra", "https://example.org/extra")],
        ..Default::default()
    }
}

fn conflict() -> Problem {
    Problem {
        description: "emacs conflicts with 'vim' provided by vim-9.0.x86_64".to_string(),
        details: "declared conflict".to_string(),
        solutions: vec![
            Solution {
                description: "do not install emacs".to_string(),
                details: String::new(),
            },
            Solution {
                description: "deinstallation of vim".to_string(),
                details: "vim is removed".to_string(),
            },
        ],
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// --- Argument Checks ---

#[test]
fn test_install_needs_arguments() {
    let mut f = fixture(&[]);
    let mut engine = installing(&[]);
    let code = install(&mut f.session, &mut engine, &InstallOptions::default(), &[]).unwrap();
    assert_eq!(code, ExitCode::ErrInvalidArgs);
    assert!(f.out.text().contains("Too few arguments."));
    assert!(engine.calls().is_empty());
}

#[test]
fn test_install_conflicting_selection_options() {
    let mut f = fixture(&[]);
    let mut engine = installing(&["vim"]);
    let opts = InstallOptions {
        select_by_name: true,
        select_by_cap: true,
        ..Default::default()
    };
    let code = install(&mut f.session, &mut engine, &opts, &args(&["vim"])).unwrap();
    assert_eq!(code, ExitCode::ErrInvalidArgs);

    let opts = InstallOptions {
        force: true,
        select_by_cap: true,
        ..Default::default()
    };
    let code = install(&mut f.session, &mut engine, &opts, &args(&["vim"])).unwrap();
    assert_eq!(code, ExitCode::ErrInvalidArgs);
    assert!(f.out.text().contains("'--force' and '--capability'"));
    assert!(engine.calls().is_empty());
}

#[test]
fn test_install_unknown_repository() {
    let mut f = fixture(&[]);
    let mut engine = installing(&["vim"]);
    let opts = InstallOptions {
        from_repos: args(&["nope"]),
        ..Default::default()
    };
    let code = install(&mut f.session, &mut engine, &opts, &args(&["vim"])).unwrap();
    assert_eq!(code, ExitCode::ErrInvalidArgs);
    assert!(f.out.text().contains("Repository 'nope' not found by its alias, number, or URI."));
}

#[test]
fn test_repo_specs_to_aliases() {
    let (out, _) = capture(OutputMode::Normal);
    let repos = vec![repo("oss", "https://example.org/oss"), repo("extra", "https://example.org/extra")];
    let aliases = repo_specs_to_aliases(
        &out,
        &repos,
        &args(&["#2", "1", "https://example.org/extra/", "oss"]),
    )
    .unwrap();
    assert_eq!(aliases, vec!["extra", "oss"]);
    assert!(repo_specs_to_aliases(&out, &repos, &args(&["3"])).is_none());
}

#[test]
fn test_entire_catalog_replaces_arguments() {
    let mut f = fixture(&["y"]);
    let mut engine = installing(&["vim"]);
    let opts = InstallOptions {
        entire_catalog: args(&["extra"]),
        ..Default::default()
    };
    install(&mut f.session, &mut engine, &opts, &args(&["vim"])).unwrap();
    assert!(f.out.text().contains("Ignoring arguments, marking the entire repository."));
    assert_eq!(engine.calls()[0], "mark install * from=extra");
}

#[test]
fn test_remove_patch_and_srcpackage_are_refused() {
    let mut f = fixture(&[]);
    let mut engine = MockEngine::default();
    let opts = RemoveOptions {
        kinds: vec![ResKind::Patch],
        ..Default::default()
    };
    let code = remove(&mut f.session, &mut engine, &opts, &args(&["fix-1"])).unwrap();
    assert_eq!(code, ExitCode::ErrInvalidArgs);
    assert!(f.out.text().contains("Cannot uninstall patches."));

    let opts = RemoveOptions {
        kinds: vec![ResKind::SrcPackage],
        ..Default::default()
    };
    let code = remove(&mut f.session, &mut engine, &opts, &args(&["vim"])).unwrap();
    assert_eq!(code, ExitCode::ErrInvalidArgs);
    assert!(engine.calls().is_empty());
}

// --- Install Flow ---

#[test]
fn test_install_confirmed_commits() {
    let mut f = fixture(&["y"]);
    let mut engine = installing(&["vim"]);
    let code = install(&mut f.session, &mut engine, &InstallOptions::default(), &args(&["vim"])).unwrap();
    assert_eq!(code, ExitCode::Ok);
    assert_eq!(
        engine.calls(),
        vec!["mark install vim from=", "resolve", "commit dry_run=false"]
    );
    let text = f.out.text();
    assert!(text.contains("The following package is going to be installed:\n  vim"));
    assert!(text.contains("Continue? [yes/no] (yes): "));
}

#[test]
fn test_install_declined_does_not_commit() {
    let mut f = fixture(&["n"]);
    let mut engine = installing(&["vim"]);
    let code = install(&mut f.session, &mut engine, &InstallOptions::default(), &args(&["vim"])).unwrap();
    assert_eq!(code, ExitCode::Ok);
    assert!(!engine.called("commit"));
}

#[test]
fn test_details_show_versions() {
    let mut f = fixture(&[""]);
    let mut engine = installing(&["vim"]);
    let opts = InstallOptions {
        details: true,
        dry_run: true,
        ..Default::default()
    };
    install(&mut f.session, &mut engine, &opts, &args(&["vim"])).unwrap();
    assert!(f.out.text().contains("  vim-1.0.noarch"));
    assert!(engine.called("commit dry_run=true"));
}

#[test]
fn test_not_found_interactive_continues_with_info_code() {
    let mut f = fixture(&[]);
    let mut engine = MockEngine {
        feedback: vec![Feedback::new(FeedbackKind::NotFoundName, "ghost")],
        ..Default::default()
    };
    let code = install(&mut f.session, &mut engine, &InstallOptions::default(), &args(&["ghost"])).unwrap();
    assert_eq!(code, ExitCode::InfCapNotFound);
    let text = f.out.text();
    assert!(text.contains("Package 'ghost' not found."));
    assert!(text.contains("Nothing to do."));
}

#[test]
fn test_not_found_non_interactive_ends_the_run() {
    let mut f = non_interactive();
    let mut engine = MockEngine {
        feedback: vec![Feedback::new(FeedbackKind::NotFoundCap, "ghost>=2")],
        ..Default::default()
    };
    let err = install(&mut f.session, &mut engine, &InstallOptions::default(), &args(&["ghost>=2"]))
        .unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::InfCapNotFound);
    assert!(!engine.called("resolve"));
}

#[test]
fn test_ignore_unknown_keeps_exit_ok() {
    let config = SessionConfig {
        non_interactive: true,
        ignore_unknown: true,
        ..Default::default()
    };
    let mut f = fixture_with(config, &[], ScriptedKeys::default());
    let mut engine = MockEngine {
        feedback: vec![Feedback::new(FeedbackKind::NotFoundName, "ghost")],
        ..Default::default()
    };
    let code = install(&mut f.session, &mut engine, &InstallOptions::default(), &args(&["ghost"])).unwrap();
    assert_eq!(code, ExitCode::Ok);
}

#[test]
fn test_remove_not_found_is_not_fatal() {
    let mut f = non_interactive();
    let mut engine = MockEngine {
        feedback: vec![Feedback::new(FeedbackKind::NotFoundName, "ghost")],
        ..Default::default()
    };
    let code = remove(&mut f.session, &mut engine, &RemoveOptions::default(), &args(&["ghost"])).unwrap();
    assert_eq!(code, ExitCode::InfCapNotFound);
    assert!(engine.called("resolve"));
}

#[test]
fn test_read_failure_at_confirmation() {
    let mut f = fixture(&[]);
    let mut engine = installing(&["vim"]);
    let err = install(&mut f.session, &mut engine, &InstallOptions::default(), &args(&["vim"]))
        .unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::ErrZypp);
    assert!(!engine.called("commit"));
}

// --- Problems ---

#[test]
fn test_problem_solution_is_applied() {
    let mut f = fixture(&["2", "y"]);
    let mut engine = installing(&["emacs"]);
    let clean = engine.resolutions[0].clone();
    engine.resolutions = vec![
        Resolution {
            problems: vec![conflict()],
            summary: clean.summary.clone(),
        },
        clean,
    ];
    let code = install(&mut f.session, &mut engine, &InstallOptions::default(), &args(&["emacs"])).unwrap();
    assert_eq!(code, ExitCode::Ok);
    let calls = engine.calls();
    assert_eq!(calls[1..4], ["resolve", "apply 0 1", "resolve"]);
    let text = f.out.text();
    assert!(text.contains("Problem: 1/1: emacs conflicts with 'vim'"));
    assert!(text.contains(" Solution 2: deinstallation of vim"));
    assert!(text.contains("[1/2/s/r/c/d/?] (c): "));
}

#[test]
fn test_problem_cancel_is_an_engine_error() {
    let mut f = non_interactive();
    let mut engine = installing(&["emacs"]);
    engine.resolutions[0].problems = vec![conflict()];
    let code = install(&mut f.session, &mut engine, &InstallOptions::default(), &args(&["emacs"])).unwrap();
    assert_eq!(code, ExitCode::ErrZypp);
    assert!(!engine.called("commit"));
}

#[test]
fn test_problem_details_toggle() {
    let mut f = fixture(&["d", "c"]);
    let mut engine = installing(&["emacs"]);
    engine.resolutions[0].problems = vec![conflict()];
    install(&mut f.session, &mut engine, &InstallOptions::default(), &args(&["emacs"])).unwrap();
    let text = f.out.text();
    assert_eq!(text.matches("Problem: 1/1").count(), 2);
    assert!(text.contains("\n  vim is removed"));
    assert_eq!(f.session.exit_code(), ExitCode::ErrZypp);
}

#[test]
fn test_skipping_every_problem_goes_on() {
    let mut f = fixture(&["s", "y"]);
    let mut engine = installing(&["emacs"]);
    engine.resolutions[0].problems = vec![conflict()];
    let code = install(&mut f.session, &mut engine, &InstallOptions::default(), &args(&["emacs"])).unwrap();
    assert_eq!(code, ExitCode::Ok);
    assert!(engine.called("commit"));
    assert!(!engine.called("apply"));
}

// --- Commit Callbacks ---

#[test]
fn test_unsigned_answer_is_remembered() {
    let mut f = fixture(&["y", "always"]);
    let mut engine = installing(&["a", "b"]);
    engine.unsigned = vec![pkg("a"), pkg("b")];
    install(&mut f.session, &mut engine, &InstallOptions::default(), &args(&["a", "b"])).unwrap();
    let calls = engine.calls();
    assert!(calls.contains(&"unsigned a true".to_string()));
    assert!(calls.contains(&"unsigned b true".to_string()));
    assert_eq!(f.replies.reads(), 2);
    assert_eq!(f.out.text().matches("is not signed").count(), 1);
}

#[test]
fn test_media_problem_retries_after_timeout_non_interactively() {
    let config = SessionConfig {
        non_interactive: true,
        retry_timeout: 2,
        ..Default::default()
    };
    let mut f = fixture_with(config, &[], ScriptedKeys::default());
    let mut engine = installing(&["vim"]);
    engine.media_problems = vec![pkg("vim")];
    let code = install(&mut f.session, &mut engine, &InstallOptions::default(), &args(&["vim"])).unwrap();
    assert_eq!(code, ExitCode::Ok);
    assert!(engine.called("media vim Retry"));
    assert_eq!(f.clock.total(), Duration::from_secs(2));
    assert!(f.out.text().contains("Failed to provide package vim-1.0.noarch."));
}

#[test]
fn test_media_abort_is_a_commit_error() {
    let mut f = fixture_with(SessionConfig::default(), &["y"], ScriptedKeys::typed("a\n"));
    let mut engine = installing(&["vim"]);
    engine.media_problems = vec![pkg("vim")];
    let code = install(&mut f.session, &mut engine, &InstallOptions::default(), &args(&["vim"])).unwrap();
    assert_eq!(code, ExitCode::ErrCommit);
    assert!(f
        .out
        .text()
        .contains("Problem occurred during or after installation or removal of packages:"));
}

// --- Repositories ---

#[test]
fn test_repos_without_repositories() {
    let mut f = fixture(&[]);
    let engine = MockEngine::default();
    assert_eq!(repos(&mut f.session, &engine).unwrap(), ExitCode::NoRepos);
    assert!(f.out.text().contains("No repositories defined."));
}

#[test]
fn test_repos_lists_in_order() {
    let mut f = fixture(&[]);
    let engine = installing(&[]);
    assert_eq!(repos(&mut f.session, &engine).unwrap(), ExitCode::Ok);
    let text = f.out.text();
    let oss = text.find("| oss").unwrap();
    let extra = text.find("| extra").unwrap();
    assert!(oss < extra);
}
