// pakt-core/src/solve_commit.rs

//! Resolve the marked changes, let the user settle any problems, show the
//! summary and commit.

use tracing::{debug, error, info, warn};

use crate::engine::{
    CommitCallbacks, CommitOutcome, CommitPolicy, PackageEngine, PackageRef, Problem,
    TransactionSummary,
};
use crate::errors::{PaktError, Result};
use crate::exit_code::ExitCode;
use crate::output::{Out, Verbosity};
use crate::prompt::{ProblemAction, PromptId, PromptOptions, Prompter};
use crate::session::Session;

/// Media problems of one package are retried this many times by default
/// before the default answer turns into abort.
const MAX_MEDIA_RETRIES: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct SolveAndCommitPolicy {
    /// Commit even if the transaction is empty.
    pub force_commit: bool,
    /// Show versions and architectures in the summary and problem details.
    pub details: bool,
    pub commit: CommitPolicy,
}

/// How the user left the problem dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProblemsOutcome {
    /// Solutions were applied; resolve again.
    Solved,
    /// Every problem was skipped; go on with the transaction as it is.
    Skipped,
    Retry,
    Cancel,
}

/// Runs the solver, lets the user pick solutions for problems, confirms and
/// commits. The result is reported through the session's exit code.
pub fn solve_and_commit(
    session: &mut Session,
    engine: &mut dyn PackageEngine,
    policy: &SolveAndCommitPolicy,
) -> Result<()> {
    let summary = loop {
        session.runtime().immediate_exit_check()?;
        let resolution = engine.resolve()?;
        if resolution.problems.is_empty() {
            break resolution.summary;
        }
        info!(problems = resolution.problems.len(), "Resolver reported problems.");
        match show_problems(session, engine, &resolution.problems, policy.details)? {
            ProblemsOutcome::Solved | ProblemsOutcome::Retry => continue,
            ProblemsOutcome::Skipped => break resolution.summary,
            ProblemsOutcome::Cancel => {
                session.set_exit_code(ExitCode::ErrZypp);
                return Ok(());
            }
        }
    };

    if summary.is_empty() && !policy.force_commit {
        session.out.info("Nothing to do.");
        return Ok(());
    }
    print_summary(&session.out, &summary, policy.details);

    if !session
        .prompter
        .read_bool_answer(PromptId::YN_INST_REMOVE_CONTINUE, "Continue?", true)?
    {
        info!("Transaction declined by the user.");
        return Ok(());
    }

    let mut callbacks = PromptCallbacks::new(
        &mut session.prompter,
        session.out.clone(),
        session.config.retry_timeout,
    );
    match engine.commit(&policy.commit, &mut callbacks) {
        Ok(outcome) => {
            report_outcome(&session.out, &outcome, policy.commit.dry_run);
            Ok(())
        }
        Err(e @ PaktError::ExitRequest { .. }) => Err(e),
        Err(e) => {
            error!(error = %e, "Commit failed.");
            session.out.error(
                "Problem occurred during or after installation or removal of packages:",
                Some(&e.to_string()),
            );
            session.set_exit_code(ExitCode::ErrCommit);
            Ok(())
        }
    }
}

fn problem_options(problem: &Problem) -> PromptOptions {
    let count = problem.solutions.len();
    let mut labels: Vec<String> = (1..=count).map(|n| n.to_string()).collect();
    labels.extend(["s", "r", "c", "d"].iter().map(|s| s.to_string()));
    let cancel = count + 2;
    let mut options = PromptOptions::new(labels, cancel);
    for (i, solution) in problem.solutions.iter().enumerate() {
        options.set_option_help(i, &format!("Choose solution '{}'", solution.description));
    }
    options.set_option_help(count, "Skip this problem");
    options.set_option_help(count + 1, "Retry solving");
    options.set_option_help(cancel, "Cancel the operation");
    options.set_option_help(count + 3, "Toggle details");
    options
}

fn describe_problem(out: &Out, number: usize, total: usize, problem: &Problem, details: bool) {
    let mut text = format!("Problem: {}/{}: {}", number, total, problem.description);
    if details && !problem.details.is_empty() {
        text.push_str(&format!("\n  {}", problem.details));
    }
    for (i, solution) in problem.solutions.iter().enumerate() {
        text.push_str(&format!("\n Solution {}: {}", i + 1, solution.description));
        if details && !solution.details.is_empty() {
            text.push_str(&format!("\n  {}", solution.details));
        }
    }
    out.info_at(&format!("\n{}\n", text), Verbosity::Quiet);
}

fn show_problems(
    session: &mut Session,
    engine: &mut dyn PackageEngine,
    problems: &[Problem],
    details: bool,
) -> Result<ProblemsOutcome> {
    let mut show_details = details;
    let mut solved = false;

    for (index, problem) in problems.iter().enumerate() {
        let options = problem_options(problem);
        let count = problem.solutions.len();
        let question = "Choose from above solutions by number or skip, retry or cancel";

        loop {
            describe_problem(&session.out, index + 1, problems.len(), problem, show_details);
            let choice = session.prompter.ask(PromptId::DEP_RESOLVE, question, &options)?;
            debug!(problem = index, choice, "Problem answer.");
            if choice < count {
                engine.apply_solution(index, choice)?;
                solved = true;
            } else if choice == count {
                info!(problem = index, "Problem skipped.");
            } else if choice == count + 1 {
                return Ok(ProblemsOutcome::Retry);
            } else if choice == count + 2 {
                warn!("Problem resolution cancelled.");
                return Ok(ProblemsOutcome::Cancel);
            } else {
                show_details = !show_details;
                continue;
            }
            break;
        }
    }

    Ok(if solved {
        ProblemsOutcome::Solved
    } else {
        ProblemsOutcome::Skipped
    })
}

fn package_label(package: &PackageRef, details: bool) -> String {
    if details {
        package.to_string()
    } else {
        package.name.clone()
    }
}

fn summary_block(out: &Out, packages: &[PackageRef], what: &str, details: bool) {
    if packages.is_empty() {
        return;
    }
    let head = if packages.len() == 1 {
        format!("The following package is going to be {}:", what)
    } else {
        format!("The following {} packages are going to be {}:", packages.len(), what)
    };
    let names: Vec<String> = packages.iter().map(|p| package_label(p, details)).collect();
    out.info(&format!("\n{}\n  {}", head, names.join(" ")));
}

fn print_summary(out: &Out, summary: &TransactionSummary, details: bool) {
    summary_block(out, &summary.install, "installed", details);
    summary_block(out, &summary.remove, "REMOVED", details);
    out.info(&format!(
        "\n{} package{} to install, {} to remove.",
        summary.install.len(),
        if summary.install.len() == 1 { "" } else { "s" },
        summary.remove.len()
    ));
}

fn report_outcome(out: &Out, outcome: &CommitOutcome, dry_run: bool) {
    for package in &outcome.removed {
        out.info(&format!("Removing {} [done]", package));
    }
    for package in &outcome.installed {
        out.info(&format!("Installing: {} [done]", package));
    }
    for package in &outcome.skipped {
        out.warning(&format!("{} was skipped.", package));
    }
    match (dry_run, outcome.transaction_id) {
        (true, _) => out.info("Dry run finished, the system was not changed."),
        (false, Some(id)) => info!(transaction = %id, "Transaction finished."),
        (false, None) => {}
    }
}

/// Answers the engine's commit-time questions by prompting the user.
pub struct PromptCallbacks<'a> {
    prompter: &'a mut Prompter,
    out: Out,
    retry_timeout: u64,
    unsigned_answer: Option<bool>,
    media_retries: Vec<(PackageRef, usize)>,
}

impl<'a> PromptCallbacks<'a> {
    pub fn new(prompter: &'a mut Prompter, out: Out, retry_timeout: u64) -> Self {
        Self {
            prompter,
            out,
            retry_timeout,
            unsigned_answer: None,
            media_retries: Vec::new(),
        }
    }

    fn retries_of(&mut self, package: &PackageRef) -> &mut usize {
        let pos = match self.media_retries.iter().position(|(p, _)| p == package) {
            Some(pos) => pos,
            None => {
                self.media_retries.push((package.clone(), 0));
                self.media_retries.len() - 1
            }
        };
        &mut self.media_retries[pos].1
    }
}

impl CommitCallbacks for PromptCallbacks<'_> {
    fn accept_unsigned(&mut self, package: &PackageRef) -> Result<bool> {
        if let Some(answer) = self.unsigned_answer {
            debug!(package = %package, answer, "Using the remembered answer for unsigned packages.");
            return Ok(answer);
        }
        self.out
            .warning(&format!("Package {} is not signed.", package));
        let (answer, remember) = self.prompter.read_bool_answer_opt_save(
            PromptId::YN_UNSIGNED_PACKAGE,
            "Install it anyway?",
            false,
        )?;
        if remember {
            self.unsigned_answer = Some(answer);
        }
        Ok(answer)
    }

    fn media_problem(&mut self, package: &PackageRef, error: &str) -> Result<ProblemAction> {
        self.out
            .error(&format!("Failed to provide package {}.", package), Some(error));
        let retries = *self.retries_of(package);
        let default = if retries < MAX_MEDIA_RETRIES {
            ProblemAction::Retry
        } else {
            ProblemAction::Abort
        };
        let action = self.prompter.read_action_ari_with_timeout(
            PromptId::ARI_MEDIA_PROBLEM,
            self.retry_timeout,
            default,
        )?;
        if action == ProblemAction::Retry {
            *self.retries_of(package) += 1;
        }
        Ok(action)
    }
}
