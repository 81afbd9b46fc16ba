// pakt-core/src/commands/install_remove.rs
use tracing::{debug, info, warn};

use crate::capability::{PackageArg, ResKind};
use crate::engine::{
    CommitPolicy, Feedback, FeedbackKind, PackageEngine, RepoInfo, RequestAction, RequestOptions,
    SolverRequest,
};
use crate::errors::{PaktError, Result};
use crate::exit_code::ExitCode;
use crate::output::{Out, Verbosity};
use crate::session::Session;
use crate::solve_commit::{solve_and_commit, SolveAndCommitPolicy};

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Resolvable kinds from `-t`; only the first one is used.
    pub kinds: Vec<ResKind>,
    pub select_by_name: bool,
    pub select_by_cap: bool,
    pub details: bool,
    /// Repository specs from `--from`.
    pub from_repos: Vec<String>,
    pub oldpackage: bool,
    pub allow_unsigned: bool,
    /// Repositories given to `--entire-catalog`.
    pub entire_catalog: Vec<String>,
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RemoveOptions {
    pub kinds: Vec<ResKind>,
    pub select_by_name: bool,
    pub select_by_cap: bool,
    pub details: bool,
    pub dry_run: bool,
}

fn invalid_args(session: &mut Session, msg: &str, hint: Option<&str>) -> ExitCode {
    session.out.error(msg, hint);
    session.set_exit_code(ExitCode::ErrInvalidArgs);
    ExitCode::ErrInvalidArgs
}

fn too_few_arguments(session: &mut Session) -> ExitCode {
    invalid_args(
        session,
        "Too few arguments.",
        Some("At least one package name is required."),
    )
}

fn check_selection(session: &mut Session, by_name: bool, by_cap: bool) -> Option<ExitCode> {
    if by_name && by_cap {
        return Some(invalid_args(
            session,
            "The options '--name' and '--capability' cannot be used together.",
            None,
        ));
    }
    None
}

fn parse_args(session: &mut Session, args: &[String], kind: ResKind) -> Option<Vec<PackageArg>> {
    match PackageArg::parse_all(args, kind) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            invalid_args(session, &e.to_string(), None);
            None
        }
    }
}

/// Installs the packages matching `args`.
pub fn install(
    session: &mut Session,
    engine: &mut dyn PackageEngine,
    opts: &InstallOptions,
    args: &[String],
) -> Result<ExitCode> {
    if args.is_empty() && opts.entire_catalog.is_empty() {
        return Ok(too_few_arguments(session));
    }
    if let Some(code) = check_selection(session, opts.select_by_name, opts.select_by_cap) {
        return Ok(code);
    }
    if opts.force && opts.select_by_cap {
        return Ok(invalid_args(
            session,
            "The options '--force' and '--capability' cannot be used together.",
            None,
        ));
    }

    let mut args = args.to_vec();
    let mut from_repos = opts.from_repos.clone();
    if !opts.entire_catalog.is_empty() {
        if !args.is_empty() {
            session
                .out
                .warning("Ignoring arguments, marking the entire repository.");
        }
        args = vec!["*".to_string()];
        from_repos = opts.entire_catalog.clone();
    }

    let mut options = RequestOptions {
        force: opts.force,
        oldpackage: opts.oldpackage,
        force_by_cap: opts.select_by_cap,
        force_by_name: opts.select_by_name,
        from_repos: Vec::new(),
    };
    if !from_repos.is_empty() {
        match repo_specs_to_aliases(&session.out, &engine.repositories(), &from_repos) {
            Some(aliases) => options.from_repos = aliases,
            None => {
                session.set_exit_code(ExitCode::ErrInvalidArgs);
                return Ok(ExitCode::ErrInvalidArgs);
            }
        }
    }

    let kind = opts.kinds.first().copied().unwrap_or_default();
    let Some(args) = parse_args(session, &args, kind) else {
        return Ok(session.exit_code());
    };
    info!(count = args.len(), kind = %kind, "Installing.");

    let request = SolverRequest {
        action: RequestAction::Install,
        args,
        options,
    };
    let feedback = engine.mark(&request)?;
    handle_feedback(session, &feedback, true)?;

    let policy = SolveAndCommitPolicy {
        force_commit: false,
        details: opts.details,
        commit: CommitPolicy {
            dry_run: opts.dry_run,
            allow_downgrade: opts.oldpackage || opts.force,
            allow_unsigned: opts.allow_unsigned,
        },
    };
    solve_and_commit(session, engine, &policy)?;
    Ok(session.exit_code())
}

/// Removes the installed packages matching `args`.
pub fn remove(
    session: &mut Session,
    engine: &mut dyn PackageEngine,
    opts: &RemoveOptions,
    args: &[String],
) -> Result<ExitCode> {
    if args.is_empty() {
        return Ok(too_few_arguments(session));
    }

    let kind = opts.kinds.first().copied().unwrap_or_default();
    match kind {
        ResKind::Patch => {
            return Ok(invalid_args(
                session,
                "Cannot uninstall patches.",
                Some(
                    "Installed status of a patch is determined solely based on its dependencies.\n\
                     Patches are not installed in sense of copied files, database records,\n\
                     or similar.",
                ),
            ));
        }
        ResKind::SrcPackage => {
            return Ok(invalid_args(
                session,
                "Uninstallation of a source package not defined and implemented.",
                None,
            ));
        }
        _ => {}
    }
    if let Some(code) = check_selection(session, opts.select_by_name, opts.select_by_cap) {
        return Ok(code);
    }

    let Some(args) = parse_args(session, args, kind) else {
        return Ok(session.exit_code());
    };
    info!(count = args.len(), kind = %kind, "Removing.");

    let request = SolverRequest {
        action: RequestAction::Remove,
        args,
        options: RequestOptions {
            force_by_cap: opts.select_by_cap,
            force_by_name: opts.select_by_name,
            ..Default::default()
        },
    };
    let feedback = engine.mark(&request)?;
    // removing what isn't there is not worth failing over
    handle_feedback(session, &feedback, false)?;

    let policy = SolveAndCommitPolicy {
        details: opts.details,
        commit: CommitPolicy {
            dry_run: opts.dry_run,
            ..Default::default()
        },
        ..Default::default()
    };
    solve_and_commit(session, engine, &policy)?;
    Ok(session.exit_code())
}

/// Prints the engine's feedback and sets the exit code for names or
/// capabilities that were not found.
///
/// With `fail_on_not_found` a non-interactive run ends right here.
pub fn handle_feedback(
    session: &mut Session,
    feedback: &[Feedback],
    fail_on_not_found: bool,
) -> Result<()> {
    for fb in feedback {
        let msg = fb.message();
        match fb.kind {
            FeedbackKind::NotFoundName | FeedbackKind::NotFoundCap => session.out.error(&msg, None),
            FeedbackKind::AlreadyInstalled
            | FeedbackKind::NotInstalled
            | FeedbackKind::NotInstallingOlder => session.out.info(&msg),
            FeedbackKind::SetToInstall | FeedbackKind::SetToRemove => {
                session.out.info_at(&msg, Verbosity::High)
            }
        }
    }

    if !session.config.ignore_unknown && feedback.iter().any(Feedback::is_not_found) {
        session.set_exit_code(ExitCode::InfCapNotFound);
        if session.config.non_interactive && fail_on_not_found {
            warn!("Name or capability not found in non-interactive mode, stopping.");
            return Err(PaktError::exit_request(
                ExitCode::InfCapNotFound,
                "name or capability not found",
            ));
        }
        return Ok(());
    }
    session.set_exit_code(ExitCode::Ok);
    Ok(())
}

/// Maps repository specs (alias, `#N`/`N` number, or URL) to aliases.
///
/// Prints an error for every spec that matches nothing and returns `None`
/// if there was any.
pub fn repo_specs_to_aliases(out: &Out, repos: &[RepoInfo], specs: &[String]) -> Option<Vec<String>> {
    let mut aliases = Vec::new();
    let mut unknown = false;
    for spec in specs {
        match find_repo(repos, spec) {
            Some(repo) => {
                if !repo.enabled {
                    out.warning(&format!(
                        "Specified repository '{}' is disabled.",
                        repo.alias
                    ));
                }
                debug!(spec = %spec, alias = %repo.alias, "Repository spec resolved.");
                if !aliases.contains(&repo.alias) {
                    aliases.push(repo.alias.clone());
                }
            }
            None => {
                out.error(
                    &format!("Repository '{}' not found by its alias, number, or URI.", spec),
                    Some("Use 'pakt repos' to get the list of defined repositories."),
                );
                unknown = true;
            }
        }
    }
    if unknown {
        None
    } else {
        Some(aliases)
    }
}

fn find_repo<'a>(repos: &'a [RepoInfo], spec: &str) -> Option<&'a RepoInfo> {
    if let Some(repo) = repos.iter().find(|r| r.alias == spec) {
        return Some(repo);
    }
    let number = spec.strip_prefix('#').unwrap_or(spec);
    if let Ok(n) = number.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| repos.get(i));
    }
    let url = spec.trim_end_matches('/');
    repos
        .iter()
        .find(|r| !r.url.is_empty() && r.url.trim_end_matches('/') == url)
}
