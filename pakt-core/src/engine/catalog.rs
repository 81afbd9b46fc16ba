// pakt-core/src/engine/catalog.rs

//! A package engine backed by a TOML catalog of repositories and packages
//! and a JSON file recording what is installed.
//!
//! Resolution only looks at declared conflicts; there is no dependency closure.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::{
    CommitCallbacks, CommitOutcome, CommitPolicy, Feedback, FeedbackKind, PackageEngine,
    PackageRef, Problem, RepoInfo, RequestAction, RequestOptions, Resolution, Solution,
    SolverRequest, TransactionSummary,
};
use crate::capability::{vercmp, Capability, PackageArg, ResKind};
use crate::errors::{EngineError, PaktError};
use crate::prompt::ProblemAction;

/// One `[[packages]]` entry of the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPackage {
    pub name: String,
    pub version: String,
    #[serde(default = "default_arch")]
    pub arch: String,
    pub repo: String,
    #[serde(default)]
    pub kind: ResKind,
    #[serde(default)]
    pub provides: Vec<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
    #[serde(default = "default_signed")]
    pub signed: bool,
    /// Package file, relative to the catalog's directory.
    #[serde(default)]
    pub location: Option<PathBuf>,
}

fn default_arch() -> String {
    "noarch".to_string()
}

fn default_signed() -> bool {
    true
}

impl CatalogPackage {
    fn to_ref(&self) -> PackageRef {
        PackageRef {
            name: self.name.clone(),
            version: self.version.clone(),
            arch: self.arch.clone(),
            kind: self.kind,
        }
    }

    fn is(&self, package: &PackageRef) -> bool {
        self.name == package.name
            && self.version == package.version
            && self.arch == package.arch
            && self.kind == package.kind
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    repos: Vec<RepoInfo>,
    #[serde(default)]
    packages: Vec<CatalogPackage>,
}

/// Contents of the state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstalledState {
    #[serde(default)]
    pub installed: Vec<PackageRef>,
    #[serde(default)]
    pub last_transaction: Option<Uuid>,
}

/// A way out of a problem, applied by [`PackageEngine::apply_solution`].
#[derive(Debug, Clone)]
enum Fix {
    /// Drop the catalog package from the install set.
    Unmark(usize),
    Uninstall(PackageRef),
}

#[derive(Debug)]
pub struct CatalogEngine {
    repos: Vec<RepoInfo>,
    packages: Vec<CatalogPackage>,
    base_dir: Option<PathBuf>,
    state_path: Option<PathBuf>,
    state: InstalledState,
    to_install: Vec<usize>,
    to_remove: Vec<PackageRef>,
    pending: Vec<Vec<Fix>>,
}

impl CatalogEngine {
    /// Loads the catalog and, if given, the state file. A missing state file
    /// means nothing is installed yet.
    pub fn load(catalog_path: &Path, state_path: Option<&Path>) -> Result<Self, EngineError> {
        info!(path = %catalog_path.display(), "Loading package catalog.");
        let content = fs::read_to_string(catalog_path).map_err(|e| {
            EngineError::Catalog(format!(
                "Failed to read catalog {}: {}",
                catalog_path.display(),
                e
            ))
        })?;
        let mut engine = Self::from_toml_str(&content)?;
        engine.base_dir = catalog_path.parent().map(Path::to_path_buf);

        if let Some(path) = state_path {
            engine.state = load_state(path)?;
            engine.state_path = Some(path.to_path_buf());
        }
        Ok(engine)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, EngineError> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|e| EngineError::Parse(format!("Invalid catalog: {}", e)))?;

        let mut aliases = BTreeSet::new();
        for repo in &file.repos {
            if repo.alias.trim().is_empty() {
                return Err(EngineError::Catalog("Repository with an empty alias.".into()));
            }
            if !aliases.insert(repo.alias.as_str()) {
                return Err(EngineError::Catalog(format!(
                    "Repository alias '{}' is used more than once.",
                    repo.alias
                )));
            }
        }
        for pkg in &file.packages {
            if !aliases.contains(pkg.repo.as_str()) {
                return Err(EngineError::Catalog(format!(
                    "Package '{}' refers to unknown repository '{}'.",
                    pkg.name, pkg.repo
                )));
            }
        }

        debug!(repos = file.repos.len(), packages = file.packages.len(), "Catalog parsed.");
        let mut repos = file.repos;
        repos.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.alias.cmp(&b.alias)));
        Ok(Self {
            repos,
            packages: file.packages,
            base_dir: None,
            state_path: None,
            state: InstalledState::default(),
            to_install: Vec::new(),
            to_remove: Vec::new(),
            pending: Vec::new(),
        })
    }

    pub fn with_installed(mut self, installed: Vec<PackageRef>) -> Self {
        self.state.installed = installed;
        self
    }

    pub fn installed(&self) -> &[PackageRef] {
        &self.state.installed
    }

    pub fn last_transaction(&self) -> Option<Uuid> {
        self.state.last_transaction
    }

    fn repo(&self, alias: &str) -> Option<&RepoInfo> {
        self.repos.iter().find(|r| r.alias == alias)
    }

    fn priority_of(&self, pkg: &CatalogPackage) -> u32 {
        self.repo(&pkg.repo).map_or(u32::MAX, |r| r.priority)
    }

    fn catalog_entry(&self, package: &PackageRef) -> Option<&CatalogPackage> {
        self.packages.iter().find(|p| p.is(package))
    }

    /// Whether `pkg` (or, failing that, just its name) satisfies `cap`.
    fn provides(&self, name: &str, version: &str, provides: &[String], cap: &Capability) -> bool {
        if cap.name_matches(name) && cap.version_matches(version) {
            return true;
        }
        provides.iter().any(|p| match Capability::parse(p) {
            Ok(provided) => {
                cap.name_matches(&provided.name)
                    && match (&cap.constraint, &provided.constraint) {
                        (None, _) => true,
                        (Some(_), Some((_, v))) => cap.version_matches(v),
                        // an unversioned provide carries the package version
                        (Some(_), None) => cap.version_matches(version),
                    }
            }
            Err(e) => {
                trace!(provide = %p, error = %e, "Skipping unparsable provide.");
                false
            }
        })
    }

    fn installed_provides(&self, package: &PackageRef, cap: &Capability) -> bool {
        let provides = self
            .catalog_entry(package)
            .map(|p| p.provides.as_slice())
            .unwrap_or_default();
        self.provides(&package.name, &package.version, provides, cap)
    }

    fn candidates(&self, arg: &PackageArg, options: &RequestOptions, by_cap: bool) -> Vec<usize> {
        let cap = &arg.capability;
        self.packages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == arg.kind && cap.arch_matches(&p.arch))
            .filter(|(_, p)| self.repo(&p.repo).map_or(false, |r| r.enabled))
            .filter(|(_, p)| options.from_repos.is_empty() || options.from_repos.contains(&p.repo))
            .filter(|(_, p)| {
                if by_cap {
                    self.provides(&p.name, &p.version, &p.provides, cap)
                } else {
                    cap.name_matches(&p.name) && cap.version_matches(&p.version)
                }
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Picks one package per name: best repository priority, then newest version.
    fn best_per_name(&self, candidates: Vec<usize>) -> Vec<usize> {
        let mut best: BTreeMap<&str, usize> = BTreeMap::new();
        for idx in candidates {
            let pkg = &self.packages[idx];
            match best.get(pkg.name.as_str()) {
                Some(&current) if !self.is_better(idx, current) => {}
                _ => {
                    best.insert(pkg.name.as_str(), idx);
                }
            }
        }
        best.into_values().collect()
    }

    fn is_better(&self, a: usize, b: usize) -> bool {
        let (pa, pb) = (&self.packages[a], &self.packages[b]);
        match self.priority_of(pa).cmp(&self.priority_of(pb)) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => vercmp(&pa.version, &pb.version) == Ordering::Greater,
        }
    }

    fn mark_install(&mut self, arg: &PackageArg, options: &RequestOptions) -> Vec<Feedback> {
        let mut found = if options.force_by_cap {
            Vec::new()
        } else {
            self.candidates(arg, options, false)
        };
        if found.is_empty() && !options.force_by_name {
            found = self.candidates(arg, options, true);
        }
        if found.is_empty() {
            let kind = if options.force_by_name {
                FeedbackKind::NotFoundName
            } else if options.force_by_cap || arg.capability.constraint.is_some() {
                FeedbackKind::NotFoundCap
            } else {
                FeedbackKind::NotFoundName
            };
            return vec![Feedback::new(kind, &arg.raw)];
        }

        let mut feedback = Vec::new();
        for idx in self.best_per_name(found) {
            let pkg = &self.packages[idx];
            let candidate = pkg.to_ref();
            let installed = self
                .state
                .installed
                .iter()
                .find(|i| i.name == pkg.name && i.kind == pkg.kind);
            if let Some(installed) = installed {
                let ord = vercmp(&pkg.version, &installed.version);
                if ord == Ordering::Equal && installed.arch == pkg.arch && !options.force {
                    feedback.push(
                        Feedback::new(FeedbackKind::AlreadyInstalled, &arg.raw)
                            .with_package(installed.clone()),
                    );
                    continue;
                }
                if ord == Ordering::Less && !options.oldpackage && !options.force {
                    feedback.push(
                        Feedback::new(FeedbackKind::NotInstallingOlder, &arg.raw)
                            .with_package(candidate),
                    );
                    continue;
                }
            }
            if !self.to_install.contains(&idx) {
                self.to_install.push(idx);
            }
            debug!(package = %candidate, "Marked for installation.");
            feedback.push(Feedback::new(FeedbackKind::SetToInstall, &arg.raw).with_package(candidate));
        }
        feedback
    }

    fn mark_remove(&mut self, arg: &PackageArg, options: &RequestOptions) -> Vec<Feedback> {
        let cap = &arg.capability;
        let matches: Vec<PackageRef> = self
            .state
            .installed
            .iter()
            .filter(|i| i.kind == arg.kind && cap.arch_matches(&i.arch))
            .filter(|i| {
                let by_name = !options.force_by_cap && cap.name_matches(&i.name) && cap.version_matches(&i.version);
                by_name || (!options.force_by_name && self.installed_provides(i, cap))
            })
            .cloned()
            .collect();

        if matches.is_empty() {
            let known = self.packages.iter().any(|p| cap.name_matches(&p.name));
            let kind = if known {
                FeedbackKind::NotInstalled
            } else if options.force_by_cap {
                FeedbackKind::NotFoundCap
            } else {
                FeedbackKind::NotFoundName
            };
            return vec![Feedback::new(kind, &arg.raw)];
        }

        matches
            .into_iter()
            .map(|package| {
                if !self.to_remove.contains(&package) {
                    self.to_remove.push(package.clone());
                }
                debug!(package = %package, "Marked for removal.");
                Feedback::new(FeedbackKind::SetToRemove, &arg.raw).with_package(package)
            })
            .collect()
    }

    /// Packages that will be on the system after the transaction, with the
    /// catalog index for those coming from the install set.
    fn future_system(&self) -> Vec<(PackageRef, Option<usize>)> {
        let mut system: Vec<(PackageRef, Option<usize>)> = self
            .state
            .installed
            .iter()
            .filter(|i| !self.to_remove.contains(i))
            .filter(|i| {
                !self.to_install.iter().any(|&idx| {
                    let p = &self.packages[idx];
                    p.name == i.name && p.kind == i.kind
                })
            })
            .map(|i| (i.clone(), None))
            .collect();
        system.extend(self.to_install.iter().map(|&idx| (self.packages[idx].to_ref(), Some(idx))));
        system
    }

    fn find_problems(&self) -> (Vec<Problem>, Vec<Vec<Fix>>) {
        let system = self.future_system();
        let mut problems = Vec::new();
        let mut fixes = Vec::new();
        let mut seen = BTreeSet::new();

        for &idx in &self.to_install {
            let pkg = &self.packages[idx];
            for conflict in &pkg.conflicts {
                let cap = match Capability::parse(conflict) {
                    Ok(cap) => cap,
                    Err(e) => {
                        warn!(package = %pkg.name, conflict = %conflict, error = %e, "Ignoring unparsable conflict.");
                        continue;
                    }
                };
                for (other, other_idx) in &system {
                    if *other_idx == Some(idx) || !self.installed_provides(other, &cap) {
                        continue;
                    }
                    let me = pkg.to_ref();
                    let key = if me < *other {
                        (me.clone(), other.clone())
                    } else {
                        (other.clone(), me.clone())
                    };
                    if !seen.insert(key) {
                        continue;
                    }

                    let mut solutions = vec![Solution {
                        description: format!("do not install {}", me),
                        details: format!("{} stays as it is.", other),
                    }];
                    let mut ways = vec![Fix::Unmark(idx)];
                    match other_idx {
                        Some(other_idx) => {
                            solutions.push(Solution {
                                description: format!("do not install {}", other),
                                details: format!("{} will be installed.", me),
                            });
                            ways.push(Fix::Unmark(*other_idx));
                        }
                        None => {
                            solutions.push(Solution {
                                description: format!("deinstallation of {}", other),
                                details: format!("{} is removed to make room for {}.", other, me),
                            });
                            ways.push(Fix::Uninstall(other.clone()));
                        }
                    }
                    problems.push(Problem {
                        description: format!("{} conflicts with '{}' provided by {}", me, conflict, other),
                        details: format!("The repository package {} declares a conflict with '{}'.", me, conflict),
                        solutions,
                    });
                    fixes.push(ways);
                }
            }
        }
        (problems, fixes)
    }

    fn summary(&self) -> TransactionSummary {
        TransactionSummary {
            install: self.to_install.iter().map(|&idx| self.packages[idx].to_ref()).collect(),
            remove: self.to_remove.clone(),
        }
    }

    fn file_of(&self, pkg: &CatalogPackage) -> Option<PathBuf> {
        pkg.location.as_ref().map(|loc| match &self.base_dir {
            Some(base) if loc.is_relative() => base.join(loc),
            _ => loc.clone(),
        })
    }

    /// Checks the package file until it is there or the user gives up on it.
    /// `Ok(false)` means skip the package.
    fn retrieve(
        &self,
        pkg: &CatalogPackage,
        callbacks: &mut dyn CommitCallbacks,
    ) -> Result<bool, PaktError> {
        let Some(path) = self.file_of(pkg) else {
            return Ok(true);
        };
        loop {
            if path.is_file() {
                return Ok(true);
            }
            let error = format!("File '{}' not found on medium.", path.display());
            warn!(package = %pkg.name, path = %path.display(), "Package file missing.");
            match callbacks.media_problem(&pkg.to_ref(), &error)? {
                ProblemAction::Retry => continue,
                ProblemAction::Ignore => return Ok(false),
                ProblemAction::Abort => {
                    return Err(EngineError::CommitAborted(format!(
                        "Failed to retrieve {}.",
                        pkg.to_ref()
                    ))
                    .into())
                }
            }
        }
    }

    fn save_state(&self, state: &InstalledState) -> Result<(), EngineError> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| EngineError::State(format!("Failed to serialize state: {}", e)))?;
        fs::write(path, json)?;
        info!(path = %path.display(), "Saved installed package state.");
        Ok(())
    }
}

fn load_state(path: &Path) -> Result<InstalledState, EngineError> {
    if !path.exists() {
        debug!(path = %path.display(), "No state file yet, nothing is installed.");
        return Ok(InstalledState::default());
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        EngineError::State(format!("Invalid state file {}: {}", path.display(), e))
    })
}

impl PackageEngine for CatalogEngine {
    fn mark(&mut self, request: &SolverRequest) -> Result<Vec<Feedback>, EngineError> {
        let mut feedback = Vec::new();
        for arg in &request.args {
            let mut fb = match request.action {
                RequestAction::Install => self.mark_install(arg, &request.options),
                RequestAction::Remove => self.mark_remove(arg, &request.options),
            };
            feedback.append(&mut fb);
        }
        Ok(feedback)
    }

    fn resolve(&mut self) -> Result<Resolution, EngineError> {
        let (problems, fixes) = self.find_problems();
        self.pending = fixes;
        info!(problems = problems.len(), "Resolved.");
        Ok(Resolution {
            problems,
            summary: self.summary(),
        })
    }

    fn apply_solution(&mut self, problem: usize, solution: usize) -> Result<(), EngineError> {
        let fix = self
            .pending
            .get(problem)
            .and_then(|ways| ways.get(solution))
            .cloned()
            .ok_or_else(|| {
                EngineError::State(format!("No solution {} for problem {}.", solution, problem))
            })?;
        debug!(problem, solution, fix = ?fix, "Applying solution.");
        match fix {
            Fix::Unmark(idx) => self.to_install.retain(|&i| i != idx),
            Fix::Uninstall(package) => {
                if !self.to_remove.contains(&package) {
                    self.to_remove.push(package);
                }
            }
        }
        Ok(())
    }

    fn commit(
        &mut self,
        policy: &CommitPolicy,
        callbacks: &mut dyn CommitCallbacks,
    ) -> Result<CommitOutcome, PaktError> {
        let mut state = self.state.clone();
        let mut outcome = CommitOutcome::default();

        for package in &self.to_remove {
            state.installed.retain(|i| i != package);
            outcome.removed.push(package.clone());
        }

        for &idx in &self.to_install {
            let pkg = &self.packages[idx];
            let package = pkg.to_ref();
            let older = state
                .installed
                .iter()
                .any(|i| i.name == pkg.name && i.kind == pkg.kind && vercmp(&pkg.version, &i.version) == Ordering::Less);
            if older && !policy.allow_downgrade {
                warn!(package = %package, "Downgrade not allowed, skipping.");
                outcome.skipped.push(package);
                continue;
            }
            if !pkg.signed && !policy.allow_unsigned && !callbacks.accept_unsigned(&package)? {
                info!(package = %package, "Unsigned package rejected.");
                outcome.skipped.push(package);
                continue;
            }
            if !self.retrieve(pkg, callbacks)? {
                outcome.skipped.push(package);
                continue;
            }
            state.installed.retain(|i| !(i.name == pkg.name && i.kind == pkg.kind));
            state.installed.push(package.clone());
            outcome.installed.push(package);
        }

        if policy.dry_run {
            info!("Dry run, leaving the system untouched.");
        } else {
            let id = Uuid::new_v4();
            state.installed.sort();
            state.last_transaction = Some(id);
            self.save_state(&state)?;
            self.state = state;
            outcome.transaction_id = Some(id);
            info!(transaction = %id, installed = outcome.installed.len(), removed = outcome.removed.len(), "Transaction committed.");
        }

        self.to_install.clear();
        self.to_remove.clear();
        self.pending.clear();
        Ok(outcome)
    }

    fn repositories(&self) -> Vec<RepoInfo> {
        self.repos.clone()
    }
}
