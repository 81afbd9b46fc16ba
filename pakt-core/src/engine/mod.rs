// pakt-core/src/engine/mod.rs

//! The package engine seam: what the front end asks of the dependency
//! solver and package store.

pub mod catalog;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capability::{PackageArg, ResKind};
use crate::errors::{EngineError, PaktError};
use crate::prompt::ProblemAction;

pub use catalog::CatalogEngine;

/// Trait defining the operations the front end needs from a package engine.
pub trait PackageEngine {
    /// Marks the packages matching the request for installation or removal.
    fn mark(&mut self, request: &SolverRequest) -> Result<Vec<Feedback>, EngineError>;
    /// Resolves the marked changes into a transaction, reporting any problems.
    fn resolve(&mut self) -> Result<Resolution, EngineError>;
    /// Applies the chosen solution of a problem from the last resolution.
    fn apply_solution(&mut self, problem: usize, solution: usize) -> Result<(), EngineError>;
    /// Carries out the resolved transaction, asking `callbacks` when it needs a decision.
    fn commit(
        &mut self,
        policy: &CommitPolicy,
        callbacks: &mut dyn CommitCallbacks,
    ) -> Result<CommitOutcome, PaktError>;
    /// Configured repositories, in priority order.
    fn repositories(&self) -> Vec<RepoInfo>;
}

/// Decisions the engine delegates to the user during commit.
pub trait CommitCallbacks {
    /// Whether an unsigned package may be installed.
    fn accept_unsigned(&mut self, package: &PackageRef) -> Result<bool, PaktError>;
    /// What to do when a package file cannot be retrieved.
    fn media_problem(&mut self, package: &PackageRef, error: &str) -> Result<ProblemAction, PaktError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    Install,
    Remove,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Reinstall or downgrade if needed.
    pub force: bool,
    /// Allow replacing a newer package with an older one.
    pub oldpackage: bool,
    /// Match only against provided capabilities.
    pub force_by_cap: bool,
    /// Match only against package names.
    pub force_by_name: bool,
    /// Restrict candidates to these repository aliases (empty = all).
    pub from_repos: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SolverRequest {
    pub action: RequestAction,
    pub args: Vec<PackageArg>,
    pub options: RequestOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    NotFoundName,
    NotFoundCap,
    AlreadyInstalled,
    NotInstalled,
    NotInstallingOlder,
    SetToInstall,
    SetToRemove,
}

/// What happened to one request argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub arg: String,
    /// The package the feedback is about, when one was found.
    pub package: Option<PackageRef>,
}

impl Feedback {
    pub fn new(kind: FeedbackKind, arg: impl Into<String>) -> Self {
        Self {
            kind,
            arg: arg.into(),
            package: None,
        }
    }

    pub fn with_package(mut self, package: PackageRef) -> Self {
        self.package = Some(package);
        self
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, FeedbackKind::NotFoundName | FeedbackKind::NotFoundCap)
    }

    /// The message shown to the user.
    pub fn message(&self) -> String {
        let pkg = self
            .package
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| self.arg.clone());
        match self.kind {
            FeedbackKind::NotFoundName => format!("Package '{}' not found.", self.arg),
            FeedbackKind::NotFoundCap => {
                format!("No provider of '{}' found.", self.arg)
            }
            FeedbackKind::AlreadyInstalled => format!("'{}' is already installed.", pkg),
            FeedbackKind::NotInstalled => format!("Package '{}' is not installed.", self.arg),
            FeedbackKind::NotInstallingOlder => format!(
                "The selected package '{}' is older than the installed one. Use '--oldpackage' to install it.",
                pkg
            ),
            FeedbackKind::SetToInstall => format!("Selecting '{}' for installation.", pkg),
            FeedbackKind::SetToRemove => format!("Selecting '{}' for removal.", pkg),
        }
    }
}

/// Identifies one package in a repository or on the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageRef {
    pub name: String,
    pub version: String,
    pub arch: String,
    #[serde(default)]
    pub kind: ResKind,
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind != ResKind::Package {
            write!(f, "{}:", self.kind)?;
        }
        write!(f, "{}-{}.{}", self.name, self.version, self.arch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub description: String,
    pub details: String,
}

/// A conflict the solver cannot decide on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub description: String,
    pub details: String,
    pub solutions: Vec<Solution>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionSummary {
    pub install: Vec<PackageRef>,
    pub remove: Vec<PackageRef>,
}

impl TransactionSummary {
    pub fn is_empty(&self) -> bool {
        self.install.is_empty() && self.remove.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub problems: Vec<Problem>,
    pub summary: TransactionSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitPolicy {
    /// Go through the motions without changing the system.
    pub dry_run: bool,
    pub allow_downgrade: bool,
    /// Install unsigned packages without asking.
    pub allow_unsigned: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CommitOutcome {
    pub installed: Vec<PackageRef>,
    pub removed: Vec<PackageRef>,
    /// Packages left out after the user chose to ignore a problem.
    pub skipped: Vec<PackageRef>,
    pub transaction_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub alias: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_priority() -> u32 {
    99
}
