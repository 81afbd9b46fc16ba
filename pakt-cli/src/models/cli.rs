use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use pakt_core::capability::ResKind;

/// pakt: install and remove packages from a catalog of repositories.
///
/// Global options go before the command: `pakt -n install vim`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity.
    ///
    /// Specify multiple times for more verbose output:
    ///  -v:  INFO level
    ///  -vv: DEBUG level
    ///  -vvv: TRACE level (most verbose)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress normal output, print only error messages.
    #[arg(short, long)]
    pub quiet: bool,

    /// Do not ask anything, use default answers automatically.
    #[arg(short = 'n', long)]
    pub non_interactive: bool,

    /// Switch to XML output.
    #[arg(long, alias = "xmlout")]
    pub machine_readable: bool,

    /// Ignore unknown packages.
    #[arg(short = 'i', long)]
    pub ignore_unknown: bool,

    /// Do not color the output.
    #[arg(long)]
    pub no_color: bool,

    /// Use the specified config file instead of the default.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Package catalog to use.
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// File recording the installed packages.
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install packages with specified capabilities.
    ///
    /// A capability is NAME[.ARCH][OP<VERSION>], where OP is one of <, <=, =, >=, >.
    #[command(visible_alias = "in")]
    Install(InstallArgs),

    /// Remove packages with specified capabilities.
    ///
    /// A capability is NAME[.ARCH][OP<VERSION>], where OP is one of <, <=, =, >=, >.
    #[command(visible_alias = "rm")]
    Remove(RemoveArgs),

    /// List all defined repositories.
    #[command(visible_alias = "lr")]
    Repos,
}

/// Options shared by install and remove.
#[derive(Args, Debug)]
pub struct SelectionArgs {
    /// Type of package (package, patch, pattern, product, srcpackage).
    #[arg(short = 't', long = "type", value_name = "TYPE", value_parser = parse_kind)]
    pub kinds: Vec<ResKind>,

    /// Select packages by plain name, not by capability.
    #[arg(short = 'n', long)]
    pub name: bool,

    /// Select packages solely by capability.
    #[arg(short = 'C', long)]
    pub capability: bool,

    /// Show the detailed installation summary.
    #[arg(short, long)]
    pub details: bool,

    /// Test the operation, do not actually change the system.
    #[arg(short = 'D', long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Select packages from the specified repository (alias, number or URI).
    #[arg(long, value_name = "REPO")]
    pub from: Vec<String>,

    /// Allow to replace a newer item with an older one.
    #[arg(long)]
    pub oldpackage: bool,

    /// Silently install unsigned packages.
    #[arg(long)]
    pub allow_unsigned_rpm: bool,

    #[arg(long, value_name = "REPO", hide = true)]
    pub entire_catalog: Vec<String>,

    /// Install even if the item is already installed (reinstall) or downgraded.
    #[arg(short, long)]
    pub force: bool,

    /// Capabilities to install.
    #[arg(value_name = "CAPABILITY")]
    pub packages: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Capabilities to remove.
    #[arg(value_name = "CAPABILITY")]
    pub packages: Vec<String>,
}

fn parse_kind(s: &str) -> Result<ResKind, String> {
    s.parse()
}
