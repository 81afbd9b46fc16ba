// pakt-core/src/exit_code.rs

use std::fmt;

/// Process exit statuses reported by the front-end.
///
/// Values below 100 are errors, values from 100 up are informational and
/// mean the requested operation itself went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitCode {
    #[default]
    Ok,
    ErrBug,
    ErrSyntax,
    ErrInvalidArgs,
    /// A problem reported by the package engine.
    ErrZypp,
    ErrPrivileges,
    NoRepos,
    ZyppLocked,
    ErrCommit,
    InfUpdateNeeded,
    InfSecUpdateNeeded,
    InfRebootNeeded,
    InfRestartNeeded,
    InfCapNotFound,
    OnSignal,
    InfReposSkipped,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        match self {
            ExitCode::Ok => 0,
            ExitCode::ErrBug => 1,
            ExitCode::ErrSyntax => 2,
            ExitCode::ErrInvalidArgs => 3,
            ExitCode::ErrZypp => 4,
            ExitCode::ErrPrivileges => 5,
            ExitCode::NoRepos => 6,
            ExitCode::ZyppLocked => 7,
            ExitCode::ErrCommit => 8,
            ExitCode::InfUpdateNeeded => 100,
            ExitCode::InfSecUpdateNeeded => 101,
            ExitCode::InfRebootNeeded => 102,
            ExitCode::InfRestartNeeded => 103,
            ExitCode::InfCapNotFound => 104,
            ExitCode::OnSignal => 105,
            ExitCode::InfReposSkipped => 106,
        }
    }

    pub fn is_error(self) -> bool {
        (1..100).contains(&self.code())
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}
