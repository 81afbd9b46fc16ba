// pakt-core/src/commands/repos.rs
use tracing::info;

use crate::engine::{PackageEngine, RepoInfo};
use crate::errors::Result;
use crate::exit_code::ExitCode;
use crate::session::Session;

/// Lists the configured repositories.
pub fn repos(session: &mut Session, engine: &dyn PackageEngine) -> Result<ExitCode> {
    let repos = engine.repositories();
    if repos.is_empty() {
        session.out.warning(
            "No repositories defined. Operating only with the installed resolvables. Nothing can be installed.",
        );
        session.set_exit_code(ExitCode::NoRepos);
        return Ok(ExitCode::NoRepos);
    }
    info!(count = repos.len(), "Listing repositories.");
    session.out.info(&repo_table(&repos));
    session.set_exit_code(ExitCode::Ok);
    Ok(ExitCode::Ok)
}

fn repo_table(repos: &[RepoInfo]) -> String {
    let mut rows = vec![vec![
        "#".to_string(),
        "Alias".to_string(),
        "Name".to_string(),
        "Enabled".to_string(),
        "Priority".to_string(),
        "URI".to_string(),
    ]];
    for (i, repo) in repos.iter().enumerate() {
        rows.push(vec![
            (i + 1).to_string(),
            repo.alias.clone(),
            repo.name.clone(),
            if repo.enabled { "Yes" } else { "No" }.to_string(),
            repo.priority.to_string(),
            repo.url.clone(),
        ]);
    }

    let columns = rows[0].len();
    let widths: Vec<usize> = (0..columns)
        .map(|c| rows.iter().map(|r| r[c].chars().count()).max().unwrap_or(0))
        .collect();

    let render = |row: &Vec<String>| {
        row.iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };
    let separator = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("-+-");

    let mut lines = vec![render(&rows[0]), separator];
    lines.extend(rows[1..].iter().map(render));
    lines.join("\n")
}
