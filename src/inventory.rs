//! Repository-level helpers: stale scans, app matching and branch changes.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::api::types::Repository;
use crate::error::Result;

/// Repositories whose last scan date falls strictly before `today - days`.
/// Never-scanned repositories and CLI uploads are left out.
pub fn stale_repositories(repos: &[Repository], days: u32, today: NaiveDate) -> Vec<&Repository> {
    let cutoff = today - Duration::days(i64::from(days));
    repos
        .iter()
        .filter(|r| r.source.as_deref() != Some("cli"))
        .filter(|r| r.last_scanned_on().is_some_and(|d| d < cutoff))
        .collect()
}

/// Drop repositories whose source mentions "cli" in any case.
pub fn exclude_cli_sources(repos: Vec<Repository>) -> Vec<Repository> {
    repos
        .into_iter()
        .filter(|r| !r.source.as_deref().unwrap_or("").to_lowercase().contains("cli"))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoApps {
    pub id: String,
    pub name: String,
    pub apps: Vec<String>,
}

/// Pair each repository with the CI inventory apps whose `casId` points at it.
pub fn match_repos_with_apps(repos: &[Repository], pipelines: &[Value]) -> Vec<RepoApps> {
    let mut matched: Vec<RepoApps> = repos
        .iter()
        .map(|r| RepoApps {
            id: r.id.clone(),
            name: r.repository.clone(),
            apps: Vec::new(),
        })
        .collect();

    for pipeline in pipelines {
        let (Some(cas_id), Some(app)) = (
            pipeline.get("casId").and_then(Value::as_str),
            pipeline.get("appName").and_then(Value::as_str),
        ) else {
            continue;
        };

        if let Some(entry) = matched.iter_mut().find(|m| m.id == cas_id) {
            entry.apps.push(app.to_string());
        }
    }

    matched
}

#[derive(Serialize)]
struct BranchInfo<'a> {
    source: &'a str,
    owner: &'a str,
    #[serde(rename = "defaultBranch")]
    default_branch: &'a str,
}

#[derive(Serialize)]
struct BranchFile<'a> {
    total_repositories: usize,
    repositories: BTreeMap<&'a str, BranchInfo<'a>>,
}

/// Write `repository_branches_<timestamp>.json` into `dir` and return its path.
pub fn save_repository_branches(repos: &[Repository], dir: &Path, now: NaiveDateTime) -> Result<PathBuf> {
    let file = BranchFile {
        total_repositories: repos.len(),
        repositories: repos
            .iter()
            .map(|r| {
                (
                    r.repository.as_str(),
                    BranchInfo {
                        source: r.source_or_unknown(),
                        owner: r.owner_or_unknown(),
                        default_branch: r.default_branch_or_na(),
                    },
                )
            })
            .collect(),
    };

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("repository_branches_{}.json", now.format("%Y%m%d_%H%M%S")));
    std::fs::write(&path, serde_json::to_string_pretty(&file)?)?;
    Ok(path)
}

#[derive(Debug, Default, Serialize)]
pub struct BranchOutcome {
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BranchOutcome {
    pub fn processed(&self) -> usize {
        self.updated.len() + self.skipped.len() + self.failed.len()
    }
}

/// Apply `set` to every repository the operator confirms.
///
/// A failure on one repository is recorded and the rest still run.
pub fn set_branches(
    repos: &[Repository],
    mut confirm: impl FnMut(&Repository) -> bool,
    mut set: impl FnMut(&Repository) -> Result<()>,
) -> BranchOutcome {
    let mut outcome = BranchOutcome::default();

    for repo in repos {
        if !confirm(repo) {
            outcome.skipped.push(repo.repository.clone());
            continue;
        }

        match set(repo) {
            Ok(()) => outcome.updated.push(repo.repository.clone()),
            Err(e) => {
                tracing::warn!(repository = %repo.repository, error = %e, "failed to set branch");
                outcome.failed.push((repo.repository.clone(), e.to_string()));
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use tempfile::TempDir;

    fn repo(id: &str, name: &str, source: &str, last_scan: Option<&str>) -> Repository {
        Repository {
            id: id.to_string(),
            repository: name.to_string(),
            source: Some(source.to_string()),
            owner: None,
            default_branch: Some("main".to_string()),
            last_scan_date: last_scan.map(str::to_string),
        }
    }

    #[test]
    fn stale_filter() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let repos = vec![
            repo("1", "old", "Github", Some("2024-06-01T00:00:00Z")),
            repo("2", "fresh", "Github", Some("2024-06-29T00:00:00Z")),
            repo("3", "boundary", "Github", Some("2024-06-20T23:59:59Z")),
            repo("4", "cli-upload", "cli", Some("2024-01-01T00:00:00Z")),
            repo("5", "never", "Github", None),
        ];

        let names: Vec<&str> = stale_repositories(&repos, 10, today)
            .iter()
            .map(|r| r.repository.as_str())
            .collect();
        assert_eq!(names, vec!["old"]);
    }

    #[test]
    fn cli_sources_excluded_case_insensitively() {
        let repos = vec![
            repo("1", "a", "Github", None),
            repo("2", "b", "CLI", None),
            repo("3", "c", "cliRepo", None),
        ];
        let kept = exclude_cli_sources(repos);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].repository, "a");
    }

    #[test]
    fn apps_matched_by_cas_id() {
        let repos = vec![repo("r1", "acme/api", "Github", None), repo("r2", "acme/web", "Github", None)];
        let pipelines = vec![
            json!({"appName": "api-build", "casId": "r1"}),
            json!({"appName": "api-deploy", "casId": "r1"}),
            json!({"appName": "orphan", "casId": "r9"}),
            json!({"appName": "no-cas"}),
        ];

        let matched = match_repos_with_apps(&repos, &pipelines);
        assert_eq!(matched[0].apps, vec!["api-build", "api-deploy"]);
        assert!(matched[1].apps.is_empty());
    }

    #[test]
    fn branch_file_written() {
        let dir = TempDir::new().unwrap();
        let now = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(13, 4, 5).unwrap();
        let repos = vec![repo("r1", "acme/api", "Github", None)];

        let path = save_repository_branches(&repos, dir.path(), now).unwrap();
        assert_eq!(path.file_name().unwrap(), "repository_branches_20240501_130405.json");

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["total_repositories"], 1);
        assert_eq!(written["repositories"]["acme/api"]["owner"], "Unknown");
        assert_eq!(written["repositories"]["acme/api"]["defaultBranch"], "main");
    }

    #[test]
    fn branch_setting_continues_after_failure() {
        let repos = vec![
            repo("r1", "a", "Github", None),
            repo("r2", "b", "Github", None),
            repo("r3", "c", "Github", None),
        ];

        let outcome = set_branches(
            &repos,
            |r| r.repository != "c",
            |r| {
                if r.repository == "a" {
                    Err(Error::Fetch("HTTP 404".into()))
                } else {
                    Ok(())
                }
            },
        );

        assert_eq!(outcome.updated, vec!["b"]);
        assert_eq!(outcome.skipped, vec!["c"]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "a");
        assert_eq!(outcome.processed(), 3);
    }
}
