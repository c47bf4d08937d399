pub mod json;
pub mod table;

use chrono::NaiveDate;
use serde_json::Value;

use crate::api::types::Repository;
use crate::inventory::{BranchOutcome, RepoApps};

/// Display a record field: strings bare, other values as JSON, "N/A" when absent.
fn field(record: &Value, key: &str) -> String {
    match record.get(key) {
        None | Some(Value::Null) => "N/A".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn render_stale_repos(repos: &[&Repository], days: u32, today: NaiveDate) -> String {
    let cutoff = today - chrono::Duration::days(i64::from(days));
    let mut output = format!("Repositories last scanned before {cutoff}:\n");
    for repo in repos {
        let scanned = repo
            .last_scanned_on()
            .map_or_else(|| "unknown".to_string(), |d| d.to_string());
        output.push_str(&format!(
            "- {} (Last scanned: {scanned} source: {})\n",
            repo.repository,
            repo.source_or_unknown()
        ));
    }
    output.push_str(&format!("\nTotal repositories found: {}\n", repos.len()));
    output
}

pub fn render_repo_apps(matched: &[RepoApps]) -> String {
    let mut output = String::from("Repositories and their associated appNames:\n");
    for entry in matched {
        output.push_str(&format!("\nRepository: {} (ID: {})\n", entry.name, entry.id));
        if entry.apps.is_empty() {
            output.push_str("  No associated appNames found\n");
        }
        for app in &entry.apps {
            output.push_str(&format!("  - {app}\n"));
        }
    }
    output
}

pub fn render_suppressions(rules: &[Value]) -> String {
    let mut output = String::from("Suppression Rules:\n");
    for rule in rules {
        let kind = field(rule, "suppressionType");
        output.push_str(&format!("\nSuppression Type: {kind}\n"));
        output.push_str(&format!("ID: {}\n", field(rule, "id")));
        output.push_str(&format!("Policy ID: {}\n", field(rule, "policyId")));
        output.push_str(&format!("Creation Date: {}\n", field(rule, "creationDate")));
        output.push_str(&format!("Comment: {}\n", field(rule, "comment")));
        if rule.get("expirationDate").is_some() {
            output.push_str(&format!("Expiration Date: {}\n", field(rule, "expirationDate")));
        }

        match (kind.as_str(), rule.get("cves"), rule.get("resources")) {
            ("Cves", Some(Value::Array(cves)), _) => {
                output.push_str("CVEs:\n");
                for cve in cves {
                    output.push_str(&format!("  - UUID: {}\n", field(cve, "uuid")));
                    output.push_str(&format!("    ID: {}\n", field(cve, "id")));
                    output.push_str(&format!("    CVE: {}\n", field(cve, "cve")));
                }
            }
            ("Resources", _, Some(Value::Array(resources))) => {
                output.push_str("Resources:\n");
                for resource in resources {
                    output.push_str(&format!("  - Account ID: {}\n", field(resource, "accountId")));
                    output.push_str(&format!("    Resource ID: {}\n", field(resource, "resourceId")));
                }
            }
            _ => {}
        }
    }
    output
}

pub fn render_tag_rules(rules: &[Value]) -> String {
    let mut output = String::from("Tag Rules:\n");
    for rule in rules {
        output.push_str(&format!("\nTag Rule ID: {}\n", field(rule, "id")));
        output.push_str(&format!("Name: {}\n", field(rule, "name")));
        output.push_str(&format!("Description: {}\n", field(rule, "description")));
        output.push_str(&format!("Created By: {}\n", field(rule, "createdBy")));
        output.push_str(&format!("Creation Date: {}\n", field(rule, "creationDate")));
        output.push_str(&format!("Is Enabled: {}\n", field(rule, "isEnabled")));
        output.push_str(&format!("Tag Rule OOTB ID: {}\n", field(rule, "tagRuleOOTBId")));
        output.push_str("Repositories:\n");
        if let Some(Value::Array(repos)) = rule.get("repositories") {
            for repo in repos {
                output.push_str(&format!(
                    "  - {} (Source: {}, Owner: {}, Default Branch: {})\n",
                    field(repo, "name"),
                    field(repo, "source"),
                    field(repo, "owner"),
                    field(repo, "defaultBranch")
                ));
            }
        }
        output.push_str(&format!("Can Do Actions: {}\n", field(rule, "canDoActions")));

        if let Some(definition) = rule.get("definition").filter(|d| !d.is_null()) {
            output.push_str("Definition:\n");
            output.push_str(&serde_json::to_string_pretty(definition).unwrap_or_default());
            output.push('\n');
        }
    }
    output
}

pub fn render_enforcement_rules(rules: &[Value]) -> String {
    let mut output = String::from("Enforcement Rules:\n");
    for rule in rules {
        output.push_str(&format!("\nRule ID: {}\n", field(rule, "id")));
        output.push_str(&format!("Name: {}\n", field(rule, "name")));
        output.push_str(&format!("Description: {}\n", field(rule, "description")));
        output.push_str(&format!("Enabled: {}\n", field(rule, "enabled")));
        output.push_str(&format!("Severity: {}\n", field(rule, "severity")));
        output.push_str(&format!("Type: {}\n", field(rule, "type")));
        if let Some(Value::Array(policies)) = rule.get("policies") {
            output.push_str("Policies:\n");
            for policy in policies {
                let policy = policy.as_str().map_or_else(|| policy.to_string(), str::to_string);
                output.push_str(&format!("  - {policy}\n"));
            }
        }
    }
    output
}

pub fn render_pipeline_risks(risks: &[Value]) -> String {
    let mut output = String::from("Pipeline Risks:\n");
    for risk in risks {
        output.push_str(&format!("\nRisk ID: {}\n", field(risk, "id")));
        for (label, key) in [
            ("Risk Type", "riskType"),
            ("Severity", "severity"),
            ("Status", "status"),
            ("Repository", "repository"),
            ("Branch", "branch"),
            ("First Detected", "firstDetected"),
            ("Last Detected", "lastDetected"),
        ] {
            output.push_str(&format!("{label}: {}\n", field(risk, key)));
        }
    }
    output
}

pub fn render_branch_outcome(outcome: &BranchOutcome, branch: &str) -> String {
    let mut output = String::new();
    for name in &outcome.updated {
        output.push_str(&format!("{name}: branch set to '{branch}'\n"));
    }
    for name in &outcome.skipped {
        output.push_str(&format!("{name}: skipped\n"));
    }
    for (name, error) in &outcome.failed {
        output.push_str(&format!("{name}: failed to set branch ({error})\n"));
    }
    output.push_str(&format!("\nTotal repositories processed: {}\n", outcome.processed()));
    output
}
