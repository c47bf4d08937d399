//! Blocking client for the posture API.
//!
//! Every call after login carries the bearer token from [`Client::login`].
//! List endpoints return JSON arrays; anything else is a fetch failure.

pub mod source;
pub mod types;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{json, Value};
use std::time::Duration;
use ureq::{Agent, AgentBuilder, Request};

use crate::config::Credentials;
use crate::error::{Error, Result};
use types::Repository;

pub use source::PipelineSource;

/// Unreserved characters stay as they are; `/` in a branch name must not
/// turn into a path separator.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

pub const CI_INVENTORY: &str = "/code/api/v1/ci-inventory";
pub const REPOSITORIES: &str = "/code/api/v1/repositories";
pub const SUPPRESSIONS: &str = "/code/api/v1/suppressions";
pub const TAG_RULES: &str = "/code/api/v1/tag-rules";
pub const ENFORCEMENT_RULES: &str = "/code/api/v1/policies/enforcement-rules";
pub const PIPELINE_RISKS: &str = "/code/api/v1/risks/pipeline";

/// Optional filters for the tag rule listing.
#[derive(Debug, Default, Clone)]
pub struct TagFilter {
    pub tag_type: Option<String>,
    pub repo_id: Option<String>,
    pub file_path: Option<String>,
}

pub struct Client {
    agent: Agent,
    base_url: String,
    token: String,
}

impl Client {
    /// Exchange the key pair for a bearer token.
    pub fn login(credentials: &Credentials, timeout: Duration) -> Result<Self> {
        let agent = AgentBuilder::new().timeout(timeout).build();
        let url = format!("{}/login", credentials.api_url);
        tracing::debug!(%url, "requesting token");

        let response = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_json(json!({
                "username": credentials.access_key,
                "password": credentials.secret_key,
            }))
            .map_err(|e| Error::Authentication(describe(e)))?;

        let body: Value = response
            .into_json()
            .map_err(|e| Error::Authentication(format!("unreadable login response: {e}")))?;

        let token = body
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Authentication("login response carried no token".to_string()))?;

        Ok(Client {
            agent,
            base_url: credentials.api_url.clone(),
            token: token.to_string(),
        })
    }

    fn request(&self, method: &str, path: &str) -> Request {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%method, %url, "api request");
        self.agent
            .request(method, &url)
            .set("Accept", "application/json")
            .set("Authorization", &format!("Bearer {}", self.token))
    }

    fn list(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<Value>> {
        let mut request = self.request("GET", path);
        for (k, v) in query {
            request = request.query(k, v);
        }

        let response = request.call().map_err(|e| Error::Fetch(describe(e)))?;
        let body: Value = response
            .into_json()
            .map_err(|e| Error::Fetch(format!("unreadable response from {path}: {e}")))?;
        into_records(body, path)
    }

    pub fn pipeline_tools(&self) -> Result<Vec<Value>> {
        self.list(CI_INVENTORY, &[])
    }

    pub fn repositories(&self) -> Result<Vec<Repository>> {
        self.list(REPOSITORIES, &[])?
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                serde_json::from_value(value).map_err(|e| Error::MalformedRecord {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    pub fn suppressions(&self) -> Result<Vec<Value>> {
        self.list(SUPPRESSIONS, &[])
    }

    pub fn tag_rules(&self, filter: &TagFilter) -> Result<Vec<Value>> {
        let query: Vec<(&str, &str)> = [
            ("type", filter.tag_type.as_deref()),
            ("repoId", filter.repo_id.as_deref()),
            ("filePath", filter.file_path.as_deref()),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect();

        self.list(TAG_RULES, &query)
    }

    pub fn enforcement_rules(&self) -> Result<Vec<Value>> {
        self.list(ENFORCEMENT_RULES, &[])
    }

    pub fn pipeline_risks(&self) -> Result<Vec<Value>> {
        self.list(PIPELINE_RISKS, &[])
    }

    /// Suppress one resource for `policy_id`. Returns the API's response body.
    pub fn create_suppression(
        &self,
        policy_id: &str,
        account_id: &str,
        resource_id: &str,
        comment: &str,
    ) -> Result<Value> {
        let payload = suppression_payload(account_id, resource_id, comment);
        let response = self
            .request("POST", &suppression_path(policy_id))
            .set("Content-Type", "application/json")
            .send_json(payload)
            .map_err(|e| Error::Fetch(describe(e)))?;

        // some deployments answer with an empty body
        let text = response.into_string()?;
        if text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            Ok(serde_json::from_str(&text)?)
        }
    }

    /// Returns the HTTP status of the delete.
    pub fn delete_suppression(&self, policy_id: &str, suppression_id: &str) -> Result<u16> {
        let response = self
            .request(
                "DELETE",
                &format!(
                    "{}/justifications/{}",
                    suppression_path(policy_id),
                    segment(suppression_id)
                ),
            )
            .call()
            .map_err(|e| Error::Fetch(describe(e)))?;
        Ok(response.status())
    }

    pub fn set_scanned_branch(&self, repo_id: &str, branch: &str) -> Result<()> {
        self.request("POST", &scanned_branch_path(repo_id, branch))
            .set("Content-Type", "application/json")
            .call()
            .map_err(|e| Error::Fetch(describe(e)))?;
        Ok(())
    }
}

fn segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

fn suppression_path(policy_id: &str) -> String {
    format!("/bridgecrew/api/v1/suppressions/{}", segment(policy_id))
}

fn scanned_branch_path(repo_id: &str, branch: &str) -> String {
    format!(
        "/bridgecrew/api/v1/branches/{}/scannedBranch/{}",
        segment(repo_id),
        segment(branch)
    )
}

fn suppression_payload(account_id: &str, resource_id: &str, comment: &str) -> Value {
    json!({
        "suppressionType": "Resources",
        "comment": comment,
        "origin": "AutomationScript",
        "expirationTime": "0",
        "resources": [
            {"accountId": account_id, "id": resource_id}
        ],
    })
}

/// Unwrap a list response. `null` reads as an empty list and a `{"data": [...]}`
/// envelope is accepted.
fn into_records(body: Value, path: &str) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(Error::Fetch(format!("{path}: expected a JSON array"))),
        },
        _ => Err(Error::Fetch(format!("{path}: expected a JSON array"))),
    }
}

fn describe(error: ureq::Error) -> String {
    match error {
        ureq::Error::Status(code, response) => {
            let url = response.get_url().to_string();
            let body = response.into_string().unwrap_or_default();
            status_message(code, &url, &body)
        }
        ureq::Error::Transport(t) => format!("request error: {t}"),
    }
}

fn status_message(code: u16, url: &str, body: &str) -> String {
    let body = body.trim();
    if code == 403 {
        format!("HTTP 403 Forbidden from {url}, check the access key and its permissions: {body}")
    } else {
        format!("HTTP {code} from {url}: {body}")
    }
}
