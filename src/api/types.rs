use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    pub repository: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub last_scan_date: Option<String>,
}

impl Repository {
    /// Calendar date of the last scan, None when never scanned or unparseable.
    pub fn last_scanned_on(&self) -> Option<NaiveDate> {
        let raw = self.last_scan_date.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
            return Some(dt.date_naive());
        }
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(dt.date());
        }
        NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok()
    }

    pub fn source_or_unknown(&self) -> &str {
        self.source.as_deref().unwrap_or("Unknown")
    }

    pub fn owner_or_unknown(&self) -> &str {
        self.owner.as_deref().unwrap_or("Unknown")
    }

    pub fn default_branch_or_na(&self) -> &str {
        self.default_branch.as_deref().unwrap_or("N/A")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repo(last_scan: Option<&str>) -> Repository {
        serde_json::from_value(json!({
            "id": "r1",
            "repository": "acme/api",
            "source": "Github",
            "lastScanDate": last_scan,
            "somethingElse": 1,
        }))
        .unwrap()
    }

    #[test]
    fn parses_camel_case_and_ignores_extra_fields() {
        let r = repo(None);
        assert_eq!(r.repository, "acme/api");
        assert_eq!(r.source_or_unknown(), "Github");
        assert_eq!(r.owner_or_unknown(), "Unknown");
        assert_eq!(r.default_branch_or_na(), "N/A");
    }

    #[test]
    fn scan_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(repo(Some("2024-03-09T12:30:00Z")).last_scanned_on(), expected);
        assert_eq!(repo(Some("2024-03-09T12:30:00.123+02:00")).last_scanned_on(), expected);
        assert_eq!(repo(Some("2024-03-09T12:30:00.123")).last_scanned_on(), expected);
        assert_eq!(repo(Some("2024-03-09")).last_scanned_on(), expected);
        assert_eq!(repo(Some("")).last_scanned_on(), None);
        assert_eq!(repo(Some("yesterday")).last_scanned_on(), None);
        assert_eq!(repo(None).last_scanned_on(), None);
    }
}
