use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::PipelinesArgs;
use crate::cycle::{CycleOptions, DEFAULT_LOOKBACK_DAYS};
use crate::error::{Error, Result};
use crate::store::retention::DEFAULT_RETENTION_DAYS;
use crate::store::sqlite;

pub const API_URL_VAR: &str = "PRISMA_API_URL";
pub const ACCESS_KEY_VAR: &str = "PRISMA_ACCESS_KEY";
pub const SECRET_KEY_VAR: &str = "PRISMA_SECRET_KEY";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// API endpoint and key pair, read from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub api_url: String,
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let (api_url, access_key, secret_key) =
            match (get(API_URL_VAR), get(ACCESS_KEY_VAR), get(SECRET_KEY_VAR)) {
                (Some(u), Some(a), Some(s)) => (u, a, s),
                (u, a, s) => {
                    let missing: Vec<&str> = [(API_URL_VAR, u.is_none()), (ACCESS_KEY_VAR, a.is_none()), (SECRET_KEY_VAR, s.is_none())]
                        .into_iter()
                        .filter(|(_, absent)| *absent)
                        .map(|(name, _)| name)
                        .collect();
                    return Err(Error::Configuration(format!(
                        "required environment variables not set: {}",
                        missing.join(", ")
                    )));
                }
            };

        Ok(Credentials {
            api_url: api_url.trim().trim_end_matches('/').to_string(),
            access_key,
            secret_key,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_url", &self.api_url)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Optional settings from config.toml.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub lookback_days: Option<u32>,
    pub retention_days: Option<u32>,
    pub database: Option<PathBuf>,
    /// humantime duration, e.g. "45s"
    pub timeout: Option<String>,
}

impl FileSettings {
    /// Load ~/.config/pcdrift/config.toml (or platform equivalent).
    /// A missing file yields defaults.
    pub fn load() -> Result<Self> {
        match directories::ProjectDirs::from("", "", "pcdrift") {
            Some(dirs) => Self::load_from(&dirs.config_dir().join("config.toml")),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        Self::parse(&text).map_err(|e| Error::Configuration(format!("{}: {e}", path.display())))
    }

    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn timeout(&self) -> Result<Duration> {
        match &self.timeout {
            Some(s) => humantime::parse_duration(s)
                .map_err(|e| Error::Configuration(format!("invalid timeout '{s}': {e}"))),
            None => Ok(DEFAULT_TIMEOUT),
        }
    }
}

/// Settings for the tracking commands, resolved from flags, file and defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub lookback_days: u32,
    pub retention_days: u32,
    pub timeout: Duration,
    pub json_output: bool,
}

impl Config {
    pub fn from_pipelines_args(args: &PipelinesArgs, file: &FileSettings) -> Result<Self> {
        Ok(Config {
            db_path: resolve_db_path(args.db.as_deref(), file)?,
            lookback_days: args.lookback_days.or(file.lookback_days).unwrap_or(DEFAULT_LOOKBACK_DAYS),
            retention_days: args.retention_days.or(file.retention_days).unwrap_or(DEFAULT_RETENTION_DAYS),
            timeout: file.timeout()?,
            json_output: args.json,
        })
    }

    pub fn cycle_options(&self) -> CycleOptions {
        CycleOptions {
            lookback_days: self.lookback_days,
            retention_days: self.retention_days,
        }
    }
}

pub fn resolve_db_path(flag: Option<&Path>, file: &FileSettings) -> Result<PathBuf> {
    match flag.or(file.database.as_deref()) {
        Some(p) => Ok(p.to_path_buf()),
        None => sqlite::default_db_path(),
    }
}
