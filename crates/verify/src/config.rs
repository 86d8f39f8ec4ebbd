//! Verifier configuration.
//!
//! Layered lowest to highest: built-in defaults, an optional TOML file,
//! `VERIFICAT_*` environment variables. The binary applies CLI flags last.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::scorer::OwnerFormat;

pub const DEFAULT_CATALOG_URL: &str = "http://localhost:7007";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_ORG: &str = "GhostGroup";
pub const DEFAULT_CODEOWNERS_PATH: &str = "contents/.github/CODEOWNERS";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Errors loading or validating a [`VerifierConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

/// Score deductions applied by the readiness scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringPolicy {
    /// Score each run starts from.
    pub starting_score: i64,
    /// Deducted when the catalog has no owner for the service.
    pub missing_owner_penalty: i64,
    /// Deducted when the declared owner does not match CODEOWNERS.
    pub mismatch_penalty: i64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            starting_score: 100,
            missing_owner_penalty: 1,
            mismatch_penalty: 1,
        }
    }
}

impl ScoringPolicy {
    /// Penalties are deductions and must not be negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("policy.missing_owner_penalty", self.missing_owner_penalty),
            ("policy.mismatch_penalty", self.mismatch_penalty),
        ] {
            if value < 0 {
                return Err(ConfigError::Invalid {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Everything a [`Verifier`](crate::Verifier) needs to reach its
/// collaborators and score a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    /// Base URL of the service catalog API.
    pub catalog_url: String,
    pub catalog_namespace: String,
    /// Base URL of the repository API.
    pub github_api: String,
    /// Organization that owns the service repositories.
    pub github_org: String,
    /// Path of the ownership file, relative to the repository API root.
    pub codeowners_path: String,
    /// Per-retrieval timeout.
    pub fetch_timeout_secs: u64,
    /// Owner-line prefix; defaults to `* @{github_org}/`.
    pub owner_prefix: Option<String>,
    /// Owner-line suffix; defaults to a newline.
    pub owner_suffix: Option<String>,
    pub policy: ScoringPolicy,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_namespace: "default".to_string(),
            github_api: DEFAULT_GITHUB_API.to_string(),
            github_org: DEFAULT_GITHUB_ORG.to_string(),
            codeowners_path: DEFAULT_CODEOWNERS_PATH.to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            owner_prefix: None,
            owner_suffix: None,
            policy: ScoringPolicy::default(),
        }
    }
}

impl VerifierConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `VERIFICAT_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = present("VERIFICAT_CATALOG_URL") {
            self.catalog_url = url;
        }
        if let Some(url) = present("VERIFICAT_GITHUB_API") {
            self.github_api = url;
        }
        if let Some(org) = present("VERIFICAT_GITHUB_ORG") {
            self.github_org = org;
        }
        if let Some(raw) = present("VERIFICAT_FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = raw.parse().map_err(|_| ConfigError::Invalid {
                key: "VERIFICAT_FETCH_TIMEOUT_SECS".to_string(),
                value: raw.clone(),
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "fetch_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.catalog_url.is_empty() {
            return Err(ConfigError::Invalid {
                key: "catalog_url".to_string(),
                value: String::new(),
            });
        }
        self.policy.validate()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// The wrapper stripped from a CODEOWNERS owner line.
    pub fn owner_format(&self) -> OwnerFormat {
        let default = OwnerFormat::codeowners(&self.github_org);
        OwnerFormat::new(
            self.owner_prefix.clone().unwrap_or(default.prefix),
            self.owner_suffix.clone().unwrap_or(default.suffix),
        )
    }
}
