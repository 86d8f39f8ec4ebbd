//! Ownership source: raw CODEOWNERS text from a service's repository.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` to avoid
//! blocking the async runtime.

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::VerifierConfig;
use crate::error::LookupError;

/// Bytes that cannot appear literally inside one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode `name` for use as a single path segment.
pub(crate) fn path_segment(name: &str) -> String {
    utf8_percent_encode(name, PATH_SEGMENT).to_string()
}

/// Retrieves the raw ownership declaration for a target.
#[async_trait]
pub trait OwnershipSource: Send + Sync {
    /// Fetch the raw text at `target`.
    async fn fetch(&self, target: &str) -> Result<String, LookupError>;

    /// The target identifier holding `service`'s ownership file.
    fn target_for(&self, service: &str) -> String;
}

/// Reads `.github/CODEOWNERS` through the GitHub contents API.
///
/// - `Accept: application/vnd.github.raw+json` so the body is the file itself
/// - `Authorization: Bearer` from `GH_TOKEN` when set
/// - the agent enforces the per-request timeout
pub struct GitHubOwnershipSource {
    api_base: String,
    org: String,
    path: String,
    token: Option<String>,
    timeout: Duration,
}

impl GitHubOwnershipSource {
    /// Build from config, taking the token from `GH_TOKEN`.
    pub fn new(config: &VerifierConfig) -> Self {
        let token = std::env::var("GH_TOKEN").ok().filter(|t| !t.is_empty());
        if token.is_none() {
            tracing::warn!("GH_TOKEN not set; repository requests are unauthenticated");
        }
        Self::with_token(config, token)
    }

    pub fn with_token(config: &VerifierConfig, token: Option<String>) -> Self {
        Self {
            api_base: config.github_api.trim_end_matches('/').to_string(),
            org: config.github_org.clone(),
            path: config.codeowners_path.trim_start_matches('/').to_string(),
            token,
            timeout: config.fetch_timeout(),
        }
    }
}

#[async_trait]
impl OwnershipSource for GitHubOwnershipSource {
    async fn fetch(&self, target: &str) -> Result<String, LookupError> {
        let url = target.to_string();
        let token = self.token.clone();
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || get_raw(&url, token.as_deref(), timeout))
            .await
            .map_err(|e| LookupError::Task {
                target: target.to_string(),
                message: e.to_string(),
            })?
    }

    fn target_for(&self, service: &str) -> String {
        let target = format!(
            "{}/repos/{}/{}/{}",
            self.api_base,
            path_segment(&self.org),
            path_segment(service),
            self.path
        );
        tracing::info!(url = %target, "new source created");
        target
    }
}

fn get_raw(url: &str, token: Option<&str>, timeout: Duration) -> Result<String, LookupError> {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    let agent = ureq::Agent::new_with_config(config);

    let mut request = agent
        .get(url)
        .header("Accept", "application/vnd.github.raw+json");
    if let Some(token) = token {
        request = request.header("Authorization", &format!("Bearer {}", token));
    }

    let response = request.call().map_err(|e| map_ureq_error(url, timeout, e))?;

    response
        .into_body()
        .read_to_string()
        .map_err(|e| LookupError::Decode {
            target: url.to_string(),
            message: e.to_string(),
        })
}

/// Classify a `ureq` failure for `target`.
pub(crate) fn map_ureq_error(target: &str, timeout: Duration, err: ureq::Error) -> LookupError {
    match err {
        ureq::Error::StatusCode(status) => LookupError::Status {
            target: target.to_string(),
            status,
        },
        ureq::Error::Timeout(_) => LookupError::Timeout {
            target: target.to_string(),
            after: timeout,
        },
        other => LookupError::Transport {
            target: target.to_string(),
            message: other.to_string(),
        },
    }
}
