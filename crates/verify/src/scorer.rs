//! Owner readiness scoring.
//!
//! A run starts from the policy's starting score and loses points for each
//! defect: a missing declared owner costs the missing-owner penalty plus the
//! mismatch penalty, a declared owner that differs from CODEOWNERS costs the
//! mismatch penalty. Scores are not clamped;
//! deductions saturate at `i64::MIN`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ScoringPolicy;
use crate::fetch::fetch_many;
use crate::source::OwnershipSource;

/// Outcome of one scoring pass. Never persisted; only `score` is folded
/// into the almanac.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// The catalog declares an owner.
    #[serde(rename = "Present")]
    pub present: bool,
    /// Owner declared in the catalog.
    #[serde(rename = "Owner")]
    pub owner: String,
    /// Owner found in the repository's CODEOWNERS.
    #[serde(rename = "Reality")]
    pub reality: String,
    /// Declared owner equals the repository owner.
    #[serde(rename = "Works")]
    pub works: bool,
    #[serde(rename = "Score")]
    pub score: i64,
}

/// Fixed wrapper around the team name on a CODEOWNERS owner line,
/// e.g. `* @GhostGroup/` ... `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerFormat {
    pub prefix: String,
    pub suffix: String,
}

impl OwnerFormat {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Catch-all owner line for a team in `org`.
    pub fn codeowners(org: &str) -> Self {
        Self::new(format!("* @{}/", org), "\n")
    }

    /// Remove the suffix, then the prefix, each at most once.
    pub fn strip<'a>(&self, raw: &'a str) -> &'a str {
        let trimmed = raw.strip_suffix(self.suffix.as_str()).unwrap_or(raw);
        trimmed
            .strip_prefix(self.prefix.as_str())
            .unwrap_or(trimmed)
    }
}

/// Compare a declared owner against the stripped repository owner.
pub fn evaluate_owner(
    declared: &str,
    reality: &str,
    starting_score: i64,
    policy: &ScoringPolicy,
) -> VerificationResult {
    let mut score = starting_score;
    let present;
    let works;

    if declared.is_empty() {
        present = false;
        works = false;
        score = score.saturating_sub(policy.missing_owner_penalty);
        tracing::warn!(owner = declared, "empty field");
        // An absent owner cannot match.
        score = score.saturating_sub(policy.mismatch_penalty);
        tracing::info!(score, "new adjustment");
    } else {
        present = true;
        if declared != reality {
            works = false;
            tracing::warn!(owner = declared, reality, "unequal field");
            score = score.saturating_sub(policy.mismatch_penalty);
            tracing::info!(score, "new adjustment");
        } else {
            works = true;
            tracing::info!(owner = declared, reality, score, "matching field");
        }
    }

    VerificationResult {
        present,
        owner: declared.to_string(),
        reality: reality.to_string(),
        works,
        score,
    }
}

/// Fetches a service's CODEOWNERS and scores its declared owner.
pub struct ReadinessScorer {
    source: Arc<dyn OwnershipSource>,
    format: OwnerFormat,
    policy: ScoringPolicy,
    timeout: Duration,
}

impl ReadinessScorer {
    pub fn new(
        source: Arc<dyn OwnershipSource>,
        format: OwnerFormat,
        policy: ScoringPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            format,
            policy,
            timeout,
        }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Score `declared_owner` for `service`, starting from `starting_score`.
    ///
    /// A failed fetch does not abort scoring: the repository owner is
    /// whatever the fetch left in its slot, normally empty.
    pub async fn score(
        &self,
        service: &str,
        declared_owner: &str,
        starting_score: i64,
    ) -> VerificationResult {
        let targets: BTreeMap<usize, String> =
            [(0, self.source.target_for(service))].into_iter().collect();

        let answers = match fetch_many(Arc::clone(&self.source), &targets, self.timeout).await {
            Ok(answers) => answers,
            Err(batch) => {
                tracing::warn!(service, error = %batch, "ownership source unavailable");
                batch.results
            }
        };
        let raw = answers.first().map(String::as_str).unwrap_or_default();

        evaluate_owner(
            declared_owner,
            self.format.strip(raw),
            starting_score,
            &self.policy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const START: i64 = 100;

    #[test]
    fn missing_owner_costs_two() {
        let result = evaluate_owner("", "team-a", START, &ScoringPolicy::default());
        assert!(!result.present);
        assert!(!result.works);
        assert_eq!(result.score, START - 2);
    }

    #[test]
    fn missing_owner_costs_two_even_without_reality() {
        let result = evaluate_owner("", "", START, &ScoringPolicy::default());
        assert!(!result.works);
        assert_eq!(result.score, START - 2);
    }

    #[test]
    fn mismatch_costs_one() {
        let result = evaluate_owner("team-a", "team-b", START, &ScoringPolicy::default());
        assert!(result.present);
        assert!(!result.works);
        assert_eq!(result.score, START - 1);
        assert_eq!(result.owner, "team-a");
        assert_eq!(result.reality, "team-b");
    }

    #[test]
    fn match_costs_nothing() {
        let result = evaluate_owner("team-a", "team-a", START, &ScoringPolicy::default());
        assert!(result.present);
        assert!(result.works);
        assert_eq!(result.score, START);
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let result = evaluate_owner("Team-A", "team-a", START, &ScoringPolicy::default());
        assert!(!result.works);
    }

    #[test]
    fn penalties_come_from_policy() {
        let policy = ScoringPolicy {
            starting_score: 100,
            missing_owner_penalty: 10,
            mismatch_penalty: 5,
        };
        assert_eq!(evaluate_owner("", "x", 100, &policy).score, 85);
        assert_eq!(evaluate_owner("y", "x", 100, &policy).score, 95);
    }

    #[test]
    fn score_is_not_clamped() {
        let result = evaluate_owner("", "x", 1, &ScoringPolicy::default());
        assert_eq!(result.score, -1);
    }

    #[test]
    fn score_saturates_at_the_bottom_of_the_range() {
        let result = evaluate_owner("", "x", i64::MIN, &ScoringPolicy::default());
        assert_eq!(result.score, i64::MIN);

        let result = evaluate_owner("y", "x", i64::MIN + 1, &ScoringPolicy::default());
        assert_eq!(result.score, i64::MIN);
    }

    #[test]
    fn strip_removes_codeowners_wrapper() {
        let format = OwnerFormat::codeowners("GhostGroup");
        assert_eq!(format.strip("* @GhostGroup/team-a\n"), "team-a");
        assert_eq!(format.strip("team-a"), "team-a");
        assert_eq!(format.strip("* @OtherOrg/team-a\n"), "* @OtherOrg/team-a");
    }

    #[test]
    fn result_serializes_with_established_names() {
        let result = evaluate_owner("team-a", "team-a", START, &ScoringPolicy::default());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Present": true,
                "Owner": "team-a",
                "Reality": "team-a",
                "Works": true,
                "Score": 100,
            })
        );
    }

    struct FixedSource {
        reply: Result<String, LookupError>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl OwnershipSource for FixedSource {
        async fn fetch(&self, target: &str) -> Result<String, LookupError> {
            self.requested.lock().unwrap().push(target.to_string());
            self.reply.clone()
        }

        fn target_for(&self, service: &str) -> String {
            format!("repo://{service}")
        }
    }

    fn scorer(reply: Result<String, LookupError>) -> (ReadinessScorer, Arc<FixedSource>) {
        let source = Arc::new(FixedSource {
            reply,
            requested: Mutex::new(Vec::new()),
        });
        let scorer = ReadinessScorer::new(
            source.clone(),
            OwnerFormat::codeowners("GhostGroup"),
            ScoringPolicy::default(),
            Duration::from_secs(1),
        );
        (scorer, source)
    }

    #[tokio::test]
    async fn fetched_owner_is_stripped_before_comparison() {
        let (scorer, source) = scorer(Ok("* @GhostGroup/team-a\n".to_string()));
        let result = scorer.score("core", "team-a", START).await;

        assert!(result.works);
        assert_eq!(result.reality, "team-a");
        assert_eq!(result.score, START);
        assert_eq!(*source.requested.lock().unwrap(), ["repo://core"]);
    }

    #[tokio::test]
    async fn failed_fetch_scores_against_empty_reality() {
        let (scorer, _) = scorer(Err(LookupError::Status {
            target: "repo://core".to_string(),
            status: 404,
        }));
        let result = scorer.score("core", "team-a", START).await;

        assert!(result.present);
        assert!(!result.works);
        assert_eq!(result.reality, "");
        assert_eq!(result.score, START - 1);
    }
}
