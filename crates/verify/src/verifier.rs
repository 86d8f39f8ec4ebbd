//! End-to-end verification run for one service.
//!
//! `Start → CatalogLookup → Scoring → Persist → Done`. A catalog failure
//! aborts before scoring and nothing is persisted. A successful run records
//! exactly one entry in the almanac, whatever its score.

use std::sync::Arc;

use tracing::Instrument;
use verificat_almanac::{AlmanacStore, Backing};

use crate::catalog::{BackstageCatalog, CatalogLookup};
use crate::config::VerifierConfig;
use crate::error::VerifyError;
use crate::scorer::{ReadinessScorer, VerificationResult};
use crate::source::{GitHubOwnershipSource, OwnershipSource};

pub struct Verifier<B> {
    catalog: Arc<dyn CatalogLookup>,
    scorer: ReadinessScorer,
    store: Arc<AlmanacStore<B>>,
}

impl<B> Verifier<B>
where
    B: Backing + Send + 'static,
{
    pub fn new(
        catalog: Arc<dyn CatalogLookup>,
        source: Arc<dyn OwnershipSource>,
        store: Arc<AlmanacStore<B>>,
        config: &VerifierConfig,
    ) -> Self {
        let scorer = ReadinessScorer::new(
            source,
            config.owner_format(),
            config.policy,
            config.fetch_timeout(),
        );
        Self {
            catalog,
            scorer,
            store,
        }
    }

    /// Wire up the Backstage catalog and GitHub ownership source.
    pub fn from_config(config: &VerifierConfig, store: Arc<AlmanacStore<B>>) -> Self {
        Self::new(
            Arc::new(BackstageCatalog::new(config)),
            Arc::new(GitHubOwnershipSource::new(config)),
            store,
            config,
        )
    }

    pub fn store(&self) -> &Arc<AlmanacStore<B>> {
        &self.store
    }

    /// Run the full lookup, score and persist sequence for `service`.
    pub async fn run_verification(&self, service: &str) -> Result<VerificationResult, VerifyError> {
        self.run(service)
            .instrument(tracing::info_span!("verification", service))
            .await
    }

    async fn run(&self, service: &str) -> Result<VerificationResult, VerifyError> {
        let owner = self
            .catalog
            .lookup_owner(service)
            .await
            .map_err(|source| {
                tracing::error!(error = %source, "catalog lookup failed; run aborted");
                VerifyError::Catalog {
                    service: service.to_string(),
                    source,
                }
            })?;

        let starting_score = self.scorer.policy().starting_score;
        let result = self.scorer.score(service, &owner, starting_score).await;

        let store = Arc::clone(&self.store);
        let name = service.to_string();
        let score = result.score;
        tokio::task::spawn_blocking(move || store.record_run(&name, score))
            .await
            .map_err(|e| VerifyError::Task(e.to_string()))??;

        tracing::info!(
            score = result.score,
            run_count = self.store.run_count(service),
            "verification recorded"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubCatalog {
        owners: HashMap<String, String>,
    }

    #[async_trait]
    impl CatalogLookup for StubCatalog {
        async fn lookup_owner(&self, service: &str) -> Result<String, LookupError> {
            self.owners
                .get(service)
                .cloned()
                .ok_or_else(|| LookupError::NotFound {
                    service: service.to_string(),
                })
        }
    }

    struct StubSource {
        codeowners: HashMap<String, String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OwnershipSource for StubSource {
        async fn fetch(&self, target: &str) -> Result<String, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.codeowners
                .get(target)
                .cloned()
                .ok_or_else(|| LookupError::Status {
                    target: target.to_string(),
                    status: 404,
                })
        }

        fn target_for(&self, service: &str) -> String {
            service.to_string()
        }
    }

    type MemVerifier = Verifier<Cursor<Vec<u8>>>;

    fn verifier(almanac: &str) -> (MemVerifier, Arc<StubSource>) {
        let catalog = StubCatalog {
            owners: [
                ("core", "team-a"),
                ("admin", "team-a"),
                ("orphan", ""),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        };
        let source = Arc::new(StubSource {
            codeowners: [
                ("core", "* @GhostGroup/team-a\n"),
                ("admin", "* @GhostGroup/team-b\n"),
                ("orphan", "* @GhostGroup/team-c\n"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            calls: AtomicUsize::new(0),
        });
        let store =
            Arc::new(AlmanacStore::new(Cursor::new(almanac.as_bytes().to_vec())).unwrap());
        let verifier = Verifier::new(
            Arc::new(catalog),
            source.clone(),
            store,
            &VerifierConfig::default(),
        );
        (verifier, source)
    }

    #[tokio::test]
    async fn matching_owner_records_full_score() {
        let (verifier, _) = verifier("[]");
        let result = verifier.run_verification("core").await.unwrap();

        assert!(result.works);
        assert_eq!(result.score, 100);
        assert_eq!(verifier.store().run_count("core"), 1);
        assert_eq!(verifier.store().score("core"), 100);
    }

    #[tokio::test]
    async fn mismatched_owner_still_persists_once() {
        let (verifier, _) = verifier(r#"[{"Name":"admin","LastID":4,"Score":100}]"#);
        let result = verifier.run_verification("admin").await.unwrap();

        assert!(!result.works);
        assert_eq!(result.score, 99);
        assert_eq!(verifier.store().run_count("admin"), 5);
        assert_eq!(verifier.store().score("admin"), 99);
    }

    #[tokio::test]
    async fn missing_owner_scores_two_below_start() {
        let (verifier, _) = verifier("[]");
        let result = verifier.run_verification("orphan").await.unwrap();

        assert!(!result.present);
        assert_eq!(result.score, 98);
        assert_eq!(verifier.store().score("orphan"), 98);
    }

    #[tokio::test]
    async fn catalog_failure_aborts_without_scoring_or_persisting() {
        let (verifier, source) = verifier("[]");
        let err = verifier.run_verification("unknown").await.unwrap_err();

        assert!(matches!(err, VerifyError::Catalog { .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(verifier.store().run_count("unknown"), 0);
        assert!(verifier.store().list().is_empty());
    }

    #[tokio::test]
    async fn each_run_starts_from_a_fresh_score() {
        let (verifier, _) = verifier("[]");
        for _ in 0..3 {
            verifier.run_verification("admin").await.unwrap();
        }
        assert_eq!(verifier.store().run_count("admin"), 3);
        assert_eq!(verifier.store().score("admin"), 99);
    }

    #[tokio::test]
    async fn concurrent_runs_for_different_services_both_persist() {
        let (verifier, _) = verifier("[]");
        let verifier = Arc::new(verifier);

        let a = tokio::spawn({
            let v = Arc::clone(&verifier);
            async move { v.run_verification("core").await }
        });
        let b = tokio::spawn({
            let v = Arc::clone(&verifier);
            async move { v.run_verification("admin").await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let names: Vec<_> = verifier
            .store()
            .snapshot()
            .records()
            .iter()
            .map(|r| r.name.clone())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"core".to_string()));
        assert!(names.contains(&"admin".to_string()));
    }
}
