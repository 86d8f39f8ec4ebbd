//! Service catalog client: who does the catalog say owns a service?

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::VerifierConfig;
use crate::error::LookupError;
use crate::source::{map_ureq_error, path_segment};

/// Looks up the declared owner of a service.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// The declared owner, or an empty string if the entity has none.
    async fn lookup_owner(&self, service: &str) -> Result<String, LookupError>;
}

/// Backstage catalog client.
///
/// Reads the `component` entity named after the service and takes its
/// owner from the `ownedBy` relation, falling back to `spec.owner`.
pub struct BackstageCatalog {
    base_url: String,
    namespace: String,
    token: Option<String>,
    timeout: std::time::Duration,
}

impl BackstageCatalog {
    /// Build from config, taking an optional token from
    /// `VERIFICAT_CATALOG_TOKEN`.
    pub fn new(config: &VerifierConfig) -> Self {
        let token = std::env::var("VERIFICAT_CATALOG_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        Self::with_token(config, token)
    }

    pub fn with_token(config: &VerifierConfig, token: Option<String>) -> Self {
        Self {
            base_url: config.catalog_url.trim_end_matches('/').to_string(),
            namespace: config.catalog_namespace.clone(),
            token,
            timeout: config.fetch_timeout(),
        }
    }

    pub fn entity_url(&self, service: &str) -> String {
        format!(
            "{}/api/catalog/entities/by-name/component/{}/{}",
            self.base_url,
            path_segment(&self.namespace),
            path_segment(service)
        )
    }
}

#[async_trait]
impl CatalogLookup for BackstageCatalog {
    async fn lookup_owner(&self, service: &str) -> Result<String, LookupError> {
        let url = self.entity_url(service);
        let token = self.token.clone();
        let timeout = self.timeout;
        let name = service.to_string();

        let entity = tokio::task::spawn_blocking(move || {
            let config = ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .build();
            let agent = ureq::Agent::new_with_config(config);

            let mut request = agent.get(&url).header("Accept", "application/json");
            if let Some(ref token) = token {
                request = request.header("Authorization", &format!("Bearer {}", token));
            }

            let response = request.call().map_err(|e| match e {
                ureq::Error::StatusCode(404) => LookupError::NotFound { service: name },
                other => map_ureq_error(&url, timeout, other),
            })?;

            response
                .into_body()
                .read_json::<Entity>()
                .map_err(|e| LookupError::Decode {
                    target: url.clone(),
                    message: e.to_string(),
                })
        })
        .await
        .map_err(|e| LookupError::Task {
            target: self.entity_url(service),
            message: e.to_string(),
        })??;

        let owner = entity.declared_owner();
        tracing::info!(service, owner = %owner, "catalog component read");
        Ok(owner)
    }
}

/// The subset of a catalog entity needed to find its owner.
#[derive(Debug, Default, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub relations: Vec<Relation>,
    #[serde(default)]
    pub spec: EntitySpec,
}

#[derive(Debug, Deserialize)]
pub struct Relation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "targetRef", default)]
    pub target_ref: Option<String>,
    #[serde(default)]
    pub target: Option<RelationTarget>,
}

#[derive(Debug, Deserialize)]
pub struct RelationTarget {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EntitySpec {
    #[serde(default)]
    pub owner: Option<String>,
}

impl Entity {
    /// Owner name from the last `ownedBy` relation, else `spec.owner`.
    pub fn declared_owner(&self) -> String {
        let from_relation = self
            .relations
            .iter()
            .rev()
            .filter(|r| r.kind == "ownedBy")
            .find_map(|r| {
                r.target
                    .as_ref()
                    .map(|t| t.name.clone())
                    .or_else(|| r.target_ref.as_deref().map(entity_ref_name))
            });

        from_relation
            .or_else(|| self.spec.owner.as_deref().map(entity_ref_name))
            .unwrap_or_default()
    }
}

/// `group:default/team-a` → `team-a`.
fn entity_ref_name(reference: &str) -> String {
    let without_kind = reference.split_once(':').map_or(reference, |(_, rest)| rest);
    let name = without_kind
        .rsplit_once('/')
        .map_or(without_kind, |(_, name)| name);
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(json: serde_json::Value) -> Entity {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn owner_from_owned_by_relation() {
        let e = entity(serde_json::json!({
            "relations": [
                {"type": "partOf", "targetRef": "system:default/core", "target": {"name": "core"}},
                {"type": "ownedBy", "targetRef": "group:default/team-a", "target": {"name": "team-a"}},
            ],
            "spec": {"owner": "group:default/someone-else"}
        }));
        assert_eq!(e.declared_owner(), "team-a");
    }

    #[test]
    fn last_owned_by_relation_wins() {
        let e = entity(serde_json::json!({
            "relations": [
                {"type": "ownedBy", "target": {"name": "first"}},
                {"type": "ownedBy", "target": {"name": "second"}},
            ]
        }));
        assert_eq!(e.declared_owner(), "second");
    }

    #[test]
    fn owner_from_target_ref_when_target_missing() {
        let e = entity(serde_json::json!({
            "relations": [{"type": "ownedBy", "targetRef": "group:default/team-b"}]
        }));
        assert_eq!(e.declared_owner(), "team-b");
    }

    #[test]
    fn owner_falls_back_to_spec() {
        let e = entity(serde_json::json!({"spec": {"owner": "team-c"}}));
        assert_eq!(e.declared_owner(), "team-c");
    }

    #[test]
    fn no_owner_is_empty() {
        let e = entity(serde_json::json!({"metadata": {"name": "admin"}}));
        assert_eq!(e.declared_owner(), "");
    }

    #[test]
    fn entity_ref_name_forms() {
        assert_eq!(entity_ref_name("group:default/team-a"), "team-a");
        assert_eq!(entity_ref_name("default/team-a"), "team-a");
        assert_eq!(entity_ref_name("team-a"), "team-a");
    }

    #[test]
    fn entity_url_layout() {
        let config = VerifierConfig {
            catalog_url: "https://backstage.example.com/".to_string(),
            ..VerifierConfig::default()
        };
        let catalog = BackstageCatalog::with_token(&config, None);
        assert_eq!(
            catalog.entity_url("admin"),
            "https://backstage.example.com/api/catalog/entities/by-name/component/default/admin"
        );
    }

    #[test]
    fn entity_url_encodes_service_segment() {
        let catalog = BackstageCatalog::with_token(&VerifierConfig::default(), None);
        assert_eq!(
            catalog.entity_url("core?x"),
            "http://localhost:7007/api/catalog/entities/by-name/component/default/core%3Fx"
        );
        assert_eq!(
            catalog.entity_url("a/b c"),
            "http://localhost:7007/api/catalog/entities/by-name/component/default/a%2Fb%20c"
        );
    }
}
