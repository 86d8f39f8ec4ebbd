//! Readiness verification for service ownership.
//!
//! A run asks the service catalog who owns a service, fetches the
//! CODEOWNERS file from the service's repository, compares the two and
//! folds the resulting score into the almanac:
//!
//! - [`CatalogLookup`] — declared owner from the catalog ([`BackstageCatalog`])
//! - [`OwnershipSource`] — raw ownership text ([`GitHubOwnershipSource`])
//! - [`fetch_many`] — concurrent, order-preserving retrieval of N targets
//! - [`ReadinessScorer`] — owner comparison and score deductions
//! - [`Verifier`] — one end-to-end run per service

pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod scorer;
pub mod source;
pub mod verifier;

pub use catalog::{BackstageCatalog, CatalogLookup};
pub use config::{ConfigError, ScoringPolicy, VerifierConfig};
pub use error::{LookupError, VerifyError};
pub use fetch::{fetch_many, BatchError};
pub use scorer::{evaluate_owner, OwnerFormat, ReadinessScorer, VerificationResult};
pub use source::{GitHubOwnershipSource, OwnershipSource};
pub use verifier::Verifier;
