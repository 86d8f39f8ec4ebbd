//! Concurrent retrieval of several ownership documents.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::LookupError;
use crate::source::OwnershipSource;

/// A batch in which at least one target failed.
///
/// `results` still holds every slot that completed successfully.
#[derive(Debug, thiserror::Error)]
#[error("fetch of target {index} failed: {error}")]
pub struct BatchError {
    pub results: Vec<String>,
    /// Lowest index that failed.
    pub index: usize,
    #[source]
    pub error: LookupError,
}

/// Fetch every target concurrently, one task per target.
///
/// `results[i]` always corresponds to `targets[i]`, whatever order the
/// tasks finish in; slots for failed or absent indices are empty. Each task
/// is bounded by its own `timeout`. All tasks are awaited even after one
/// fails, and the failure with the lowest index is reported.
pub async fn fetch_many(
    source: Arc<dyn OwnershipSource>,
    targets: &BTreeMap<usize, String>,
    timeout: Duration,
) -> Result<Vec<String>, BatchError> {
    let slots = targets.keys().next_back().map_or(0, |max| max + 1);
    let mut results = vec![String::new(); slots];

    let handles: Vec<_> = targets
        .iter()
        .map(|(&index, target)| {
            let source = Arc::clone(&source);
            let target = target.clone();
            let handle = tokio::spawn(async move {
                let fetched = tokio::time::timeout(timeout, source.fetch(&target)).await;
                fetched.unwrap_or_else(|_| {
                    Err(LookupError::Timeout {
                        target,
                        after: timeout,
                    })
                })
            });
            (index, handle)
        })
        .collect();

    let mut first_error: Option<(usize, LookupError)> = None;
    for (index, handle) in handles {
        let outcome = handle.await.unwrap_or_else(|e| {
            Err(LookupError::Task {
                target: targets[&index].clone(),
                message: e.to_string(),
            })
        });
        match outcome {
            Ok(body) => results[index] = body,
            Err(error) => {
                tracing::error!(index, error = %error, "cannot fetch");
                if first_error.is_none() {
                    first_error = Some((index, error));
                }
            }
        }
    }

    match first_error {
        None => Ok(results),
        Some((index, error)) => Err(BatchError {
            results,
            index,
            error,
        }),
    }
}
