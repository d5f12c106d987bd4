//! Per-job record of temporary storage objects.

use tokio::sync::Mutex;
use tracing::{debug, warn};

use reel_storage::ObjectStore;

/// Storage keys written during a job that must not outlive it.
#[derive(Debug, Default)]
pub struct StagingLedger {
    keys: Mutex<Vec<String>>,
}

impl StagingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a key for deletion at the end of the job.
    pub async fn record(&self, key: impl Into<String>) {
        self.keys.lock().await.push(key.into());
    }

    /// Stop tracking `key`; it will survive the end-of-job sweep.
    pub async fn forget(&self, key: &str) {
        self.keys.lock().await.retain(|k| k != key);
    }

    /// Keys recorded so far, in insertion order.
    pub async fn keys(&self) -> Vec<String> {
        self.keys.lock().await.clone()
    }

    /// Delete every recorded key; returns how many deletions succeeded.
    ///
    /// Failures are logged and do not stop the sweep.
    pub async fn cleanup(&self, store: &dyn ObjectStore) -> usize {
        let keys = std::mem::take(&mut *self.keys.lock().await);
        let mut deleted = 0;
        for key in &keys {
            match store.delete(key).await {
                Ok(()) => {
                    debug!(key = %key, "Deleted staged object");
                    deleted += 1;
                }
                Err(e) => warn!(key = %key, error = %e, "Failed to delete staged object"),
            }
        }
        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_preserves_order() {
        let ledger = StagingLedger::new();
        ledger.record("staging/j/1.mp4").await;
        ledger.record("staging/j/0.mp4").await;
        assert_eq!(
            ledger.keys().await,
            vec!["staging/j/1.mp4".to_string(), "staging/j/0.mp4".to_string()]
        );
    }

    #[tokio::test]
    async fn test_forget_drops_only_that_key() {
        let ledger = StagingLedger::new();
        ledger.record("staging/j/0.mp4").await;
        ledger.record("completeHighlights/u/1-j.mp4").await;
        ledger.forget("completeHighlights/u/1-j.mp4").await;
        assert_eq!(ledger.keys().await, vec!["staging/j/0.mp4".to_string()]);
    }
}
