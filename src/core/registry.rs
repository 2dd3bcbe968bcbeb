//! Process-wide table of live calls.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{info, warn};

use crate::core::call::{CallError, CallRecord, CallServices, CallSession};

/// Maps provider call ids to their sessions.
///
/// Registration and removal are atomic per id; cleanup is idempotent.
#[derive(Default)]
pub struct CallRegistry {
    calls: DashMap<String, Arc<CallSession>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register the session for `record`.
    pub fn register(
        &self,
        record: CallRecord,
        services: CallServices,
    ) -> Result<Arc<CallSession>, CallError> {
        let session = match self.calls.entry(record.call_id.clone()) {
            Entry::Occupied(entry) => return Err(CallError::DuplicateCall(entry.key().clone())),
            Entry::Vacant(entry) => {
                let session = CallSession::start(record, services);
                entry.insert(session.clone());
                session
            }
        };
        // The shard lock is released here; `len` visits every shard.
        info!(call_id = %session.call_id(), active_calls = self.calls.len(), "Call registered");
        Ok(session)
    }

    pub fn lookup(&self, call_id: &str) -> Option<Arc<CallSession>> {
        self.calls.get(call_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, call_id: &str) -> bool {
        self.calls.contains_key(call_id)
    }

    /// Remove a call without shutting it down.
    pub fn remove(&self, call_id: &str) -> Option<Arc<CallSession>> {
        self.calls.remove(call_id).map(|(_, session)| session)
    }

    /// Remove and shut down a call. Returns false if it was already gone.
    pub async fn cleanup(&self, call_id: &str) -> bool {
        let Some(session) = self.remove(call_id) else {
            return false;
        };
        session.shutdown().await;
        info!(call_id, active_calls = self.calls.len(), "Call cleaned up");
        true
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Clean up calls older than `max_age`. Returns how many were removed.
    pub async fn sweep_stale(&self, max_age: Duration) -> usize {
        let stale: Vec<String> = self
            .calls
            .iter()
            .filter(|entry| entry.value().age() > max_age)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for call_id in stale {
            warn!(call_id = %call_id, max_age_secs = max_age.as_secs(), "Removing stale call");
            if self.cleanup(&call_id).await {
                removed += 1;
            }
        }
        removed
    }
}

impl std::fmt::Debug for CallRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallRegistry")
            .field("active_calls", &self.calls.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::call::{CallContext, CallPurpose};
    use crate::core::detector::DetectorConfig;
    use crate::core::navigator::NavigatorConfig;
    use crate::core::status::NoopStatusSink;

    fn services() -> CallServices {
        CallServices {
            telephony: None,
            decider: None,
            classifier: None,
            stt_factory: None,
            status_sink: Arc::new(NoopStatusSink),
            navigator: NavigatorConfig::default(),
            detector: DetectorConfig::default(),
        }
    }

    fn record(call_id: &str) -> CallRecord {
        CallRecord::new(call_id, "corr-1", CallContext::new(CallPurpose::General))
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let registry = CallRegistry::new();
        registry.register(record("CA1"), services()).unwrap();

        let err = registry.register(record("CA1"), services()).unwrap_err();
        assert!(matches!(err, CallError::DuplicateCall(id) if id == "CA1"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let registry = CallRegistry::new();
        let session = registry.register(record("CA1"), services()).unwrap();

        assert!(registry.cleanup("CA1").await);
        assert!(!registry.cleanup("CA1").await);
        assert!(session.is_closed());
        assert!(registry.lookup("CA1").is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_old_calls() {
        let registry = CallRegistry::new();
        registry.register(record("old"), services()).unwrap();

        tokio::time::advance(Duration::from_secs(120)).await;
        registry.register(record("new"), services()).unwrap();

        let removed = registry.sweep_stale(Duration::from_secs(60)).await;
        assert_eq!(removed, 1);
        assert!(registry.contains("new"));
        assert!(!registry.contains("old"));
    }
}
