use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use simpatient_core::{PatientProfile, Session, SessionId};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SessionEntry, SessionHandle, SessionStore};

/// Process-wide session map; sessions are never persisted or evicted
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    profile: PatientProfile,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::with_profile(PatientProfile::demo())
    }

    /// Store whose new sessions all play `profile`
    pub fn with_profile(profile: PatientProfile) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            profile,
        }
    }

    fn new_entry(&self, id: &str) -> SessionHandle {
        tracing::info!(session_id = %id, "Created session");
        metrics::counter!("sessions_created_total").increment(1);
        Arc::new(SessionEntry::new(Session::new(id, self.profile.clone())))
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self) -> SessionId {
        let mut sessions = self.sessions.write().await;
        let id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        let entry = self.new_entry(&id);
        sessions.insert(id.clone(), entry);
        id
    }

    async fn get_or_create(&self, id: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(id) {
            return handle.clone();
        }

        let mut sessions = self.sessions.write().await;
        // Another request may have created it between the two locks
        if let Some(handle) = sessions.get(id) {
            return handle.clone();
        }
        let handle = self.new_entry(id);
        sessions.insert(id.to_string(), handle.clone());
        handle
    }

    async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simpatient_core::LogEntry;

    #[tokio::test]
    async fn create_returns_distinct_ids() {
        let store = InMemorySessionStore::new();
        let a = store.create().await;
        let b = store.create().await;

        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn get_or_create_is_lazy_and_stable() {
        let store = InMemorySessionStore::new();
        assert!(store.get("unknown").await.is_none());

        let first = store.get_or_create("unknown").await;
        let second = store.get_or_create("unknown").await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len().await, 1);
        assert_eq!(first.session.lock().await.id, "unknown");
    }

    #[tokio::test]
    async fn new_sessions_use_the_demo_profile() {
        let store = InMemorySessionStore::new();
        let id = store.create().await;
        let handle = store.get(&id).await.unwrap();
        let session = handle.session.lock().await;

        assert_eq!(session.profile(), &PatientProfile::demo());
        assert!(session.history().is_empty());
        assert!(handle.log().await.is_empty());
    }

    #[tokio::test]
    async fn log_is_readable_while_a_turn_holds_the_session() {
        let store = InMemorySessionStore::new();
        let handle = store.get_or_create("busy").await;
        let _turn = handle.session.lock().await;

        handle.push_log(LogEntry::user("Hello")).await;
        let log = tokio::time::timeout(std::time::Duration::from_millis(100), handle.log())
            .await
            .expect("log read waited on the turn lock");

        assert_eq!(log.len(), 1);
        assert_eq!(log[0].text, "Hello");
    }
}
