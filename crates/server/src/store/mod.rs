//! Session storage
//!
//! Sessions live in memory for the life of the process. Each session keeps
//! two locks: the conversation lock is held for a whole turn so turns on
//! one id are serialised, while the transcript lock is only taken to push
//! or copy entries and never waits on a completion call.

mod memory;

pub use memory::InMemorySessionStore;

use std::sync::Arc;

use async_trait::async_trait;
use simpatient_core::{LogEntry, Session, SessionId};
use tokio::sync::Mutex;

/// Stored state for one session: the conversation plus its HTTP-visible log
#[derive(Debug)]
pub struct SessionEntry {
    pub session: Mutex<Session>,
    log: Mutex<Vec<LogEntry>>,
}

impl SessionEntry {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Append one transcript entry
    pub async fn push_log(&self, entry: LogEntry) {
        self.log.lock().await.push(entry);
    }

    /// Copy of the transcript so far, in insertion order
    pub async fn log(&self) -> Vec<LogEntry> {
        self.log.lock().await.clone()
    }
}

/// Shared handle to a stored session
pub type SessionHandle = Arc<SessionEntry>;

/// Storage seam for sessions, injected into the simulator and routes
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session under a freshly generated id
    async fn create(&self) -> SessionId;

    /// Fetch a session, creating it if the id is unknown
    async fn get_or_create(&self, id: &str) -> SessionHandle;

    /// Fetch a session without creating it
    async fn get(&self, id: &str) -> Option<SessionHandle>;

    /// Number of sessions currently held
    async fn len(&self) -> usize;
}
