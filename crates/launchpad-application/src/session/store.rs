use launchpad_core::{LaunchpadError, ReleaseSession, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;

/// One live session together with its background work.
///
/// Every mutation of the session goes through [`SessionSlot::lock`], which
/// serializes operations per session. The lock is never held across a
/// collaborator call.
#[derive(Debug)]
pub struct SessionSlot {
    session: Mutex<ReleaseSession>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionSlot {
    fn new(session: ReleaseSession) -> Self {
        Self {
            session: Mutex::new(session),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Exclusive access to the session.
    pub async fn lock(&self) -> MutexGuard<'_, ReleaseSession> {
        self.session.lock().await
    }

    /// Returns a copy of the current session state.
    pub async fn snapshot(&self) -> ReleaseSession {
        self.session.lock().await.clone()
    }

    /// Tracks a background task working on this session.
    pub async fn track(&self, handle: JoinHandle<()>) {
        let mut workers = self.workers.lock().await;
        workers.retain(|worker| !worker.is_finished());
        workers.push(handle);
    }

    /// Waits until every tracked background task has finished.
    ///
    /// Tasks spawned while waiting are awaited as well.
    pub async fn settle(&self) {
        loop {
            let pending: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock().await);
            if pending.is_empty() {
                return;
            }
            for handle in pending {
                if let Err(e) = handle.await {
                    tracing::error!("Session worker terminated abnormally: {}", e);
                }
            }
        }
    }
}

/// In-memory registry of live sessions.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionSlot>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session and returns its slot.
    pub async fn insert(&self, session: ReleaseSession) -> Arc<SessionSlot> {
        let id = session.id.clone();
        let slot = Arc::new(SessionSlot::new(session));
        self.sessions.write().await.insert(id, Arc::clone(&slot));
        slot
    }

    /// Gets a session slot by ID.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if no session has this ID.
    pub async fn get(&self, session_id: &str) -> Result<Arc<SessionSlot>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| LaunchpadError::session_not_found(session_id))
    }

    /// Removes a session slot by ID.
    pub async fn remove(&self, session_id: &str) -> Result<Arc<SessionSlot>> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| LaunchpadError::session_not_found(session_id))
    }

    /// All live session slots, in no particular order.
    pub async fn slots(&self) -> Vec<Arc<SessionSlot>> {
        self.sessions.read().await.values().cloned().collect()
    }
}
