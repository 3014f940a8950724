use std::collections::HashMap;

use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Per-session state.
///
/// `pending_phone`/`pending_code` hold the verification window between
/// the login step and the verify step; `user_id` is set once a code has
/// been confirmed.
#[derive(Clone, Debug, Default)]
pub struct SessionData {
    pub user_id: Option<Uuid>,
    pub pending_phone: Option<String>,
    pub pending_code: Option<String>,
    pub code_issued_at: Option<OffsetDateTime>,
}

impl SessionData {
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// In-memory session store keyed by the id carried in the signed cookie.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionData>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty session and return its id.
    pub async fn create(&self) -> Uuid {
        let sid = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        sessions.insert(sid, SessionData::default());
        sid
    }

    pub async fn get(&self, sid: Uuid) -> Option<SessionData> {
        let sessions = self.sessions.read().await;
        sessions.get(&sid).cloned()
    }

    /// Record a pending verification for this session, replacing any
    /// earlier one.
    pub async fn set_pending(&self, sid: Uuid, phone: &str, code: &str, issued_at: OffsetDateTime) {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(sid).or_default();
        session.pending_phone = Some(phone.to_string());
        session.pending_code = Some(code.to_string());
        session.code_issued_at = Some(issued_at);
    }

    /// Bind a verified user to the session. The pending code is cleared
    /// so it cannot be submitted a second time.
    pub async fn authenticate(&self, sid: Uuid, user_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(sid).or_default();
        session.user_id = Some(user_id);
        session.pending_phone = None;
        session.pending_code = None;
        session.code_issued_at = None;
    }

    /// Delete the session (logout).
    pub async fn remove(&self, sid: Uuid) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&sid);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
