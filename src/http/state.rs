use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::config::Config;
use crate::session::{MeetingNotes, MeetingSignal, StateCell};

/// A running (or finished) session as seen by the control API
pub struct SessionHandle {
    pub call_id: String,
    pub started_at: DateTime<Utc>,
    /// Delivers collaborator signals into the session's processing loop
    pub signal_tx: mpsc::Sender<MeetingSignal>,
    pub state: Arc<StateCell>,
    pub notes: Arc<Mutex<MeetingNotes>>,
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Active sessions (meeting_id → handle)
    pub sessions: Arc<RwLock<HashMap<String, Arc<SessionHandle>>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}
