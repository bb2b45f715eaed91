//! Per-conversation session state.
//!
//! The legacy bot kept a single process-global session, so two chats would
//! corrupt each other's identity capture. Sessions are keyed by chat id
//! here; each entry sits behind its own async lock so one chat's commands
//! are serialized while distinct chats proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

/// Where a conversation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing captured yet; waiting for `/start`.
    Idle,
    AwaitingRole,
    AwaitingFullName,
    AwaitingSupervisor,
    /// Identity captured and confirmed.
    Confirmed,
    AwaitingReason,
    AwaitingReworkDecision,
}

/// Mutable conversation state for one chat.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub stage: Stage,
    /// Set once during capture, cleared only by a route-start reset.
    pub full_name: Option<String>,
    /// Canonical roster name; never set before `full_name`.
    pub supervisor: Option<String>,
    pub on_route: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            stage: Stage::Idle,
            full_name: None,
            supervisor: None,
            on_route: false,
        }
    }

    /// Clear captured identity after a successful route start. The next
    /// route start requires a full capture cycle.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Sessions keyed by chat id.
#[derive(Default)]
pub struct SessionMap {
    inner: std::sync::Mutex<HashMap<String, Arc<Mutex<SessionState>>>>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session for a chat, creating a fresh one on first contact.
    pub fn get_or_create(&self, chat_id: &str) -> Arc<Mutex<SessionState>> {
        let mut map = self.inner.lock().expect("session map lock poisoned");
        map.entry(chat_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionState::new())))
            .clone()
    }
}
