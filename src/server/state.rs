use std::sync::Arc;
use std::time::Instant;

use crate::session::SessionManager;
use crate::store::MessageStore;
use crate::streams::StreamRegistry;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MessageStore>,
    pub session: Arc<SessionManager>,
    pub registry: Arc<StreamRegistry>,
    pub start_time: Instant,
}

impl AppState {
    /// State around an existing session; the session must write into `store`
    pub fn new(store: Arc<MessageStore>, session: Arc<SessionManager>) -> Self {
        Self {
            store,
            session,
            registry: Arc::new(StreamRegistry::new()),
            start_time: Instant::now(),
        }
    }
}
