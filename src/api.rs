//! HTTP front end
//!
//! One HTML page per session; each submitted message runs one dialogue turn
//! and redirects back to the page.

mod handlers;
mod page;
mod types;

pub use handlers::create_router;

use crate::dialogue::Router as DialogueRouter;
use crate::session::SessionRegistry;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dialogue: Arc<DialogueRouter>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(dialogue: DialogueRouter) -> Self {
        Self::with_sessions(dialogue, SessionRegistry::new())
    }

    pub fn with_sessions(dialogue: DialogueRouter, sessions: SessionRegistry) -> Self {
        Self {
            dialogue: Arc::new(dialogue),
            sessions: Arc::new(sessions),
        }
    }

    /// Periodically drop idle sessions for the life of the process
    pub fn spawn_session_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(sessions.idle_ttl());
            loop {
                tick.tick().await;
                sessions.sweep().await;
            }
        })
    }
}
