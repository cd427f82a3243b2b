//! HTTP request handlers

use super::page::{render_not_found, render_session};
use super::types::ChatForm;
use super::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Fresh session per visit to the root
        .route("/", get(new_session))
        .route("/s/:id", get(show_session))
        .route("/s/:id/chat", post(send_chat))
        .route("/version", get(get_version))
        .with_state(state)
}

fn session_url(id: &str) -> String {
    format!("/s/{id}")
}

async fn new_session(State(state): State<AppState>) -> Redirect {
    let id = state.sessions.create().await;
    Redirect::to(&session_url(&id))
}

async fn show_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let handle = state.sessions.get(&id).await.ok_or(AppError::NotFound)?;
    let session = handle.lock().await;
    let html = render_session(&id, &session);

    // An ended conversation is shown once with its banner, then released
    if session.ended {
        drop(session);
        state.sessions.remove(&id).await;
    }
    Ok(Html(html))
}

/// Run one turn, then redirect back to the page (post/redirect/get)
async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<ChatForm>,
) -> Result<Redirect, AppError> {
    let session = state.sessions.get(&id).await.ok_or(AppError::NotFound)?;

    let message = form.message.trim();
    if message.is_empty() {
        tracing::debug!(session = %id, "Ignoring empty message");
        return Ok(Redirect::to(&session_url(&id)));
    }

    // Held for the whole turn so a session's turns never interleave
    let mut session = session.lock().await;
    let reply = state.dialogue.handle_turn(&mut session, message).await;
    tracing::debug!(session = %id, intent = ?reply.intent, "Reply ready");

    Ok(Redirect::to(&session_url(&id)))
}

async fn get_version() -> &'static str {
    concat!("cardassist ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, Html(render_not_found())).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::page::ENDED_BANNER;
    use crate::dialogue::{Router as DialogueRouter, SESSION_ENDED};
    use crate::intent::IntentClassifier;
    use crate::ledger::{CardStatus, Ledger, StatusLookup};
    use crate::llm::LlmResponse;
    use crate::session::SessionRegistry;
    use crate::testing::{MemoryStore, MockKnowledge, MockLlmService};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    struct TestApp {
        state: AppState,
        llm: Arc<MockLlmService>,
    }

    impl TestApp {
        fn new() -> Self {
            Self::with_sessions(SessionRegistry::new())
        }

        fn with_sessions(sessions: SessionRegistry) -> Self {
            let llm = Arc::new(MockLlmService::new());
            let ledger = Ledger::load(Box::new(MemoryStore::default()));
            let dialogue = DialogueRouter::new(
                IntentClassifier::new(llm.clone()),
                Arc::new(MockKnowledge::new()),
                Arc::new(Mutex::new(ledger)),
            );
            Self {
                state: AppState::with_sessions(dialogue, sessions),
                llm,
            }
        }

        async fn send(&self, request: Request<Body>) -> Response {
            create_router(self.state.clone())
                .oneshot(request)
                .await
                .unwrap()
        }

        async fn get(&self, uri: &str) -> Response {
            self.send(Request::get(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn post_message(&self, uri: &str, message: &str) -> Response {
            let body = format!("message={}", message.replace(' ', "+"));
            self.send(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
        }

        async fn start_session(&self) -> String {
            let response = self.get("/").await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            location(&response)
        }
    }

    fn location(response: &Response) -> String {
        response.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .to_string()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_root_creates_distinct_sessions() {
        let app = TestApp::new();
        let first = app.start_session().await;
        let second = app.start_session().await;
        assert!(first.starts_with("/s/"));
        assert_ne!(first, second);

        let response = app.get(&first).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Welcome to CardAssist!"));
    }

    #[tokio::test]
    async fn test_chat_runs_turn_and_redirects() {
        let app = TestApp::new();
        let page = app.start_session().await;

        app.llm.queue_response(LlmResponse::from_text("activate"));
        let response = app
            .post_message(&format!("{page}/chat"), "Activate card 123456789")
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), page);

        let html = body_text(app.get(&page).await).await;
        assert!(html.contains("Activate card 123456789"));
        assert!(html.contains("✅ Card 123456789 has been activated."));

        let status = app
            .state
            .dialogue
            .ledger()
            .lock()
            .await
            .status_of("123456789")
            .unwrap();
        assert_eq!(status, StatusLookup::Known(CardStatus::Active));
    }

    #[tokio::test]
    async fn test_blank_message_is_ignored() {
        let app = TestApp::new();
        let page = app.start_session().await;

        let response = app.post_message(&format!("{page}/chat"), "   ").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(app.llm.recorded_requests().is_empty());
        assert!(!body_text(app.get(&page).await).await.contains("class=\"turn\""));
    }

    #[tokio::test]
    async fn test_end_shows_banner() {
        let app = TestApp::new();
        let page = app.start_session().await;

        app.llm.queue_response(LlmResponse::from_text("end"));
        app.post_message(&format!("{page}/chat"), "thanks").await;

        let html = body_text(app.get(&page).await).await;
        assert!(html.contains(SESSION_ENDED));
        assert!(html.contains(ENDED_BANNER));

        assert_eq!(app.state.sessions.len().await, 0);
        assert_eq!(app.get(&page).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_anonymous_visits_stay_bounded() {
        let app = TestApp::with_sessions(SessionRegistry::with_limits(Duration::from_secs(3600), 10));
        for _ in 0..200 {
            app.start_session().await;
        }
        assert_eq!(app.state.sessions.len().await, 10);

        let latest = app.start_session().await;
        assert_eq!(app.get(&latest).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = TestApp::new();
        assert_eq!(app.get("/s/missing").await.status(), StatusCode::NOT_FOUND);
        let response = app.post_message("/s/missing/chat", "hello").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(app.llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_version() {
        let app = TestApp::new();
        let text = body_text(app.get("/version").await).await;
        assert!(text.starts_with("cardassist "));
    }
}
