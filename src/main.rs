//! `CardAssist` - conversational card management and knowledge assistant
//!
//! A small web chat that classifies each message into an intent, then either
//! updates the persistent card ledger or answers from the card guide through
//! retrieval-augmented generation.

mod api;
mod config;
mod dialogue;
mod intent;
mod knowledge;
mod ledger;
mod llm;
mod logging;
mod session;
#[cfg(test)]
mod testing;

use api::{create_router, AppState};
use clap::Parser;
use config::{AppConfig, Cli};
use intent::IntentClassifier;
use knowledge::{MiniLmEmbedder, SearchIndexClient, SearchIndexResponder};
use ledger::{JsonFileStore, Ledger};
use llm::{LlmService, LoggingService, OpenAIService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // A missing .env is fine; the process environment may carry everything
    let _ = dotenvy::dotenv();
    let config = AppConfig::from_env()?;

    logging::init(cli.log_level, &config.log_dir)?;

    // Card ledger
    let store = JsonFileStore::new(config.ledger_path.clone());
    let path = store.path().to_path_buf();
    let ledger = Ledger::load(Box::new(store));
    tracing::info!(
        path = %path.display(),
        cards = ledger.snapshot().card_states.len(),
        "Card ledger loaded"
    );
    let ledger = Arc::new(Mutex::new(ledger));

    // Language model
    let openai = OpenAIService::new(
        config.llm.api_key.clone(),
        config.llm.model,
        &config.llm.base_url,
        config.llm.timeout,
    )?;
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(openai)));
    tracing::info!(model = %llm.model_id(), "LLM client initialized");

    // Knowledge base
    let search = SearchIndexClient::new(&config.search)?;
    let embedder = MiniLmEmbedder::new(config.embedding_cache.clone())?;
    let knowledge = SearchIndexResponder::new(llm.clone(), Arc::new(embedder), Arc::new(search));
    tracing::info!(index = %config.search.index, "Knowledge base connected");

    let dialogue = dialogue::Router::new(IntentClassifier::new(llm), Arc::new(knowledge), ledger);
    let state = AppState::new(dialogue);
    state.spawn_session_sweeper();

    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("CardAssist listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
