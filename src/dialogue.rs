//! Dialogue controller
//!
//! Runs one user turn: resolve the intent (follow-up or classifier),
//! dispatch it against the ledger or the knowledge responder, then record the
//! exchange in the session transcript.

mod reply;
mod resolve;

pub use reply::{SERVICE_FAILURE, SESSION_ENDED, UNCLEAR};
pub use resolve::{extract_card_number, resolve, Resolution};

use crate::intent::{Intent, IntentClassifier};
use crate::knowledge::{KnowledgeError, KnowledgeResponder};
use crate::ledger::{CardAction, Ledger};
use crate::llm::LlmError;
use crate::session::SessionContext;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Failures of external collaborators that abort a turn
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("intent classification failed: {0}")]
    Classify(#[from] LlmError),
    #[error("knowledge lookup failed: {0}")]
    Knowledge(#[from] KnowledgeError),
}

/// Outcome of one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    /// Intent the turn resolved to; `None` when classification failed
    pub intent: Option<Intent>,
    pub text: String,
}

/// Routes utterances to the ledger or the knowledge responder
#[derive(Clone)]
pub struct Router {
    classifier: IntentClassifier,
    knowledge: Arc<dyn KnowledgeResponder>,
    ledger: Arc<Mutex<Ledger>>,
}

impl Router {
    pub fn new(
        classifier: IntentClassifier,
        knowledge: Arc<dyn KnowledgeResponder>,
        ledger: Arc<Mutex<Ledger>>,
    ) -> Self {
        Self {
            classifier,
            knowledge,
            ledger,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn ledger(&self) -> &Arc<Mutex<Ledger>> {
        &self.ledger
    }

    /// Process one utterance to completion.
    ///
    /// Always yields a non-empty reply. Collaborator failures are logged and
    /// replaced by a generic notice; the ledger is only touched after the
    /// intent is known.
    pub async fn handle_turn(&self, session: &mut SessionContext, utterance: &str) -> TurnReply {
        tracing::info!(input = utterance, "Received user input");

        let (intent, result) = match self.resolve_intent(session, utterance).await {
            Ok(intent) => {
                session.last_intent = Some(intent);
                (Some(intent), self.dispatch(session, intent, utterance).await)
            }
            Err(e) => (None, Err(e)),
        };

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, input = utterance, "Turn failed");
                SERVICE_FAILURE.to_string()
            }
        };

        session.record_turn(utterance, text.clone());
        TurnReply { intent, text }
    }

    async fn resolve_intent(
        &self,
        session: &SessionContext,
        utterance: &str,
    ) -> Result<Intent, TurnError> {
        match resolve(utterance, session.last_intent) {
            Resolution::FollowUp(intent) => {
                tracing::debug!(intent = %intent, "Using previous intent for card number input");
                Ok(intent)
            }
            Resolution::Classify => Ok(self
                .classifier
                .classify(utterance, session.transcript())
                .await?),
        }
    }

    async fn dispatch(
        &self,
        session: &mut SessionContext,
        intent: Intent,
        utterance: &str,
    ) -> Result<String, TurnError> {
        let text = match intent {
            Intent::End => {
                session.ended = true;
                session.last_intent = None;
                if let Err(e) = self.ledger.lock().await.flush() {
                    tracing::error!(error = %e, "Failed to save card ledger at session end");
                }
                tracing::info!("Conversation ended by user");
                SESSION_ENDED.to_string()
            }
            Intent::QueryActivated => self.cards_with_action(CardAction::Activated).await,
            Intent::QueryDeactivated => self.cards_with_action(CardAction::Deactivated).await,
            Intent::QueryStatus => match extract_card_number(utterance) {
                Some(card) => {
                    let lookup = self.ledger.lock().await.status_of(card);
                    reply::card_status(card, lookup)
                }
                None => {
                    tracing::warn!("No card number for status query");
                    reply::ASK_STATUS_CARD_NUMBER.to_string()
                }
            },
            Intent::QueryAllStatus => {
                let partition = self.ledger.lock().await.all_statuses();
                reply::all_statuses(&partition)
            }
            Intent::Activate => self.change_card(CardAction::Activated, utterance).await,
            Intent::Deactivate => self.change_card(CardAction::Deactivated, utterance).await,
            Intent::Knowledge => {
                let answer = self.knowledge.answer(utterance).await?;
                if answer.trim().is_empty() {
                    reply::KNOWLEDGE_EMPTY.to_string()
                } else {
                    answer
                }
            }
            Intent::ResetCards => {
                let result = self.ledger.lock().await.reset();
                reply::reset(result)
            }
            Intent::Unclear => {
                tracing::warn!(input = utterance, "Unclear user query");
                UNCLEAR.to_string()
            }
        };

        tracing::info!(intent = %intent, reply = %text, "Turn handled");
        Ok(text)
    }

    async fn cards_with_action(&self, action: CardAction) -> String {
        let cards = self.ledger.lock().await.actions_of(action);
        reply::cards_with_action(action, &cards)
    }

    async fn change_card(&self, action: CardAction, utterance: &str) -> String {
        let verb = match action {
            CardAction::Activated => "activate",
            CardAction::Deactivated => "deactivate",
        };
        let Some(card) = extract_card_number(utterance) else {
            tracing::warn!(action = verb, "No valid card number provided");
            return reply::ask_for_card_number(verb);
        };

        let mut ledger = self.ledger.lock().await;
        let result = match action {
            CardAction::Activated => ledger.activate(card),
            CardAction::Deactivated => ledger.deactivate(card),
        };
        reply::card_change(card, action, result)
    }
}
