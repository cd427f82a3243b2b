//! Intent classification
//!
//! Maps a user utterance, read in the context of the last few transcript
//! entries, onto the closed set of intents the dialogue controller handles.

use crate::llm::{LlmError, LlmRequest, LlmService};
use crate::session::TranscriptEntry;
use std::fmt;
use std::sync::Arc;

/// Number of transcript entries given to the classifier as context
pub const CONTEXT_WINDOW: usize = 4;

const CLASSIFIER_PROMPT: &str = r#"You are an intent classifier for a card management chatbot. Classify the user's intent into one of these:
- activate
- deactivate
- query_activated
- query_deactivated
- query_status
- query_all_status
- knowledge
- end
- reset_cards

Consider the conversation context to determine if the user is responding to a prompt (e.g., providing a card number after being asked).
- Use 'query_status' for questions about a specific card's status (e.g., "What is the status of card 123456789?").
- Use 'query_all_status' for questions about all activated and deactivated cards.
- Use 'reset_cards' for requests to reset all card states (e.g., "Reset all cards").
Return only the intent word."#;

/// What the user wants from this turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Activate,
    Deactivate,
    QueryActivated,
    QueryDeactivated,
    QueryStatus,
    QueryAllStatus,
    Knowledge,
    End,
    ResetCards,
    /// The classifier answered with something outside the label set
    Unclear,
}

impl Intent {
    /// Every label the classifier is allowed to return
    pub const LABELED: [Intent; 9] = [
        Intent::Activate,
        Intent::Deactivate,
        Intent::QueryActivated,
        Intent::QueryDeactivated,
        Intent::QueryStatus,
        Intent::QueryAllStatus,
        Intent::Knowledge,
        Intent::End,
        Intent::ResetCards,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Intent::Activate => "activate",
            Intent::Deactivate => "deactivate",
            Intent::QueryActivated => "query_activated",
            Intent::QueryDeactivated => "query_deactivated",
            Intent::QueryStatus => "query_status",
            Intent::QueryAllStatus => "query_all_status",
            Intent::Knowledge => "knowledge",
            Intent::End => "end",
            Intent::ResetCards => "reset_cards",
            Intent::Unclear => "unclear",
        }
    }

    /// Interpret raw classifier output. Whitespace and case are ignored;
    /// anything outside the label set is `Unclear`.
    pub fn from_label(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        Self::LABELED
            .into_iter()
            .find(|intent| intent.label() == normalized)
            .unwrap_or(Intent::Unclear)
    }

    /// Intents that wait for a card number when none was given
    pub fn awaits_card_number(self) -> bool {
        matches!(self, Intent::Activate | Intent::Deactivate)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Render the most recent transcript entries as `role: text` lines
pub fn render_context(history: &[TranscriptEntry]) -> String {
    let start = history.len().saturating_sub(CONTEXT_WINDOW);
    history
        .iter()
        .skip(start)
        .map(|entry| format!("{}: {}\n", entry.speaker.as_str(), entry.text))
        .collect()
}

/// LLM-backed intent classifier
#[derive(Clone)]
pub struct IntentClassifier {
    llm: Arc<dyn LlmService>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }

    /// Classify `utterance` given the conversation so far.
    ///
    /// Only the last [`CONTEXT_WINDOW`] entries of `history` are sent.
    /// Transport and provider errors are returned as-is.
    pub async fn classify(
        &self,
        utterance: &str,
        history: &[TranscriptEntry],
    ) -> Result<Intent, LlmError> {
        tracing::debug!(input = utterance, "Classifying intent");
        let context = render_context(history);
        let request = LlmRequest::prompt(
            Some(CLASSIFIER_PROMPT),
            format!("Context:\n{context}\nCurrent input: {utterance}"),
        );

        let response = self.llm.complete(&request).await?;
        let intent = Intent::from_label(&response.text);
        if intent == Intent::Unclear {
            tracing::warn!(label = %response.text.trim(), "Classifier returned an unknown label");
        } else {
            tracing::info!(intent = %intent, "Classified intent");
        }
        Ok(intent)
    }
}
