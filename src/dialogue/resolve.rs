//! Intent resolution ahead of classification
//!
//! A bare card number right after an activate/deactivate turn answers the
//! "which card?" prompt, so the previous intent is reused without asking the
//! classifier.

use crate::intent::Intent;
use crate::ledger::CardId;
use regex::Regex;
use std::sync::LazyLock;

static CARD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]{9}\b").expect("card token pattern is valid"));

/// How the intent for a turn is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Reuse the previous turn's intent
    FollowUp(Intent),
    /// Ask the classifier
    Classify,
}

pub fn resolve(utterance: &str, last_intent: Option<Intent>) -> Resolution {
    match last_intent {
        Some(intent) if intent.awaits_card_number() && CardId::parse(utterance).is_ok() => {
            Resolution::FollowUp(intent)
        }
        _ => Resolution::Classify,
    }
}

/// First standalone 9-digit token in `utterance`
pub fn extract_card_number(utterance: &str) -> Option<&str> {
    CARD_TOKEN.find(utterance).map(|m| m.as_str())
}
