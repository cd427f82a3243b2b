//! User-facing reply text

use crate::ledger::{CardAction, CardId, Change, LedgerError, Reset, StatusLookup, StatusPartition};

pub const SESSION_ENDED: &str = "✅ Session ended. You can start a new conversation!";
pub const UNCLEAR: &str = "❓ Your question is unclear. Please provide a valid query.";
pub const INVALID_CARD: &str = "❌ Invalid card number. Must be 9 digits.";
pub const SERVICE_FAILURE: &str =
    "⚠️ Sorry, something went wrong while handling your request. Please try again.";
pub const ASK_STATUS_CARD_NUMBER: &str =
    "❓ Please provide a valid 9-digit card number to check its status.";
pub const KNOWLEDGE_EMPTY: &str = "ℹ️ I couldn't find an answer to that in the card guide.";

pub fn ask_for_card_number(action: &str) -> String {
    format!("❓ Please provide a valid 9-digit card number to {action} the card.")
}

pub fn card_change(card: &str, action: CardAction, result: Result<Change, LedgerError>) -> String {
    match (result, action) {
        (Err(LedgerError::InvalidId(_)), _) => INVALID_CARD.to_string(),
        (Ok(Change::Applied), CardAction::Activated) => {
            format!("✅ Card {card} has been activated.")
        }
        (Ok(Change::Applied), CardAction::Deactivated) => {
            format!("🔒 Card {card} has been deactivated.")
        }
        (Ok(Change::AlreadyInState), action) => {
            format!("⚠️ Card {card} is already {}.", action.as_str())
        }
    }
}

pub fn card_status(card: &str, lookup: Result<StatusLookup, LedgerError>) -> String {
    match lookup {
        Err(LedgerError::InvalidId(_)) => INVALID_CARD.to_string(),
        Ok(StatusLookup::Unknown) => format!("ℹ️ Card {card} has no recorded actions."),
        Ok(StatusLookup::Known(status)) => {
            format!("ℹ️ Card {card} is currently {}.", status.as_str())
        }
    }
}

/// Cards that went through `action`, one line per logged action
pub fn cards_with_action(action: CardAction, cards: &[CardId]) -> String {
    if cards.is_empty() {
        return format!("ℹ️ No cards have been {} in this session.", action.as_str());
    }
    format!("ℹ️ Cards {}:\n{}", action.as_str(), card_lines(action, cards))
}

pub fn all_statuses(partition: &StatusPartition) -> String {
    if partition.activated.is_empty() && partition.deactivated.is_empty() {
        return "ℹ️ No cards have been activated or deactivated.".to_string();
    }
    format!(
        "{}\n\n{}",
        partition_section(CardAction::Activated, &partition.activated),
        partition_section(CardAction::Deactivated, &partition.deactivated)
    )
}

fn partition_section(action: CardAction, cards: &[CardId]) -> String {
    let verb = action.as_str();
    if cards.is_empty() {
        return format!("ℹ️ No cards have been {verb}.");
    }
    format!("ℹ️ Cards {verb}:\n{}", card_lines(action, cards))
}

fn card_lines(action: CardAction, cards: &[CardId]) -> String {
    cards
        .iter()
        .map(|card| format!("- Card {card} was {}.", action.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn reset(result: Reset) -> String {
    match result {
        Reset::Cleared => "✅ All card states have been reset.".to_string(),
        Reset::AlreadyEmpty => "ℹ️ No cards to reset.".to_string(),
    }
}
