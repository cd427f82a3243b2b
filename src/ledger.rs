//! Card ledger
//!
//! Current status of every card plus the ordered history of activations and
//! deactivations. Every mutation rewrites the whole ledger through a
//! [`LedgerStore`].

mod store;

#[cfg(test)]
mod proptests;

pub use store::{JsonFileStore, LedgerSnapshot, LedgerStore, StoreError};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of decimal digits in a card number
pub const CARD_ID_LEN: usize = 9;

/// Errors returned by ledger operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid card number {0:?}: must be {CARD_ID_LEN} digits")]
    InvalidId(String),
}

/// A validated 9-digit card number
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardId(String);

impl CardId {
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        if raw.len() == CARD_ID_LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(LedgerError::InvalidId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CardId {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CardId> for String {
    fn from(id: CardId) -> Self {
        id.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current status of a recorded card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Inactive,
}

impl CardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CardStatus::Active => "active",
            CardStatus::Inactive => "inactive",
        }
    }
}

/// Action recorded in the history log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardAction {
    Activated,
    Deactivated,
}

impl CardAction {
    pub fn as_str(self) -> &'static str {
        match self {
            CardAction::Activated => "activated",
            CardAction::Deactivated => "deactivated",
        }
    }

    /// Status a card ends up in after this action
    pub fn resulting_status(self) -> CardStatus {
        match self {
            CardAction::Activated => CardStatus::Active,
            CardAction::Deactivated => CardStatus::Inactive,
        }
    }
}

/// One entry of the action history, stored as a `[id, action]` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(CardId, CardAction)", into = "(CardId, CardAction)")]
pub struct ActionLogEntry {
    pub card: CardId,
    pub action: CardAction,
}

impl From<(CardId, CardAction)> for ActionLogEntry {
    fn from((card, action): (CardId, CardAction)) -> Self {
        Self { card, action }
    }
}

impl From<ActionLogEntry> for (CardId, CardAction) {
    fn from(entry: ActionLogEntry) -> Self {
        (entry.card, entry.action)
    }
}

/// Outcome of an activate/deactivate request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Status changed and the action was logged
    Applied,
    /// Card was already in the requested status; nothing logged
    AlreadyInState,
}

/// Outcome of a reset request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reset {
    Cleared,
    AlreadyEmpty,
}

/// Result of a single-card status lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLookup {
    Unknown,
    Known(CardStatus),
}

/// The action log split by action type, each side in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPartition {
    pub activated: Vec<CardId>,
    pub deactivated: Vec<CardId>,
}

/// Card states and action history bound to a backing store
pub struct Ledger {
    state: LedgerSnapshot,
    store: Box<dyn LedgerStore>,
    last_persist_failed: bool,
}

impl Ledger {
    /// Load the ledger from its store.
    ///
    /// A missing backing file is an empty ledger. An unreadable one is logged
    /// and also treated as empty.
    pub fn load(store: Box<dyn LedgerStore>) -> Self {
        let state = match store.load() {
            Ok(Some(snapshot)) => {
                tracing::info!(
                    cards = snapshot.card_states.len(),
                    actions = snapshot.card_action_history.len(),
                    "Loaded card ledger"
                );
                snapshot
            }
            Ok(None) => {
                tracing::info!("No stored card ledger, starting empty");
                LedgerSnapshot::default()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load card ledger, starting empty");
                LedgerSnapshot::default()
            }
        };

        Self {
            state,
            store,
            last_persist_failed: false,
        }
    }

    pub fn activate(&mut self, raw_id: &str) -> Result<Change, LedgerError> {
        self.apply(raw_id, CardAction::Activated)
    }

    pub fn deactivate(&mut self, raw_id: &str) -> Result<Change, LedgerError> {
        self.apply(raw_id, CardAction::Deactivated)
    }

    fn apply(&mut self, raw_id: &str, action: CardAction) -> Result<Change, LedgerError> {
        let id = CardId::parse(raw_id).inspect_err(|_| {
            tracing::warn!(card = raw_id, action = action.as_str(), "Rejected malformed card number");
        })?;
        let target = action.resulting_status();

        if self.state.card_states.get(&id) == Some(&target) {
            tracing::info!(card = %id, status = target.as_str(), "Card already in requested status");
            return Ok(Change::AlreadyInState);
        }

        self.state.card_states.insert(id.clone(), target);
        self.state.card_action_history.push(ActionLogEntry {
            card: id.clone(),
            action,
        });
        self.persist();
        tracing::info!(card = %id, action = action.as_str(), "Card status changed");
        Ok(Change::Applied)
    }

    pub fn status_of(&self, raw_id: &str) -> Result<StatusLookup, LedgerError> {
        let id = CardId::parse(raw_id)?;
        Ok(match self.state.card_states.get(&id) {
            Some(status) => StatusLookup::Known(*status),
            None => StatusLookup::Unknown,
        })
    }

    /// Cards with a logged `action`, in the order the actions happened
    pub fn actions_of(&self, action: CardAction) -> Vec<CardId> {
        self.state
            .card_action_history
            .iter()
            .filter(|entry| entry.action == action)
            .map(|entry| entry.card.clone())
            .collect()
    }

    /// Partition the history by action. A card toggled more than once shows
    /// up on both sides.
    pub fn all_statuses(&self) -> StatusPartition {
        StatusPartition {
            activated: self.actions_of(CardAction::Activated),
            deactivated: self.actions_of(CardAction::Deactivated),
        }
    }

    pub fn reset(&mut self) -> Reset {
        if self.is_empty() {
            tracing::info!("No card states to reset");
            return Reset::AlreadyEmpty;
        }
        self.state = LedgerSnapshot::default();
        self.persist();
        tracing::info!("Card states and action history reset");
        Reset::Cleared
    }

    /// Write the current state to the store regardless of pending changes
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let result = self.store.save(&self.state);
        self.last_persist_failed = result.is_err();
        result
    }

    pub fn is_empty(&self) -> bool {
        self.state.card_states.is_empty() && self.state.card_action_history.is_empty()
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.state
    }

    /// Whether the most recent write to the store failed.
    ///
    /// A failed write does not roll back the in-memory change.
    #[allow(dead_code)] // Used in tests
    pub fn last_persist_failed(&self) -> bool {
        self.last_persist_failed
    }

    fn persist(&mut self) {
        match self.flush() {
            Ok(()) => tracing::debug!("Saved card ledger"),
            Err(e) => tracing::error!(error = %e, "Failed to save card ledger"),
        }
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("state", &self.state)
            .field("last_persist_failed", &self.last_persist_failed)
            .finish_non_exhaustive()
    }
}
