//! Form payloads

use serde::Deserialize;

/// Body of `POST /s/{id}/chat`
#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub message: String,
}
