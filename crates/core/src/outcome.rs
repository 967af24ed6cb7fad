use serde::{Deserialize, Serialize};

use crate::error::GenerationFailure;
use crate::session::SessionSnapshot;

/// JSON error body returned by the HTTP layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
            message: None,
        }
    }

    pub fn with_message(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: Some(message.to_string()),
        }
    }
}

/// Result of handling one doctor message
#[derive(Debug, Clone)]
pub struct Exchange {
    pub outcome: Result<String, GenerationFailure>,
    pub snapshot: SessionSnapshot,
}

impl Exchange {
    /// Text to show the caller: the generated reply or the matching apology
    pub fn reply_text(&self) -> &str {
        match &self.outcome {
            Ok(text) => text.as_str(),
            Err(failure) => failure.apology(),
        }
    }

    pub fn failure(&self) -> Option<&GenerationFailure> {
        self.outcome.as_ref().err()
    }
}
