use thiserror::Error;

/// Reply shown when the completion API stays rate limited after all retries
pub const HIGH_LOAD_APOLOGY: &str =
    "I'm experiencing high load or quota limits. Please try again shortly.";

/// Reply shown for any other generation failure
pub const TROUBLE_APOLOGY: &str =
    "I'm having trouble responding right now. Please try again later.";

/// Single failed call to the completion API, classified for retry
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Completion failed: {0}")]
    Other(String),
}

impl CompletionError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CompletionError::RateLimited(_))
    }
}

/// Why a turn produced no generated reply
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationFailure {
    #[error("No completion credential configured")]
    NotConfigured,

    #[error("Rate limited after {attempts} attempts: {detail}")]
    RateLimited { attempts: u32, detail: String },

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl GenerationFailure {
    /// In-character text returned to the caller instead of an error
    pub fn apology(&self) -> &'static str {
        match self {
            GenerationFailure::RateLimited { .. } => HIGH_LOAD_APOLOGY,
            GenerationFailure::NotConfigured | GenerationFailure::Upstream(_) => TROUBLE_APOLOGY,
        }
    }

    /// Short label used for metrics and structured logs
    pub fn reason(&self) -> &'static str {
        match self {
            GenerationFailure::NotConfigured => "not_configured",
            GenerationFailure::RateLimited { .. } => "rate_limited",
            GenerationFailure::Upstream(_) => "upstream",
        }
    }
}
