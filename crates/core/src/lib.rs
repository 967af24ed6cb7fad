//! simpatient-core: Domain types for the simulated patient
//!
//! This crate holds the conversation state, the prompt selection rule
//! table and templates, and the generation failure taxonomy. It performs
//! no I/O; the server crate drives it.

pub mod error;
pub mod outcome;
pub mod profile;
pub mod prompt;
pub mod session;

pub use error::{CompletionError, GenerationFailure, HIGH_LOAD_APOLOGY, TROUBLE_APOLOGY};
pub use outcome::{ErrorBody, Exchange};
pub use profile::PatientProfile;
pub use prompt::{PromptKind, PromptRule, RULES, TurnPlan, plan_turn};
pub use session::{
    ConversationState, HistoryEntry, LogEntry, LogRole, MAX_SYMPTOM_LEVEL, Session, SessionId,
    SessionSnapshot, Speaker,
};
