//! Per-session conversation record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::PatientProfile;
use crate::prompt::{PromptKind, TurnPlan};

/// Highest symptom escalation level a session can reach
pub const MAX_SYMPTOM_LEVEL: u8 = 2;

/// Opaque session identifier
pub type SessionId = String;

/// Conversation phase label
///
/// Informational only: prompt selection is re-derived from the latest
/// message every turn, the label is kept for clients to display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConversationState {
    #[default]
    Initial,
    Questioning,
    Progressive,
    Treatment,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Initial => "initial",
            ConversationState::Questioning => "questioning",
            ConversationState::Progressive => "progressive",
            ConversationState::Treatment => "treatment",
        }
    }
}

/// Speaker of a history entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Doctor,
    Patient,
}

/// One line of the conversation history fed back into prompts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub text: String,
}

/// Role recorded in the HTTP-visible log
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRole {
    User,
    Agent,
}

/// Entry returned by `GET /logs/{session_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub role: LogRole,
    pub text: String,
    pub ts: DateTime<Utc>,
}

impl LogEntry {
    pub fn user(text: &str) -> Self {
        Self {
            role: LogRole::User,
            text: text.to_string(),
            ts: Utc::now(),
        }
    }

    pub fn agent(text: &str) -> Self {
        Self {
            role: LogRole::Agent,
            text: text.to_string(),
            ts: Utc::now(),
        }
    }
}

/// State tracked for one simulated patient conversation
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    profile: PatientProfile,
    history: Vec<HistoryEntry>,
    state: ConversationState,
    symptom_level: u8,
    treatment_detected: bool,
    treatment_accepted: bool,
}

/// Point-in-time view of the session counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: ConversationState,
    pub symptom_level: u8,
    pub treatment_detected: bool,
    pub treatment_accepted: bool,
    pub turns: usize,
}

impl Session {
    pub fn new(id: impl Into<SessionId>, profile: PatientProfile) -> Self {
        Self {
            id: id.into(),
            profile,
            history: Vec::new(),
            state: ConversationState::Initial,
            symptom_level: 0,
            treatment_detected: false,
            treatment_accepted: false,
        }
    }

    pub fn profile(&self) -> &PatientProfile {
        &self.profile
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn symptom_level(&self) -> u8 {
        self.symptom_level
    }

    pub fn treatment_detected(&self) -> bool {
        self.treatment_detected
    }

    pub fn treatment_accepted(&self) -> bool {
        self.treatment_accepted
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            symptom_level: self.symptom_level,
            treatment_detected: self.treatment_detected,
            treatment_accepted: self.treatment_accepted,
            turns: self.history.len() / 2,
        }
    }

    /// Apply a completed turn: append both sides and update the counters.
    ///
    /// Only called once the completion succeeded, so history stays
    /// doctor/patient paired.
    pub fn record_turn(&mut self, plan: &TurnPlan, doctor_message: &str, reply: &str) {
        self.history.push(HistoryEntry {
            speaker: Speaker::Doctor,
            text: doctor_message.to_string(),
        });
        self.history.push(HistoryEntry {
            speaker: Speaker::Patient,
            text: reply.to_string(),
        });

        self.state = plan.next_state;

        if plan.kind == PromptKind::DetailEscalation {
            self.symptom_level = (self.symptom_level + 1).min(MAX_SYMPTOM_LEVEL);
        }

        if plan.mentions_treatment {
            self.treatment_detected = true;
            if reply.to_lowercase().contains("accept") {
                self.treatment_accepted = true;
            }
        }
    }
}
