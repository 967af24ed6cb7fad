//! Prompt selection for the simulated patient
//!
//! The only decision procedure in the conversation is the ordered rule
//! table below: the first rule whose predicate matches picks the prompt
//! template for the turn. Keyword matching is case-insensitive substring
//! matching on the doctor's latest message.

use crate::session::{ConversationState, HistoryEntry, MAX_SYMPTOM_LEVEL, Session, Speaker};

/// Words that signal the doctor is proposing a treatment
pub const TREATMENT_KEYWORDS: [&str; 6] = [
    "prescribe",
    "medication",
    "treatment",
    "take",
    "medicine",
    "drug",
];

/// Words that signal the doctor wants more symptom detail
pub const DETAIL_KEYWORDS: [&str; 4] = ["more", "detail", "describe", "tell me"];

/// Number of most recent history entries rendered into a prompt
pub const HISTORY_WINDOW: usize = 12;

const PERSONA_RULES: &str = r#"You are a simulated patient. Follow these rules:
1) Reveal symptoms progressively: start mild and provide more detail only when asked.
2) If a treatment is prescribed, either accept it (echoing the treatment), ask a clarifying question, or politely decline.
3) Speak in first person and be realistic."#;

const GREETING_INSTRUCTION: &str = "You are starting a conversation with a doctor. Introduce yourself briefly and mention only MILD symptoms. Keep it short and natural.";

const TREATMENT_INSTRUCTION: &str = r#"The doctor has prescribed a treatment. Evaluate if it's reasonable for your condition:
- If reasonable: Accept it clearly by saying "I accept the treatment: [treatment name]"
- If unclear: Ask clarifying questions
- If unreasonable: Politely express concern"#;

const DETAIL_INSTRUCTION: &str = r#"The doctor is asking for more details. Reveal MORE detailed symptoms now. Be more specific about:
- When symptoms started
- Severity and frequency
- Any triggers or patterns
- Impact on daily life"#;

const FACTUAL_INSTRUCTION: &str = "Answer succinctly and factually to the doctor's question.";

/// Template chosen for a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Greeting,
    TreatmentEvaluation,
    DetailEscalation,
    FactualAnswer,
}

impl PromptKind {
    /// State label the session moves to once the turn completes
    pub fn next_state(self) -> ConversationState {
        match self {
            PromptKind::Greeting => ConversationState::Questioning,
            PromptKind::TreatmentEvaluation => ConversationState::Treatment,
            PromptKind::DetailEscalation => ConversationState::Progressive,
            PromptKind::FactualAnswer => ConversationState::Questioning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PromptKind::Greeting => "greeting",
            PromptKind::TreatmentEvaluation => "treatment_evaluation",
            PromptKind::DetailEscalation => "detail_escalation",
            PromptKind::FactualAnswer => "factual_answer",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            PromptKind::Greeting => GREETING_INSTRUCTION,
            PromptKind::TreatmentEvaluation => TREATMENT_INSTRUCTION,
            PromptKind::DetailEscalation => DETAIL_INSTRUCTION,
            PromptKind::FactualAnswer => FACTUAL_INSTRUCTION,
        }
    }
}

/// One row of the selection table: predicate over (session, lower-cased message)
pub struct PromptRule {
    pub kind: PromptKind,
    pub matches: fn(&Session, &str) -> bool,
}

/// Selection rules in priority order; the last rule always matches
pub const RULES: [PromptRule; 4] = [
    PromptRule {
        kind: PromptKind::Greeting,
        matches: is_first_message,
    },
    PromptRule {
        kind: PromptKind::TreatmentEvaluation,
        matches: mentions_treatment_rule,
    },
    PromptRule {
        kind: PromptKind::DetailEscalation,
        matches: asks_for_detail,
    },
    PromptRule {
        kind: PromptKind::FactualAnswer,
        matches: always,
    },
];

fn is_first_message(session: &Session, _lower: &str) -> bool {
    session.history().is_empty()
}

fn mentions_treatment_rule(_session: &Session, lower: &str) -> bool {
    contains_any(lower, &TREATMENT_KEYWORDS)
}

fn asks_for_detail(session: &Session, lower: &str) -> bool {
    contains_any(lower, &DETAIL_KEYWORDS) && session.symptom_level() < MAX_SYMPTOM_LEVEL
}

fn always(_session: &Session, _lower: &str) -> bool {
    true
}

fn contains_any(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| lower.contains(k))
}

/// Whether a message proposes a treatment (case-insensitive)
pub fn mentions_treatment(message: &str) -> bool {
    contains_any(&message.to_lowercase(), &TREATMENT_KEYWORDS)
}

/// Everything needed to run one turn against the completion API
#[derive(Debug, Clone)]
pub struct TurnPlan {
    pub kind: PromptKind,
    pub next_state: ConversationState,
    pub mentions_treatment: bool,
    pub prompt: String,
}

/// Pick the template for a message by walking the rule table
pub fn select(session: &Session, message: &str) -> PromptKind {
    let lower = message.to_lowercase();
    RULES
        .iter()
        .find(|rule| (rule.matches)(session, &lower))
        .map(|rule| rule.kind)
        .unwrap_or(PromptKind::FactualAnswer)
}

/// Select a template and render the prompt for the doctor's message
pub fn plan_turn(session: &Session, message: &str) -> TurnPlan {
    let kind = select(session, message);
    TurnPlan {
        kind,
        next_state: kind.next_state(),
        mentions_treatment: mentions_treatment(message),
        prompt: render(kind, session, message),
    }
}

/// Render the full prompt text for a template
pub fn render(kind: PromptKind, session: &Session, message: &str) -> String {
    let mut prompt = format!(
        "{}\n\n{}\n\n{}\n",
        PERSONA_RULES,
        session.profile().render(),
        kind.instruction()
    );

    if kind != PromptKind::Greeting {
        prompt.push_str("\nConversation history:\n");
        prompt.push_str(&format_history(session.history()));
        prompt.push('\n');
    }

    prompt.push_str(&format!("\nDoctor: {}\nPatient:", message));
    prompt
}

/// Format the last `HISTORY_WINDOW` entries as Doctor:/Patient: lines
pub fn format_history(history: &[HistoryEntry]) -> String {
    if history.is_empty() {
        return "No previous conversation.".to_string();
    }

    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|entry| match entry.speaker {
            Speaker::Doctor => format!("Doctor: {}", entry.text),
            Speaker::Patient => format!("Patient: {}", entry.text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PatientProfile;

    fn fresh() -> Session {
        Session::new("s", PatientProfile::demo())
    }

    fn started() -> Session {
        let mut s = fresh();
        let plan = plan_turn(&s, "Hello");
        s.record_turn(&plan, "Hello", "Hi, I'm Alex.");
        s
    }

    #[test]
    fn empty_history_selects_greeting() {
        let s = fresh();
        assert_eq!(select(&s, "Hello, I've been having headaches"), PromptKind::Greeting);
        assert_eq!(PromptKind::Greeting.next_state(), ConversationState::Questioning);
    }

    #[test]
    fn greeting_wins_over_treatment_keywords() {
        let s = fresh();
        assert_eq!(select(&s, "I prescribe ibuprofen"), PromptKind::Greeting);
    }

    #[test]
    fn treatment_matching_is_case_insensitive() {
        let s = started();
        assert_eq!(select(&s, "PRESCRIBE now"), PromptKind::TreatmentEvaluation);
        assert_eq!(select(&s, "Please Take two pills"), PromptKind::TreatmentEvaluation);
    }

    #[test]
    fn treatment_wins_over_detail() {
        let s = started();
        assert_eq!(
            select(&s, "Tell me more about the medication you use"),
            PromptKind::TreatmentEvaluation
        );
    }

    #[test]
    fn detail_request_selects_escalation_until_capped() {
        let mut s = started();
        let message = "Can you describe your symptoms in more detail?";
        assert_eq!(select(&s, message), PromptKind::DetailEscalation);

        for _ in 0..MAX_SYMPTOM_LEVEL {
            let plan = plan_turn(&s, message);
            s.record_turn(&plan, message, "More detail.");
        }
        assert_eq!(s.symptom_level(), MAX_SYMPTOM_LEVEL);
        assert_eq!(select(&s, message), PromptKind::FactualAnswer);
    }

    #[test]
    fn other_messages_select_factual_answer() {
        let s = started();
        assert_eq!(select(&s, "Where does it hurt?"), PromptKind::FactualAnswer);
    }

    #[test]
    fn rule_table_order_is_fixed() {
        let kinds: Vec<_> = RULES.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PromptKind::Greeting,
                PromptKind::TreatmentEvaluation,
                PromptKind::DetailEscalation,
                PromptKind::FactualAnswer,
            ]
        );
    }

    #[test]
    fn greeting_prompt_has_profile_and_no_history() {
        let s = fresh();
        let prompt = render(PromptKind::Greeting, &s, "Good morning");

        assert!(prompt.starts_with("You are a simulated patient."));
        assert!(prompt.contains("Name: Alex"));
        assert!(prompt.contains("Age: 35"));
        assert!(prompt.contains("Medical history: no known chronic diseases"));
        assert!(prompt.contains("mention only MILD symptoms"));
        assert!(!prompt.contains("Conversation history:"));
        assert!(prompt.ends_with("Doctor: Good morning\nPatient:"));
    }

    #[test]
    fn factual_prompt_includes_transcript() {
        let s = started();
        let prompt = render(PromptKind::FactualAnswer, &s, "Any fever?");

        assert!(prompt.contains("Conversation history:\nDoctor: Hello\nPatient: Hi, I'm Alex."));
        assert!(prompt.ends_with("Doctor: Any fever?\nPatient:"));
    }

    #[test]
    fn treatment_prompt_lists_postures() {
        let s = started();
        let plan = plan_turn(&s, "I prescribe ibuprofen");

        assert_eq!(plan.kind, PromptKind::TreatmentEvaluation);
        assert!(plan.mentions_treatment);
        assert!(plan.prompt.contains("I accept the treatment: [treatment name]"));
        assert!(plan.prompt.contains("Ask clarifying questions"));
        assert!(plan.prompt.contains("Politely express concern"));
    }

    #[test]
    fn history_window_keeps_last_twelve_entries() {
        let mut s = started();
        for i in 0..10 {
            let message = format!("Question {i}?");
            let plan = plan_turn(&s, &message);
            s.record_turn(&plan, &message, &format!("Answer {i}."));
        }
        assert_eq!(s.history().len(), 22);

        let transcript = format_history(s.history());
        let lines: Vec<_> = transcript.lines().collect();
        assert_eq!(lines.len(), HISTORY_WINDOW);
        assert_eq!(lines[0], "Doctor: Question 4?");
        assert_eq!(lines[HISTORY_WINDOW - 1], "Patient: Answer 9.");
    }

    #[test]
    fn empty_history_formats_placeholder() {
        assert_eq!(format_history(&[]), "No previous conversation.");
    }
}
