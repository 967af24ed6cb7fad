//! Simulated patient turn handling
//!
//! Ties the session store, prompt rules and completion client together.
//! Each turn holds the session lock from prompt selection until the
//! state update, so concurrent messages for one session run one at a time.
//! The transcript is pushed to separately and stays readable mid-turn.

use std::sync::Arc;

use simpatient_core::{Exchange, GenerationFailure, LogEntry, plan_turn};

use super::client::CompletionClient;
use super::retry::{RetryPolicy, generate};
use crate::store::SessionStore;

/// Runs doctor messages through the patient persona
#[derive(Clone)]
pub struct PatientSimulator {
    store: Arc<dyn SessionStore>,
    client: Option<Arc<dyn CompletionClient>>,
    retry: RetryPolicy,
}

impl PatientSimulator {
    /// `client` is `None` when no credential is configured; every turn then
    /// fails with [`GenerationFailure::NotConfigured`].
    pub fn new(
        store: Arc<dyn SessionStore>,
        client: Option<Arc<dyn CompletionClient>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            client,
            retry,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Handle one doctor message for `session_id`, creating the session if needed
    pub async fn respond(&self, session_id: &str, message: &str) -> Exchange {
        let handle = self.store.get_or_create(session_id).await;
        let mut session = handle.session.lock().await;

        handle.push_log(LogEntry::user(message)).await;

        let plan = plan_turn(&session, message);
        tracing::debug!(
            session_id = %session_id,
            template = plan.kind.as_str(),
            symptom_level = session.symptom_level(),
            "Selected prompt template"
        );

        let outcome = match &self.client {
            Some(client) => generate(client.as_ref(), &plan.prompt, &self.retry).await,
            None => Err(GenerationFailure::NotConfigured),
        };

        match &outcome {
            Ok(reply) => {
                session.record_turn(&plan, message, reply);
                tracing::info!(
                    session_id = %session_id,
                    template = plan.kind.as_str(),
                    state = session.state().as_str(),
                    symptom_level = session.symptom_level(),
                    treatment_detected = session.treatment_detected(),
                    treatment_accepted = session.treatment_accepted(),
                    "Patient turn completed"
                );
            }
            Err(failure) => {
                metrics::counter!("generation_failures_total", "reason" => failure.reason())
                    .increment(1);
                tracing::warn!(
                    session_id = %session_id,
                    template = plan.kind.as_str(),
                    reason = failure.reason(),
                    error = %failure,
                    "Patient turn failed, replying with apology"
                );
            }
        }

        let exchange = Exchange {
            outcome,
            snapshot: session.snapshot(),
        };
        handle.push_log(LogEntry::agent(exchange.reply_text())).await;
        exchange
    }
}
