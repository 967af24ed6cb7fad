//! Bounded exponential backoff around completion calls

use std::time::Duration;

use simpatient_core::{CompletionError, GenerationFailure};

use super::client::CompletionClient;

/// How often and how patiently to retry rate-limited completions
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Sleep before the retry that follows `attempt` (counted from 0).
    /// Saturates at `Duration::MAX` for absurd configured base delays.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Run a completion, retrying only on rate-limit signals.
///
/// Any other error ends the loop after a single attempt.
pub async fn generate(
    client: &dyn CompletionClient,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<String, GenerationFailure> {
    let mut attempt = 0;
    loop {
        metrics::counter!("completion_attempts_total", "model" => client.model().to_string())
            .increment(1);

        match client.complete(prompt).await {
            Ok(text) => return Ok(text),
            Err(CompletionError::RateLimited(detail)) => {
                if attempt + 1 >= policy.max_attempts {
                    return Err(GenerationFailure::RateLimited {
                        attempts: attempt + 1,
                        detail,
                    });
                }

                let wait = policy.delay_for(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    "Completion rate limited, backing off"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(CompletionError::Other(detail)) => {
                return Err(GenerationFailure::Upstream(detail));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Replays a fixed script of results, one per call
    struct ScriptedClient {
        script: Mutex<VecDeque<Result<String, CompletionError>>>,
        calls: AtomicU32,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CompletionError::Other("script exhausted".into())))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    fn rate_limited() -> Result<String, CompletionError> {
        Err(CompletionError::RateLimited("429".into()))
    }

    #[tokio::test]
    async fn succeeds_after_two_rate_limits() {
        let client = ScriptedClient::new(vec![
            rate_limited(),
            rate_limited(),
            Ok("My head hurts.".into()),
        ]);

        let result = generate(&client, "prompt", &fast_policy()).await;

        assert_eq!(result, Ok("My head hurts.".to_string()));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let client = ScriptedClient::new(vec![rate_limited(), rate_limited(), rate_limited()]);

        let result = generate(&client, "prompt", &fast_policy()).await;

        let failure = result.unwrap_err();
        assert_eq!(
            failure,
            GenerationFailure::RateLimited {
                attempts: 3,
                detail: "429".into()
            }
        );
        assert_eq!(failure.apology(), simpatient_core::HIGH_LOAD_APOLOGY);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn other_errors_make_exactly_one_attempt() {
        let client = ScriptedClient::new(vec![
            Err(CompletionError::Other("bad key".into())),
            Ok("never reached".into()),
        ]);

        let result = generate(&client, "prompt", &fast_policy()).await;

        let failure = result.unwrap_err();
        assert_eq!(failure, GenerationFailure::Upstream("bad key".into()));
        assert_eq!(failure.apology(), simpatient_core::TROUBLE_APOLOGY);
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1500));
        assert_eq!(policy.delay_for(0), Duration::from_millis(1500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(3000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(6000));
    }

    #[test]
    fn huge_base_delay_saturates() {
        let policy = RetryPolicy::new(3, Duration::from_millis(u64::MAX));
        assert_eq!(policy.delay_for(1), Duration::MAX);
        assert_eq!(policy.delay_for(40), Duration::MAX);
    }
}
