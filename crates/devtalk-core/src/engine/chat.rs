//! Chat engine: one user message in, one assistant turn out

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{Config, GenerationConfig};
use crate::error::Error;
use crate::llm::{ModelProvider, SamplingParams};
use crate::session::{Session, Turn};

use super::prompt::{build_prompt, sanitize_response};
use super::retry::{RetryPolicy, Sleeper, TokioSleeper};

/// Assistant content recorded when every generation attempt failed
pub const FALLBACK_RESPONSE: &str = "⚠️ Sorry, something went wrong.";

/// What a call to [`ChatEngine::submit`] did to the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Input was empty after trimming; nothing appended
    Ignored,
    /// The provider answered; its sanitized output was appended
    Replied { attempts: u32, warnings: Vec<String> },
    /// Every attempt failed; the fallback text was appended
    Fallback { attempts: u32, warnings: Vec<String> },
}

impl SubmitOutcome {
    /// Per-attempt failure messages, oldest first
    pub fn warnings(&self) -> &[String] {
        match self {
            SubmitOutcome::Ignored => &[],
            SubmitOutcome::Replied { warnings, .. } | SubmitOutcome::Fallback { warnings, .. } => {
                warnings
            }
        }
    }

    /// Provider invocations made
    pub fn attempts(&self) -> u32 {
        match self {
            SubmitOutcome::Ignored => 0,
            SubmitOutcome::Replied { attempts, .. } | SubmitOutcome::Fallback { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SubmitOutcome::Fallback { .. })
    }
}

/// Builds prompts from a session, calls the provider with bounded retry and
/// records the result back into the session.
///
/// The engine holds no conversation state; the same engine serves any number
/// of sessions.
pub struct ChatEngine {
    provider: Arc<dyn ModelProvider>,
    generation: GenerationConfig,
    retry: RetryPolicy,
    window: usize,
    sleeper: Arc<dyn Sleeper>,
}

impl ChatEngine {
    /// Create an engine from configuration
    pub fn new(provider: Arc<dyn ModelProvider>, config: &Config) -> Self {
        Self {
            provider,
            generation: config.generation.clone(),
            retry: RetryPolicy::from(&config.retry),
            window: config.session.window.max(1),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the delay used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Number of trailing turns included in a prompt
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Prompt for the session's history followed by `pending`, limited to the
    /// trailing window.
    pub fn prompt_for(&self, session: &Session, pending: &Turn) -> String {
        let mut turns = session.last_turns(self.window - 1).to_vec();
        turns.push(pending.clone());
        build_prompt(session.persona(), &turns)
    }

    /// Record `user_text`, generate a reply and record it.
    ///
    /// Appends exactly one user turn and one assistant turn, or nothing when
    /// the input is blank. Generation failures never escape: after the last
    /// failed attempt the fallback text is recorded instead.
    ///
    /// Both turns are pushed only once generation has finished, so dropping
    /// the returned future leaves the session untouched.
    pub async fn submit(&self, session: &mut Session, user_text: &str) -> SubmitOutcome {
        if user_text.trim().is_empty() {
            debug!("Ignoring blank input for session {}", session.id);
            return SubmitOutcome::Ignored;
        }

        let user_turn = Turn::user(user_text);
        let prompt = self.prompt_for(session, &user_turn);
        let params = SamplingParams::new(session.temperature(), &self.generation);

        info!(
            "Generating reply for session {} ({} turns, window {})",
            session.id,
            session.turn_count() + 1,
            self.window
        );

        let (reply, attempts, warnings) = self.generate_with_retry(&prompt, &params).await;

        session.push_turn(user_turn);
        match reply {
            Some(raw) => {
                let content = sanitize_response(&raw);
                session.push_turn(Turn::assistant(content));
                SubmitOutcome::Replied { attempts, warnings }
            }
            None => {
                session.push_turn(Turn::assistant(FALLBACK_RESPONSE));
                SubmitOutcome::Fallback { attempts, warnings }
            }
        }
    }

    /// Call the provider up to `max_attempts` times, sleeping the backoff
    /// between failures.
    async fn generate_with_retry(
        &self,
        prompt: &str,
        params: &SamplingParams,
    ) -> (Option<String>, u32, Vec<String>) {
        let max_attempts = self.retry.max_attempts;
        let mut warnings = Vec::new();

        for attempt in 1..=max_attempts {
            let result = match tokio::time::timeout(
                self.retry.attempt_timeout,
                self.provider.generate(prompt, params),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(self.retry.attempt_timeout)),
            };

            match result {
                Ok(text) => return (Some(text), attempt, warnings),
                Err(e) => {
                    let message =
                        format!("Generation failed (attempt {}/{}): {}", attempt, max_attempts, e);
                    warn!("{}", message);
                    warnings.push(message);

                    if attempt < max_attempts {
                        self.sleeper.sleep(self.retry.backoff).await;
                    }
                }
            }
        }

        error!("Failed to generate a response after {} attempts", max_attempts);
        (None, max_attempts, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::session::Role;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Provider that replays scripted results and records every call
    #[derive(Default)]
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<String>>>,
        calls: Mutex<Vec<(String, SamplingParams)>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<String>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn always_failing() -> Self {
            Self::default()
        }

        fn calls(&self) -> Vec<(String, SamplingParams)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String> {
            self.calls.lock().unwrap().push((prompt.to_string(), *params));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Provider("model crashed".to_string())))
        }
    }

    /// Provider that never answers
    struct HangingProvider;

    #[async_trait]
    impl ModelProvider for HangingProvider {
        async fn generate(&self, _prompt: &str, _params: &SamplingParams) -> Result<String> {
            std::future::pending().await
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn engine_with(provider: Arc<dyn ModelProvider>) -> (ChatEngine, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let engine = ChatEngine::new(provider, &Config::default()).with_sleeper(sleeper.clone());
        (engine, sleeper)
    }

    #[tokio::test]
    async fn test_submit_appends_user_then_assistant() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(
            "<|assistant|>\n Hi. <|end|>".to_string()
        )]));
        let (engine, sleeper) = engine_with(provider.clone());
        let mut session = Session::new("You are terse.", 0.4);

        let outcome = engine.submit(&mut session, "Hi").await;

        assert_eq!(outcome, SubmitOutcome::Replied { attempts: 1, warnings: vec![] });
        assert_eq!(session.history(), &[Turn::user("Hi"), Turn::assistant("Hi.")]);

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        let (prompt, params) = &calls[0];
        assert_eq!(
            prompt,
            "<|system|>\nYou are terse.\n<|end|>\n<|user|>\nHi\n<|end|>\n<|assistant|>\n"
        );
        assert_eq!(params.temperature, 0.4);
        assert_eq!(params.max_tokens, 512);
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("unused".to_string())]));
        let (engine, _) = engine_with(provider.clone());
        let mut session = Session::new("p", 0.4);

        for input in ["", "   ", "\n\t "] {
            assert_eq!(engine.submit(&mut session, input).await, SubmitOutcome::Ignored);
        }

        assert!(session.is_empty());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_user_text_recorded_as_entered() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("ok".to_string())]));
        let (engine, _) = engine_with(provider);
        let mut session = Session::new("p", 0.4);

        engine.submit(&mut session, "  padded  ").await;
        assert_eq!(session.history()[0], Turn::user("  padded  "));
    }

    #[tokio::test]
    async fn test_exhausted_retries_use_fallback() {
        let provider = Arc::new(ScriptedProvider::always_failing());
        let (engine, sleeper) = engine_with(provider.clone());
        let mut session = Session::new("p", 0.4);

        let outcome = engine.submit(&mut session, "Hello").await;

        assert!(outcome.is_fallback());
        assert_eq!(outcome.attempts(), 2);
        assert_eq!(
            outcome.warnings(),
            &[
                "Generation failed (attempt 1/2): Model provider error: model crashed".to_string(),
                "Generation failed (attempt 2/2): Model provider error: model crashed".to_string(),
            ]
        );
        assert_eq!(
            session.history(),
            &[Turn::user("Hello"), Turn::assistant(FALLBACK_RESPONSE)]
        );
        assert_eq!(provider.calls().len(), 2);
        assert_eq!(*sleeper.sleeps.lock().unwrap(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(Error::Provider("busy".to_string())),
            Ok("Recovered".to_string()),
        ]));
        let (engine, sleeper) = engine_with(provider.clone());
        let mut session = Session::new("p", 0.4);

        let outcome = engine.submit(&mut session, "Hello").await;

        assert_eq!(outcome.attempts(), 2);
        assert_eq!(outcome.warnings().len(), 1);
        assert!(!outcome.is_fallback());
        assert_eq!(session.history()[1], Turn::assistant("Recovered"));
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 1);

        // both attempts send the same prompt
        let calls = provider.calls();
        assert_eq!(calls[0].0, calls[1].0);
    }

    #[tokio::test]
    async fn test_configured_attempt_count() {
        let provider = Arc::new(ScriptedProvider::always_failing());
        let (engine, sleeper) = engine_with(provider.clone());
        let engine = engine.with_retry(RetryPolicy::new(
            4,
            Duration::from_millis(250),
            Duration::from_secs(5),
        ));
        let mut session = Session::new("p", 0.4);

        let outcome = engine.submit(&mut session, "Hello").await;

        assert_eq!(outcome.attempts(), 4);
        assert_eq!(provider.calls().len(), 4);
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![Duration::from_millis(250); 3]
        );
        assert_eq!(session.turn_count(), 2);
    }

    #[tokio::test]
    async fn test_hung_provider_times_out() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let engine = ChatEngine::new(Arc::new(HangingProvider), &Config::default())
            .with_sleeper(sleeper)
            .with_retry(RetryPolicy::new(2, Duration::ZERO, Duration::from_millis(10)));
        let mut session = Session::new("p", 0.4);

        let outcome = engine.submit(&mut session, "Hello").await;

        assert!(outcome.is_fallback());
        assert!(outcome.warnings()[0].contains("timed out"));
        assert_eq!(session.history()[1].content(), FALLBACK_RESPONSE);
    }

    #[tokio::test]
    async fn test_dropped_submit_leaves_history_paired() {
        let engine = ChatEngine::new(Arc::new(HangingProvider), &Config::default())
            .with_sleeper(Arc::new(RecordingSleeper::default()));
        let mut session = Session::new("p", 0.4);
        session.push_turn(Turn::user("earlier"));
        session.push_turn(Turn::assistant("reply"));

        let interrupted =
            tokio::time::timeout(Duration::from_millis(20), engine.submit(&mut session, "Hi")).await;
        assert!(interrupted.is_err());
        assert_eq!(session.turn_count(), 2);

        let provider = Arc::new(ScriptedProvider::new(vec![Ok("answer".to_string())]));
        let (engine, _) = engine_with(provider);
        engine.submit(&mut session, "Hi again").await;

        assert_eq!(session.turn_count() % 2, 0);
        let roles: Vec<Role> = session.history().iter().map(Turn::role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }

    #[tokio::test]
    async fn test_window_limits_prompt_not_history() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("reply".to_string())]));
        let (engine, _) = engine_with(provider.clone());
        let mut session = Session::new("p", 0.4);

        for i in 0..4 {
            session.push_turn(Turn::user(format!("question {}", i)));
            session.push_turn(Turn::assistant(format!("answer {}", i)));
        }

        engine.submit(&mut session, "question 4").await;

        assert_eq!(session.turn_count(), 10);

        let calls = provider.calls();
        let (prompt, _) = &calls[0];
        assert_eq!(prompt.matches("<|end|>").count(), 7); // system + 6 turns
        assert!(!prompt.contains("question 0"));
        assert!(!prompt.contains("answer 0"));
        assert!(!prompt.contains("question 1\n"));
        assert!(prompt.contains("answer 1"));
        assert!(prompt.contains("question 4"));
        assert!(prompt.ends_with("<|user|>\nquestion 4\n<|end|>\n<|assistant|>\n"));
    }

    #[tokio::test]
    async fn test_temperature_update_reaches_next_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok("one".to_string()),
            Ok("two".to_string()),
            Ok("three".to_string()),
        ]));
        let (engine, _) = engine_with(provider.clone());
        let mut session = Session::new("p", 0.4);

        engine.submit(&mut session, "first").await;
        session.set_temperature(0.9);
        engine.submit(&mut session, "second").await;
        session.set_temperature(5.0);
        engine.submit(&mut session, "third").await;

        let temperatures: Vec<f32> = provider.calls().iter().map(|(_, p)| p.temperature).collect();
        assert_eq!(temperatures, vec![0.4, 0.9, 1.0]);
    }

    #[tokio::test]
    async fn test_persona_update_reaches_next_prompt() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("a".to_string()), Ok("b".to_string())]));
        let (engine, _) = engine_with(provider.clone());
        let mut session = Session::new("Old persona", 0.4);

        engine.submit(&mut session, "first").await;
        session.set_persona("New persona");
        engine.submit(&mut session, "second").await;

        let calls = provider.calls();
        assert_eq!(calls[1].0.matches("New persona").count(), 1);
        assert!(!calls[1].0.contains("Old persona"));
    }

    #[tokio::test]
    async fn test_turns_alternate_over_many_submits() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok("a".to_string()),
            Err(Error::Provider("x".to_string())),
            Err(Error::Provider("y".to_string())),
            Ok("c".to_string()),
        ]));
        let (engine, _) = engine_with(provider);
        let mut session = Session::new("p", 0.4);

        for text in ["1", " ", "2", "3"] {
            engine.submit(&mut session, text).await;
        }

        let roles: Vec<Role> = session.history().iter().map(Turn::role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(session.history()[3].content(), FALLBACK_RESPONSE);
        assert_eq!(session.history()[5].content(), "c");
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(SubmitOutcome::Fallback {
            attempts: 2,
            warnings: vec!["w".to_string()],
        })
        .unwrap();
        assert_eq!(json["status"], "fallback");
        assert_eq!(json["attempts"], 2);
    }
}
