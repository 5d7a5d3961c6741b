//! Reliability facade around the reasoning collaborator. Callers always
//! get a schema-shaped result: admission control, per-attempt deadline,
//! retry with backoff, circuit breaking and one-shot output self-repair
//! all degrade to a placeholder instead of surfacing an error.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::breaker::{CircuitBreaker, Clock, SystemClock};
use crate::provider::{AnalysisEvidence, ReasoningProvider, ReasoningRequest};
use crate::schema;
use lineage_core::{AiAnalysis, LineageError, ReasoningConfig, Result};

const CODE_CALL_FAILED: &str = "LLM_CALL_FAILED";
const CODE_CIRCUIT_OPEN: &str = "CIRCUIT_OPEN";
const CODE_MALFORMED: &str = "LLM_MALFORMED_OUTPUT";

const SYSTEM_PROMPT: &str = "You are a frontend data-flow analyst. Given a clicked template \
element and the pruned scripts of its provenance chain, explain where the displayed value \
originates. Respond with a single JSON object using the fields fullLinkTrace, dataSource \
{type, endpoint, method}, componentAnalysis, variableAnalysis, confidence and suggestNextStep.";

pub struct ReasoningFacade {
    provider: Arc<dyn ReasoningProvider>,
    config: ReasoningConfig,
    semaphore: Arc<Semaphore>,
    breaker: CircuitBreaker,
}

impl ReasoningFacade {
    pub fn new(provider: Arc<dyn ReasoningProvider>, config: ReasoningConfig) -> Self {
        Self::with_clock(provider, config, Arc::new(SystemClock::default()))
    }

    pub fn with_clock(
        provider: Arc<dyn ReasoningProvider>,
        config: ReasoningConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        let breaker = CircuitBreaker::new(config.breaker.clone(), clock);
        Self {
            provider,
            config,
            semaphore,
            breaker,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Runs the full reliability pipeline for one analysis. Never
    /// fails: any unrecoverable condition yields the degraded
    /// placeholder with an explanatory code.
    pub async fn analyze(&self, evidence: &AnalysisEvidence) -> AiAnalysis {
        if !self.breaker.try_acquire() {
            tracing::warn!("reasoning circuit open; returning degraded analysis");
            return AiAnalysis::degraded(
                CODE_CIRCUIT_OPEN,
                "reasoning collaborator temporarily bypassed",
            );
        }

        // queue in arrival order behind the in-flight bound
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("facade semaphore never closes");

        let request =
            ReasoningRequest::new(build_prompt(evidence)).with_system(SYSTEM_PROMPT.to_string());

        let content = match self.call_with_retry(&request).await {
            Ok(content) => content,
            Err(err) => {
                self.breaker.record_failure();
                tracing::warn!(%err, "reasoning call failed after retries");
                return AiAnalysis::degraded(CODE_CALL_FAILED, &err.to_string());
            }
        };

        match self.parse_or_repair(&content).await {
            Ok(analysis) => {
                self.breaker.record_success();
                analysis
            }
            Err(err @ LineageError::LlmMalformedOutput(_)) => {
                // transport worked, so the breaker sees a success even
                // though the output never matched the schema
                self.breaker.record_success();
                tracing::warn!(%err, "reasoning output unusable after repair attempt");
                AiAnalysis::degraded(CODE_MALFORMED, &err.to_string())
            }
            Err(err) => {
                // the repair call itself failed in transport
                self.breaker.record_failure();
                tracing::warn!(%err, "format repair call failed");
                AiAnalysis::degraded(CODE_CALL_FAILED, &err.to_string())
            }
        }
    }

    /// One call with the configured deadline per attempt and
    /// exponential backoff between retryable failures.
    async fn call_with_retry(&self, request: &ReasoningRequest) -> Result<String> {
        let mut last_error = LineageError::Internal("no attempt made".into());
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                tracing::debug!(attempt, delay_secs = delay.as_secs(), "retrying reasoning call");
                tokio::time::sleep(delay).await;
            }
            match self.attempt(request).await {
                Ok(content) => return Ok(content),
                Err(err) if err.is_retryable() => last_error = err,
                Err(err) => return Err(err),
            }
        }
        Err(last_error)
    }

    async fn attempt(&self, request: &ReasoningRequest) -> Result<String> {
        let deadline = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(deadline, self.provider.generate(request)).await {
            Ok(Ok(response)) => Ok(response.content),
            Ok(Err(err)) => Err(err),
            // the underlying call keeps running; the caller treats it
            // as abandoned
            Err(_) => Err(LineageError::LlmTimeout(self.config.timeout_secs)),
        }
    }

    /// Parses the response, and on a schema mismatch issues exactly one
    /// corrective request asking for format repair only.
    async fn parse_or_repair(&self, content: &str) -> Result<AiAnalysis> {
        match schema::parse_analysis(content) {
            Ok(analysis) => Ok(analysis),
            Err(first_err) => {
                tracing::debug!(%first_err, "reasoning output malformed; requesting repair");
                let repair = ReasoningRequest::new(schema::repair_prompt(content))
                    .with_system(SYSTEM_PROMPT.to_string());
                let repaired = self.attempt(&repair).await?;
                schema::parse_analysis(&repaired)
            }
        }
    }
}

fn build_prompt(evidence: &AnalysisEvidence) -> String {
    let mut prompt = format!(
        "## Clicked element\n{}\n\n## Evidence code (clicked component first)\n{}\n",
        evidence.target_element, evidence.evidence_code
    );
    if !evidence.call_sites.is_empty() {
        prompt.push_str("\n## Mutation trigger call sites\n");
        for site in &evidence.call_sites {
            prompt.push_str(site);
            prompt.push('\n');
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::{CircuitState, ManualClock};
    use crate::provider::ReasoningResponse;
    use async_trait::async_trait;
    use lineage_core::{BreakerConfig, DataSourceType};
    use parking_lot::Mutex;

    const GOOD_JSON: &str = r#"{
        "fullLinkTrace": "Card.vue <- App.vue",
        "dataSource": {"type": "API", "endpoint": "/api/user", "method": "GET"},
        "confidence": 80
    }"#;

    /// Scripted provider: pops one behavior per call.
    struct ScriptedProvider {
        script: Mutex<Vec<Behavior>>,
        calls: Mutex<u32>,
    }

    enum Behavior {
        Reply(&'static str),
        Fail(fn() -> LineageError),
        Hang,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Behavior>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl ReasoningProvider for ScriptedProvider {
        async fn generate(&self, _request: &ReasoningRequest) -> Result<ReasoningResponse> {
            *self.calls.lock() += 1;
            let behavior = {
                let mut script = self.script.lock();
                if script.is_empty() {
                    Behavior::Reply(GOOD_JSON)
                } else {
                    script.remove(0)
                }
            };
            match behavior {
                Behavior::Reply(text) => Ok(ReasoningResponse {
                    content: text.to_string(),
                    model: "scripted".into(),
                    total_tokens: None,
                }),
                Behavior::Fail(make) => Err(make()),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn facade_with(provider: Arc<ScriptedProvider>, max_retries: u32) -> ReasoningFacade {
        let config = ReasoningConfig {
            timeout_secs: 1,
            max_retries,
            max_concurrency: 2,
            breaker: BreakerConfig {
                failure_threshold: 5,
                cooldown_secs: 30,
            },
            ..Default::default()
        };
        ReasoningFacade::with_clock(provider, config, Arc::new(ManualClock::default()))
    }

    fn evidence() -> AnalysisEvidence {
        AnalysisEvidence {
            target_element: "<span>{{ user.name }}</span>".into(),
            evidence_code: "// file: Card.vue\nexport default { props: ['user'] };".into(),
            call_sites: vec!["store/user.js:42 commit('user/SET_PROFILE')".into()],
        }
    }

    #[tokio::test]
    async fn well_formed_response_parses_first_try() {
        let provider = ScriptedProvider::new(vec![Behavior::Reply(GOOD_JSON)]);
        let facade = facade_with(provider.clone(), 2);
        let analysis = facade.analyze(&evidence()).await;
        assert_eq!(analysis.data_source.kind, DataSourceType::Api);
        assert_eq!(analysis.error_code, None);
        assert_eq!(provider.calls(), 1);
        assert_eq!(facade.breaker().failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_timeouts_exhaust_retries_and_degrade() {
        // two attempts (one retry), both hang past the deadline
        let provider = ScriptedProvider::new(vec![Behavior::Hang, Behavior::Hang]);
        let facade = facade_with(provider.clone(), 1);
        let analysis = facade.analyze(&evidence()).await;
        assert_eq!(analysis.error_code.as_deref(), Some("LLM_CALL_FAILED"));
        assert_eq!(analysis.data_source.kind, DataSourceType::Unknown);
        assert_eq!(provider.calls(), 2);
        // one failure recorded for the exhausted call as a whole
        assert_eq!(facade.breaker().failure_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried_to_success() {
        let provider = ScriptedProvider::new(vec![
            Behavior::Fail(|| LineageError::LlmTransient("connection reset".into())),
            Behavior::Reply(GOOD_JSON),
        ]);
        let facade = facade_with(provider.clone(), 2);
        let analysis = facade.analyze(&evidence()).await;
        assert_eq!(analysis.error_code, None);
        assert_eq!(provider.calls(), 2);
        assert_eq!(facade.breaker().failure_count(), 0);
    }

    #[tokio::test]
    async fn non_retryable_failure_degrades_immediately() {
        let provider = ScriptedProvider::new(vec![Behavior::Fail(|| {
            LineageError::Internal("bad request".into())
        })]);
        let facade = facade_with(provider.clone(), 3);
        let analysis = facade.analyze(&evidence()).await;
        assert_eq!(analysis.error_code.as_deref(), Some("LLM_CALL_FAILED"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn malformed_output_gets_one_repair_attempt() {
        let provider = ScriptedProvider::new(vec![
            Behavior::Reply("the value comes from the store, basically"),
            Behavior::Reply(GOOD_JSON),
        ]);
        let facade = facade_with(provider.clone(), 0);
        let analysis = facade.analyze(&evidence()).await;
        assert_eq!(analysis.error_code, None);
        assert_eq!(analysis.confidence, 80);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn failed_repair_degrades_without_further_calls() {
        let provider = ScriptedProvider::new(vec![
            Behavior::Reply("not json"),
            Behavior::Reply("still not json"),
        ]);
        let facade = facade_with(provider.clone(), 0);
        let analysis = facade.analyze(&evidence()).await;
        assert_eq!(analysis.error_code.as_deref(), Some("LLM_MALFORMED_OUTPUT"));
        assert_eq!(provider.calls(), 2);
        // transport worked, so the breaker stays clean
        assert_eq!(facade.breaker().failure_count(), 0);
    }

    #[tokio::test]
    async fn open_circuit_bypasses_the_provider() {
        let provider = ScriptedProvider::new(vec![]);
        let facade = facade_with(provider.clone(), 0);
        for _ in 0..5 {
            facade.breaker().record_failure();
        }
        assert_eq!(facade.breaker().state(), CircuitState::Open);
        let analysis = facade.analyze(&evidence()).await;
        assert_eq!(analysis.error_code.as_deref(), Some("CIRCUIT_OPEN"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn prompt_carries_all_evidence_sections() {
        let prompt = build_prompt(&evidence());
        assert!(prompt.contains("{{ user.name }}"));
        assert!(prompt.contains("// file: Card.vue"));
        assert!(prompt.contains("commit('user/SET_PROFILE')"));
    }
}
