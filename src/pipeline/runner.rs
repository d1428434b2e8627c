use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;

use crate::chat::ChatMessage;
use crate::evaluator::{Candidate, Judge};
use crate::fanout::{FanOut, Fragment, ProviderResponse};
use crate::metrics::{MetricsSink, RecordMetadata, TestType};
use crate::registry::{ProviderEntry, ProviderRegistry};
use crate::retrieval::{plain_prompt, Augmentation, ContextAugmenter};
use crate::transport::{DispatchMode, FinalPayload, FinalResult, ProviderOutcome};

use super::error::PipelineError;
use super::request::{EvaluationRequest, ModelSelector};

/// Providers a validated request will be sent to.
#[derive(Clone)]
pub struct Dispatch {
    pub mode: DispatchMode,
    pub targets: Vec<ProviderEntry>,
}

/// Request pipeline with every collaborator injected.
#[derive(Clone)]
pub struct Pipeline {
    registry: Arc<ProviderRegistry>,
    augmenter: Option<ContextAugmenter>,
    fanout: FanOut,
    judge: Arc<dyn Judge>,
    metrics: MetricsSink,
}

impl Pipeline {
    pub fn new(registry: Arc<ProviderRegistry>, judge: Arc<dyn Judge>, metrics: MetricsSink) -> Self {
        Self {
            registry,
            augmenter: None,
            fanout: FanOut::default(),
            judge,
            metrics,
        }
    }

    pub fn with_augmenter(mut self, augmenter: ContextAugmenter) -> Self {
        self.augmenter = Some(augmenter);
        self
    }

    pub fn with_fanout(mut self, fanout: FanOut) -> Self {
        self.fanout = fanout;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn augmenter(&self) -> Option<&ContextAugmenter> {
        self.augmenter.as_ref()
    }

    pub fn metrics(&self) -> &MetricsSink {
        &self.metrics
    }

    /// Validates the request's model selector against the registry.
    pub fn dispatch(&self, request: &EvaluationRequest) -> Result<Dispatch, PipelineError> {
        let dispatch = match request.selector()? {
            ModelSelector::Single(id) => Dispatch {
                mode: DispatchMode::Single,
                targets: vec![self
                    .registry
                    .get(id.as_str())
                    .cloned()
                    .ok_or_else(|| PipelineError::UnknownModel(id.to_string()))?],
            },
            ModelSelector::All => Dispatch {
                mode: DispatchMode::All,
                targets: self.registry.entries().to_vec(),
            },
        };
        if dispatch.targets.is_empty() {
            return Err(PipelineError::NoProviders);
        }
        if request.document && self.augmenter.is_none() {
            return Err(PipelineError::RetrievalUnavailable);
        }
        Ok(dispatch)
    }

    /// Validates and runs a request. See [`Pipeline::execute`].
    pub async fn run(
        &self,
        request: &EvaluationRequest,
        owner: &str,
        fragments: mpsc::Sender<Fragment>,
    ) -> Result<FinalResult, PipelineError> {
        let dispatch = self.dispatch(request)?;
        self.execute(dispatch, request, owner, fragments).await
    }

    /// Streams every target's output into `fragments`, then judges and records
    /// each response.
    ///
    /// The sender is dropped as soon as streaming ends, so a reader of the
    /// channel sees it close before the evaluation phase starts.
    pub async fn execute(
        &self,
        dispatch: Dispatch,
        request: &EvaluationRequest,
        owner: &str,
        fragments: mpsc::Sender<Fragment>,
    ) -> Result<FinalResult, PipelineError> {
        let system_prompt = match self.effective_prompt(request).await? {
            Augmentation::Prompt(prompt) => prompt,
            Augmentation::NoContext => return Ok(FinalResult::NoDocument),
        };
        let messages = ChatMessage::exchange(system_prompt, request.user_prompt.as_str());

        let tagged = dispatch.mode == DispatchMode::All;
        let fan = self
            .fanout
            .run(&dispatch.targets, &messages, tagged, &fragments)
            .await;
        drop(fragments);

        let results = join_all(
            fan.responses
                .iter()
                .map(|response| self.evaluate(request, owner, response)),
        )
        .await;

        let stored = results.iter().filter(|r| r.metrics_id.is_some()).count();
        log::info!(
            "Evaluated {} provider(s), stored {stored} record(s){}",
            results.len(),
            if fan.timed_out { ", deadline reached" } else { "" }
        );

        Ok(FinalResult::Completed(FinalPayload {
            mode: dispatch.mode,
            timed_out: fan.timed_out,
            results,
        }))
    }

    async fn effective_prompt(&self, request: &EvaluationRequest) -> Result<Augmentation, PipelineError> {
        match (&self.augmenter, request.document) {
            (Some(augmenter), document) => augmenter
                .augment(&request.system_prompt, &request.user_prompt, document)
                .await
                .map_err(PipelineError::Retrieval),
            (None, false) => Ok(Augmentation::Prompt(plain_prompt(&request.system_prompt))),
            (None, true) => Err(PipelineError::RetrievalUnavailable),
        }
    }

    async fn evaluate(
        &self,
        request: &EvaluationRequest,
        owner: &str,
        response: &ProviderResponse,
    ) -> ProviderOutcome {
        let provider_id = response.provider_id.as_str();
        let mut outcome = ProviderOutcome {
            provider_id: response.provider_id.clone(),
            provider_name: self.registry.provider_name(provider_id).to_string(),
            status: response.status,
            error: response.error.clone(),
            response: response.text.clone(),
            evaluation: None,
            metrics_id: None,
            evaluation_error: None,
        };
        if !response.is_evaluable() {
            return outcome;
        }

        let text = response.evaluation_text();
        outcome.response = text.to_string();
        let candidate = Candidate {
            system_prompt: &request.system_prompt,
            user_prompt: &request.user_prompt,
            expected_output: &request.expected_output,
            response: text,
        };
        let scores = match self.judge.evaluate(&candidate).await {
            Ok(scores) => scores,
            Err(err) => {
                log::warn!("Evaluation of {provider_id} failed: {err}");
                outcome.evaluation_error = Some(err.to_string());
                return outcome;
            }
        };

        let metadata = RecordMetadata {
            owner,
            provider_id,
            system_prompt: &request.system_prompt,
            user_prompt: &request.user_prompt,
            expected_output: &request.expected_output,
            response: text,
            test_type: TestType::from_document_flag(request.document),
        };
        match self.metrics.record(metadata, scores.clone()).await {
            Ok(id) => outcome.metrics_id = Some(id),
            Err(err) => {
                log::warn!("Storing metrics for {provider_id} failed: {err}");
                outcome.evaluation_error = Some(format!("Failed to store metrics: {err}"));
            }
        }
        outcome.evaluation = Some(scores);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::fanout::{ProviderStatus, FAILED_RESPONSE_TEXT};
    use crate::metrics::{InMemoryMetricsStore, MetricsStore};
    use crate::test_support::{FixedJudge, Script, ScriptedProvider};

    struct Harness {
        pipeline: Pipeline,
        store: Arc<InMemoryMetricsStore>,
        judge: Arc<FixedJudge>,
    }

    fn harness(scripts: Vec<(&str, &str, Script)>, judge: FixedJudge) -> Harness {
        let mut registry = ProviderRegistry::new();
        for (id, name, script) in scripts {
            registry
                .insert(id, name, Arc::new(ScriptedProvider::new(script)))
                .unwrap();
        }
        let registry = Arc::new(registry);
        let store = Arc::new(InMemoryMetricsStore::new());
        let judge = Arc::new(judge);
        let pipeline = Pipeline::new(
            registry.clone(),
            judge.clone(),
            MetricsSink::new(store.clone(), registry),
        )
        .with_fanout(FanOut::new(Duration::from_secs(5)));
        Harness {
            pipeline,
            store,
            judge,
        }
    }

    fn request(model: &str) -> EvaluationRequest {
        EvaluationRequest {
            system_prompt: "You are concise.".to_string(),
            user_prompt: "2+2?".to_string(),
            expected_output: "4".to_string(),
            model: model.to_string(),
            document: false,
        }
    }

    async fn run(h: &Harness, request: &EvaluationRequest) -> (FinalResult, Vec<Fragment>) {
        let (tx, mut rx) = mpsc::channel(64);
        let result = h.pipeline.run(request, "user-1", tx).await.unwrap();
        let mut fragments = Vec::new();
        while let Some(f) = rx.recv().await {
            fragments.push(f);
        }
        (result, fragments)
    }

    fn payload(result: FinalResult) -> FinalPayload {
        match result {
            FinalResult::Completed(payload) => payload,
            FinalResult::NoDocument => panic!("unexpected no-document result"),
        }
    }

    #[tokio::test]
    async fn single_model_run_records_metrics() {
        let h = harness(
            vec![("provider-a", "A", Script::fragments(&["The answer ", "is 4."]))],
            FixedJudge::default(),
        );
        let (result, fragments) = run(&h, &request("provider-a")).await;
        let payload = payload(result);

        assert_eq!(payload.mode, DispatchMode::Single);
        assert!(fragments.iter().all(|f| f.provider.is_none()));
        let outcome = payload.outcome("provider-a").unwrap();
        assert_eq!(outcome.response, "The answer is 4.");
        assert!(outcome.evaluation.is_some());

        let listed = h.store.list("user-1", None).await.unwrap();
        assert_eq!(listed[0].entry.user_prompt, "2+2?");
        assert_eq!(listed[0].entry.system_prompt, "You are concise.");
        assert_eq!(listed[0].entry.model_provider, "A");
        assert_eq!(Some(listed[0].id), outcome.metrics_id);
    }

    #[tokio::test]
    async fn all_models_isolates_a_failing_provider() {
        let h = harness(
            vec![
                ("a", "A", Script::fragments(&["4"])),
                ("b", "B", Script::fail_before_stream("503")),
                ("c", "C", Script::fragments(&["four"])),
            ],
            FixedJudge::default(),
        );
        let (result, fragments) = run(&h, &request("all")).await;
        let payload = payload(result);

        assert_eq!(payload.mode, DispatchMode::All);
        assert!(fragments.iter().all(|f| f.provider.is_some()));
        let failed = payload.outcome("b").unwrap();
        assert_eq!(failed.status, ProviderStatus::Failed);
        assert_eq!(failed.response, FAILED_RESPONSE_TEXT);
        assert!(payload.outcome("a").unwrap().metrics_id.is_some());
        assert!(payload.outcome("c").unwrap().metrics_id.is_some());

        assert!(h.judge.seen().contains(&FAILED_RESPONSE_TEXT.to_string()));
        assert_eq!(h.store.list("user-1", None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn evaluation_failure_skips_only_that_record() {
        let h = harness(
            vec![
                ("a", "A", Script::fragments(&["good"])),
                ("b", "B", Script::fragments(&["unjudgeable"])),
            ],
            FixedJudge::failing_on("unjudgeable"),
        );
        let (result, _) = run(&h, &request("all")).await;
        let payload = payload(result);

        let bad = payload.outcome("b").unwrap();
        assert!(bad.evaluation.is_none());
        assert!(bad.metrics_id.is_none());
        assert!(bad.evaluation_error.as_deref().unwrap().contains("Invalid evaluation JSON"));

        let listed = h.store.list("user-1", None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].entry.model_name, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_providers_are_reported_not_judged() {
        let h = harness(
            vec![
                ("fast", "Fast", Script::fragments(&["4"])),
                ("slow", "Slow", Script::stall_after(&["thinking"])),
            ],
            FixedJudge::default(),
        );
        let (result, _) = run(&h, &request("all")).await;
        let payload = payload(result);

        assert!(payload.timed_out);
        let slow = payload.outcome("slow").unwrap();
        assert_eq!(slow.status, ProviderStatus::TimedOut);
        assert_eq!(slow.response, "thinking");
        assert!(slow.evaluation.is_none());
        assert_eq!(h.judge.seen(), vec!["4".to_string()]);
    }

    #[tokio::test]
    async fn unknown_model_is_rejected_before_dispatch() {
        let h = harness(vec![("a", "A", Script::fragments(&["4"]))], FixedJudge::default());
        let err = h.pipeline.dispatch(&request("llama-3")).err().unwrap();
        assert!(matches!(err, PipelineError::UnknownModel(ref m) if m == "llama-3"));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn document_mode_without_retrieval_is_rejected() {
        let h = harness(vec![("a", "A", Script::fragments(&["4"]))], FixedJudge::default());
        let mut req = request("a");
        req.document = true;
        assert!(matches!(
            h.pipeline.dispatch(&req),
            Err(PipelineError::RetrievalUnavailable)
        ));
    }

    #[tokio::test]
    async fn empty_index_returns_no_document_without_judging() {
        use crate::embedding::EmbeddingProvider;
        use crate::error::LLMError;
        use crate::retrieval::InMemoryVectorIndex;

        struct Constant;

        #[async_trait::async_trait]
        impl EmbeddingProvider for Constant {
            async fn embed(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError> {
                Ok(input.iter().map(|_| vec![1.0, 0.0]).collect())
            }
        }

        let mut h = harness(vec![("a", "A", Script::fragments(&["4"]))], FixedJudge::default());
        h.pipeline = h.pipeline.with_augmenter(ContextAugmenter::new(
            Arc::new(Constant),
            Arc::new(InMemoryVectorIndex::new()),
        ));
        let mut req = request("a");
        req.document = true;

        let (result, fragments) = run(&h, &req).await;
        assert_eq!(result, FinalResult::NoDocument);
        assert!(fragments.is_empty());
        assert!(h.judge.seen().is_empty());
        assert!(h.store.list("user-1", None).await.unwrap().is_empty());
    }
}
