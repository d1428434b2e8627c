use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;

use crate::{chat::ChatMessage, error::LLMError, registry::ProviderEntry, transport::sanitize};

use super::types::{FanOutResult, Fragment, ProviderResponse, ProviderStatus};

/// Default bound on the whole fan-out.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(50);

/// Streams one prompt from several providers concurrently under a single deadline.
///
/// All adapters are polled on the calling task. Fragments are forwarded to the
/// sink as they arrive, so output of different providers interleaves while each
/// provider's own fragments keep their order. When the deadline fires first,
/// the unfinished adapters are dropped (cancelling their requests) and
/// reported as [`ProviderStatus::TimedOut`].
#[derive(Debug, Clone)]
pub struct FanOut {
    deadline: Duration,
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new(DEFAULT_DEADLINE)
    }
}

impl FanOut {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Runs every target against `messages`.
    ///
    /// With `tagged` set, each fragment carries its provider id. A closed sink
    /// does not stop the run; fragments are then only accumulated.
    pub async fn run(
        &self,
        targets: &[ProviderEntry],
        messages: &[ChatMessage],
        tagged: bool,
        sink: &mpsc::Sender<Fragment>,
    ) -> FanOutResult {
        let mut buffers = vec![String::new(); targets.len()];
        let mut outcomes: Vec<Option<(Result<(), LLMError>, u128)>> =
            (0..targets.len()).map(|_| None).collect();
        let mut timed_out = false;

        {
            let mut pending: FuturesUnordered<_> = targets
                .iter()
                .zip(buffers.iter_mut())
                .enumerate()
                .map(|(idx, (entry, buffer))| async move {
                    let start = Instant::now();
                    let result = stream_adapter(entry, messages, tagged, sink, buffer).await;
                    (idx, result, start.elapsed().as_millis())
                })
                .collect();

            let deadline = tokio::time::sleep(self.deadline);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    biased;
                    next = pending.next() => match next {
                        Some((idx, result, elapsed)) => outcomes[idx] = Some((result, elapsed)),
                        None => break,
                    },
                    _ = &mut deadline => {
                        timed_out = true;
                        log::warn!(
                            "Fan-out deadline of {:?} reached with {} provider(s) still streaming",
                            self.deadline,
                            pending.len()
                        );
                        break;
                    }
                }
            }
        }

        let responses = targets
            .iter()
            .zip(buffers)
            .zip(outcomes)
            .map(|((entry, text), outcome)| self.build_response(entry, text, outcome))
            .collect();

        FanOutResult {
            responses,
            timed_out,
        }
    }

    fn build_response(
        &self,
        entry: &ProviderEntry,
        text: String,
        outcome: Option<(Result<(), LLMError>, u128)>,
    ) -> ProviderResponse {
        let (status, error, elapsed_ms) = match outcome {
            Some((Ok(()), elapsed)) if !text.is_empty() => (ProviderStatus::Completed, None, elapsed),
            Some((Ok(()), elapsed)) => {
                log::warn!("Provider {} returned an empty response", entry.id);
                (
                    ProviderStatus::Failed,
                    Some("Provider returned an empty response".to_string()),
                    elapsed,
                )
            }
            Some((Err(err), elapsed)) => {
                log::warn!("Error from provider {}: {err}", entry.id);
                (ProviderStatus::Failed, Some(err.to_string()), elapsed)
            }
            None => (
                ProviderStatus::TimedOut,
                Some(format!("Timed out after {:?}", self.deadline)),
                self.deadline.as_millis(),
            ),
        };

        ProviderResponse {
            provider_id: entry.id.clone(),
            text,
            status,
            error,
            elapsed_ms,
        }
    }
}

async fn stream_adapter(
    entry: &ProviderEntry,
    messages: &[ChatMessage],
    tagged: bool,
    sink: &mpsc::Sender<Fragment>,
    buffer: &mut String,
) -> Result<(), LLMError> {
    let mut stream = entry.provider.chat_stream(messages).await?;
    while let Some(piece) = stream.next().await {
        let piece = piece?;
        let piece = sanitize(&piece).into_owned();
        if piece.is_empty() {
            continue;
        }
        buffer.push_str(&piece);

        if sink.is_closed() {
            continue;
        }
        let fragment = Fragment {
            provider: tagged.then(|| entry.id.clone()),
            text: piece,
        };
        if sink.send(fragment).await.is_err() {
            log::debug!("Receiver closed; {} keeps accumulating without forwarding", entry.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::fanout::FAILED_RESPONSE_TEXT;
    use crate::registry::ProviderRegistry;
    use crate::transport::{encode_final, encode_fragment, FinalEnvelope, Transcript};
    use crate::test_support::{Script, ScriptedProvider};

    fn registry(scripts: Vec<(&str, Script)>) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        for (id, script) in scripts {
            registry
                .insert(id, id.to_uppercase(), Arc::new(ScriptedProvider::new(script)))
                .unwrap();
        }
        registry
    }

    async fn drain(mut rx: mpsc::Receiver<Fragment>) -> Vec<Fragment> {
        let mut out = Vec::new();
        while let Some(fragment) = rx.recv().await {
            out.push(fragment);
        }
        out
    }

    #[tokio::test]
    async fn single_provider_fragments_are_untagged() {
        let registry = registry(vec![("a", Script::fragments(&["2+2", " is ", "4"]))]);
        let (tx, rx) = mpsc::channel(16);
        let messages = ChatMessage::exchange("sys", "2+2?");

        let result = FanOut::default()
            .run(registry.entries(), &messages, false, &tx)
            .await;
        drop(tx);
        let fragments = drain(rx).await;

        assert!(!result.timed_out);
        assert_eq!(result.responses[0].status, ProviderStatus::Completed);
        assert_eq!(result.responses[0].text, "2+2 is 4");
        assert!(fragments.iter().all(|f| f.provider.is_none()));
        assert_eq!(fragments.len(), 3);
    }

    #[tokio::test]
    async fn failures_are_isolated_from_siblings() {
        let registry = registry(vec![
            ("a", Script::fragments(&["alpha"])),
            ("b", Script::fail_before_stream("boom")),
            ("c", Script::fragments(&["gam", "ma"])),
        ]);
        let (tx, rx) = mpsc::channel(16);
        let messages = ChatMessage::exchange("sys", "q");

        let result = FanOut::default()
            .run(registry.entries(), &messages, true, &tx)
            .await;
        drop(tx);
        let _ = drain(rx).await;

        let by_id: HashMap<&str, &ProviderResponse> = result
            .responses
            .iter()
            .map(|r| (r.provider_id.as_str(), r))
            .collect();
        assert_eq!(by_id["a"].status, ProviderStatus::Completed);
        assert_eq!(by_id["c"].text, "gamma");
        assert_eq!(by_id["b"].status, ProviderStatus::Failed);
        assert_eq!(by_id["b"].evaluation_text(), FAILED_RESPONSE_TEXT);
        assert!(by_id["b"].error.as_deref().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_streamed_text_but_fails() {
        let registry = registry(vec![("a", Script::fail_after(&["par"], "reset"))]);
        let (tx, _rx) = mpsc::channel(16);
        let messages = ChatMessage::exchange("sys", "q");

        let result = FanOut::default()
            .run(registry.entries(), &messages, false, &tx)
            .await;

        let response = &result.responses[0];
        assert_eq!(response.status, ProviderStatus::Failed);
        assert_eq!(response.text, "par");
        assert_eq!(response.evaluation_text(), FAILED_RESPONSE_TEXT);
    }

    #[tokio::test]
    async fn empty_stream_is_a_failure() {
        let registry = registry(vec![("a", Script::fragments(&[]))]);
        let (tx, _rx) = mpsc::channel(4);
        let messages = ChatMessage::exchange("sys", "q");

        let result = FanOut::default()
            .run(registry.entries(), &messages, false, &tx)
            .await;

        assert_eq!(result.responses[0].status, ProviderStatus::Failed);
        assert_eq!(result.responses[0].evaluation_text(), FAILED_RESPONSE_TEXT);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_stragglers() {
        let registry = registry(vec![
            ("fast", Script::fragments(&["done"])),
            ("slow", Script::stall_after(&["partial"])),
        ]);
        let (tx, rx) = mpsc::channel(16);
        let messages = ChatMessage::exchange("sys", "q");

        let result = FanOut::new(Duration::from_secs(5))
            .run(registry.entries(), &messages, true, &tx)
            .await;
        drop(tx);
        let fragments = drain(rx).await;

        assert!(result.timed_out);
        assert_eq!(result.responses[0].status, ProviderStatus::Completed);
        assert_eq!(result.responses[1].status, ProviderStatus::TimedOut);
        assert_eq!(result.responses[1].text, "partial");
        assert!(!result.responses[1].is_evaluable());
        assert_eq!(fragments.len(), 2);
    }

    #[tokio::test]
    async fn closed_sink_still_accumulates() {
        let registry = registry(vec![("a", Script::fragments(&["x", "y"]))]);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let messages = ChatMessage::exchange("sys", "q");

        let result = FanOut::default()
            .run(registry.entries(), &messages, false, &tx)
            .await;

        assert_eq!(result.responses[0].text, "xy");
        assert_eq!(result.responses[0].status, ProviderStatus::Completed);
    }

    #[tokio::test]
    async fn framing_bytes_never_reach_buffer_or_sink() {
        let registry = registry(vec![
            ("a", Script::fragments(&["x\u{1e}y", "\u{1f}"])),
            ("b", Script::fragments(&["z"])),
        ]);
        let (tx, rx) = mpsc::channel(16);
        let messages = ChatMessage::exchange("sys", "q");

        let result = FanOut::default()
            .run(registry.entries(), &messages, true, &tx)
            .await;
        drop(tx);
        let fragments = drain(rx).await;

        let wire: Vec<_> = fragments.iter().map(encode_fragment).collect();
        let transcript = Transcript::decode(
            wire.into_iter()
                .chain(std::iter::once(encode_final(&FinalEnvelope::default()).unwrap())),
        )
        .unwrap();

        assert_eq!(result.responses[0].text, "xy");
        assert_eq!(transcript.by_provider["a"], result.responses[0].text);
        assert_eq!(transcript.by_provider["b"], "z");
        // the fragment made only of a separator is dropped entirely
        assert_eq!(fragments.iter().filter(|f| f.text.is_empty()).count(), 0);
    }
}
