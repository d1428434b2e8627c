use bytes::Bytes;
use futures::stream::{self, StreamExt};

use crate::error::LLMError;

use super::traits::TextStream;

const SSE_DELIMITER: &str = "\n\n";

/// Turns a server-sent-events response into a stream of text fragments.
///
/// `parser` receives each complete event and returns the text it carries, if
/// any. Events split across network reads and multi-byte characters split
/// across reads are reassembled before parsing. A trailing event without the
/// final blank line is still delivered when the body ends.
pub(crate) fn create_sse_stream<F>(response: reqwest::Response, parser: F) -> TextStream
where
    F: Fn(&str) -> Result<Option<String>, LLMError> + Send + Sync + 'static,
{
    let chunks = response.bytes_stream().map(Some).chain(stream::once(async { None }));
    let stream = chunks
        .scan(SseState::default(), move |state, chunk| {
            let results = match chunk {
                Some(chunk) => handle_chunk(state, chunk, &parser),
                None => state.flush(&parser),
            };
            async move { Some(results) }
        })
        .flat_map(stream::iter);

    Box::pin(stream)
}

/// Extracts the `data:` payload of one SSE event, joining multi-line data.
pub(crate) fn event_data(event: &str) -> Option<String> {
    let lines: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();
    if lines.is_empty() {
        return None;
    }
    Some(lines.join("\n"))
}

#[derive(Default)]
struct SseState {
    buffer: String,
    utf8_buffer: Vec<u8>,
}

fn handle_chunk<F>(
    state: &mut SseState,
    chunk: Result<Bytes, reqwest::Error>,
    parser: &F,
) -> Vec<Result<String, LLMError>>
where
    F: Fn(&str) -> Result<Option<String>, LLMError>,
{
    let bytes = match chunk {
        Ok(bytes) => bytes,
        Err(err) => return vec![Err(LLMError::HttpError(err.to_string()))],
    };

    state.push_bytes(&bytes);
    state.drain_events(parser)
}

impl SseState {
    fn push_bytes(&mut self, bytes: &[u8]) {
        self.utf8_buffer.extend_from_slice(bytes);
        match std::str::from_utf8(&self.utf8_buffer) {
            Ok(text) => {
                let text = text.to_owned();
                self.utf8_buffer.clear();
                self.push_text(&text);
            }
            Err(err) => self.consume_valid_prefix(err.valid_up_to()),
        }
    }

    fn push_text(&mut self, text: &str) {
        self.buffer.push_str(text);
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }
    }

    fn consume_valid_prefix(&mut self, valid_up_to: usize) {
        if valid_up_to == 0 {
            return;
        }

        let valid = String::from_utf8_lossy(&self.utf8_buffer[..valid_up_to]).into_owned();
        self.push_text(&valid);
        self.utf8_buffer.drain(..valid_up_to);
    }

    fn drain_events<F>(&mut self, parser: &F) -> Vec<Result<String, LLMError>>
    where
        F: Fn(&str) -> Result<Option<String>, LLMError>,
    {
        let mut results = Vec::new();
        while let Some(event) = self.next_event() {
            parse_into(&event, parser, &mut results);
        }
        results
    }

    fn flush<F>(&mut self, parser: &F) -> Vec<Result<String, LLMError>>
    where
        F: Fn(&str) -> Result<Option<String>, LLMError>,
    {
        let mut results = self.drain_events(parser);
        let rest = std::mem::take(&mut self.buffer);
        if !rest.trim().is_empty() {
            parse_into(&rest, parser, &mut results);
        }
        results
    }

    fn next_event(&mut self) -> Option<String> {
        let pos = self.buffer.find(SSE_DELIMITER)?;
        let end = pos + SSE_DELIMITER.len();
        let event = self.buffer[..end].to_string();
        self.buffer.drain(..end);
        Some(event)
    }
}

fn parse_into<F>(event: &str, parser: &F, results: &mut Vec<Result<String, LLMError>>)
where
    F: Fn(&str) -> Result<Option<String>, LLMError>,
{
    match parser(event) {
        Ok(Some(content)) if !content.is_empty() => results.push(Ok(content)),
        Ok(_) => {}
        Err(err) => results.push(Err(err)),
    }
}

#[cfg(test)]
#[path = "sse_tests.rs"]
mod tests;
