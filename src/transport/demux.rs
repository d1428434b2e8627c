use std::collections::BTreeMap;

use thiserror::Error;

use super::mux::{FINAL_MARKER, RECORD_SEPARATOR, UNIT_SEPARATOR};
use super::payload::FinalEnvelope;

#[derive(Debug, Error)]
pub enum DemuxError {
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("stream ended before the final results marker")]
    MissingFinal,
    #[error("invalid final payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decoded unit of a multiplexed stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DemuxEvent {
    /// Live text; `provider` is `None` for a single-model stream.
    Text { provider: Option<String>, text: String },
    /// The terminal envelope.
    Final(FinalEnvelope),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    Header,
    Marker,
    Final,
}

/// Client-side decoder accepting arbitrary read boundaries.
///
/// A frame header, a multi-byte character or the final marker may be split
/// over any number of [`push`](Self::push) calls.
#[derive(Debug)]
pub struct Demultiplexer {
    state: State,
    provider: Option<String>,
    text: Vec<u8>,
    header: Vec<u8>,
    tail: Vec<u8>,
}

impl Default for Demultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Demultiplexer {
    pub fn new() -> Self {
        Self {
            state: State::Text,
            provider: None,
            text: Vec::new(),
            header: Vec::new(),
            tail: Vec::new(),
        }
    }

    /// Feeds one physical read and returns the text events it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<DemuxEvent>, DemuxError> {
        let mut events = Vec::new();
        for &byte in chunk {
            match self.state {
                State::Text if byte == RECORD_SEPARATOR => {
                    self.flush_text(&mut events, true);
                    self.header.clear();
                    self.state = State::Header;
                }
                State::Text => self.text.push(byte),
                State::Header => self.push_header(byte)?,
                State::Marker => self.push_marker(byte)?,
                State::Final => self.tail.push(byte),
            }
        }
        if self.state == State::Text {
            self.flush_text(&mut events, false);
        }
        Ok(events)
    }

    /// Ends the stream, returning any leftover text followed by the final envelope.
    pub fn finish(&mut self) -> Result<Vec<DemuxEvent>, DemuxError> {
        let mut events = Vec::new();
        if self.state == State::Text {
            self.flush_text(&mut events, true);
        }
        if self.state != State::Final {
            return Err(DemuxError::MissingFinal);
        }
        let envelope: FinalEnvelope = serde_json::from_slice(&self.tail)?;
        events.push(DemuxEvent::Final(envelope));
        Ok(events)
    }

    fn push_header(&mut self, byte: u8) -> Result<(), DemuxError> {
        match byte {
            b'\n' if self.header.is_empty() => {
                self.header.push(byte);
                self.state = State::Marker;
            }
            UNIT_SEPARATOR => {
                let id = String::from_utf8(std::mem::take(&mut self.header))
                    .map_err(|e| DemuxError::Malformed(format!("provider id is not UTF-8: {e}")))?;
                self.provider = Some(id);
                self.state = State::Text;
            }
            RECORD_SEPARATOR => {
                return Err(DemuxError::Malformed(
                    "record separator inside a frame header".to_string(),
                ))
            }
            _ => self.header.push(byte),
        }
        Ok(())
    }

    fn push_marker(&mut self, byte: u8) -> Result<(), DemuxError> {
        self.header.push(byte);
        let marker = FINAL_MARKER.as_bytes();
        if !marker.starts_with(&self.header) {
            return Err(DemuxError::Malformed(
                "unexpected bytes in final marker".to_string(),
            ));
        }
        if self.header.len() == marker.len() {
            self.state = State::Final;
        }
        Ok(())
    }

    /// Emits buffered text. Unless `complete`, an unfinished UTF-8 sequence
    /// at the end stays buffered for the next read.
    fn flush_text(&mut self, events: &mut Vec<DemuxEvent>, complete: bool) {
        if self.text.is_empty() {
            return;
        }
        let text = match std::str::from_utf8(&self.text) {
            Ok(s) => {
                let s = s.to_string();
                self.text.clear();
                s
            }
            Err(e) if !complete && e.error_len().is_none() => {
                let valid = e.valid_up_to();
                let rest = self.text.split_off(valid);
                let s = String::from_utf8_lossy(&self.text).into_owned();
                self.text = rest;
                s
            }
            Err(_) => {
                let s = String::from_utf8_lossy(&self.text).into_owned();
                self.text.clear();
                s
            }
        };
        if !text.is_empty() {
            events.push(DemuxEvent::Text {
                provider: self.provider.clone(),
                text,
            });
        }
    }
}

/// A fully decoded stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    /// Text of a single-model stream.
    pub untagged: String,
    /// Concatenated text per provider id.
    pub by_provider: BTreeMap<String, String>,
    pub envelope: FinalEnvelope,
}

impl Transcript {
    /// Decodes a complete stream given as a sequence of reads.
    pub fn decode<I, C>(chunks: I) -> Result<Self, DemuxError>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        let mut demux = Demultiplexer::new();
        let mut transcript = Transcript::default();
        for chunk in chunks {
            for event in demux.push(chunk.as_ref())? {
                transcript.apply(event);
            }
        }
        for event in demux.finish()? {
            transcript.apply(event);
        }
        Ok(transcript)
    }

    fn apply(&mut self, event: DemuxEvent) {
        match event {
            DemuxEvent::Text {
                provider: Some(id),
                text,
            } => self.by_provider.entry(id).or_default().push_str(&text),
            DemuxEvent::Text {
                provider: None,
                text,
            } => self.untagged.push_str(&text),
            DemuxEvent::Final(envelope) => self.envelope = envelope,
        }
    }
}
