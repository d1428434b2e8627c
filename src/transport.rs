//! Framing of interleaved provider output over one byte stream.
//!
//! In all-models mode every fragment is written as
//! `RS <provider id> US <text>`; in single-model mode fragments are written
//! as raw text. Both modes end with one terminal frame: `RS`, the
//! [`FINAL_MARKER`] and a JSON envelope `{"result": ...}`. Model text never
//! contains `RS` or `US`: both are stripped before framing.

#[path = "transport/demux.rs"]
mod demux;

#[path = "transport/mux.rs"]
mod mux;

#[path = "transport/payload.rs"]
mod payload;

pub use demux::{DemuxError, DemuxEvent, Demultiplexer, Transcript};
pub use mux::{
    encode_final, encode_fragment, sanitize, FINAL_MARKER, RECORD_SEPARATOR, UNIT_SEPARATOR,
};
pub use payload::{DispatchMode, FinalEnvelope, FinalPayload, FinalResult, ProviderOutcome, NO_DOCUMENT};
