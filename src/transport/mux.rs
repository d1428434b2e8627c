use std::borrow::Cow;

use bytes::{BufMut, Bytes, BytesMut};

use crate::fanout::Fragment;

use super::payload::FinalEnvelope;

/// Starts every frame header.
pub const RECORD_SEPARATOR: u8 = 0x1E;
/// Ends a provider header; the fragment text follows.
pub const UNIT_SEPARATOR: u8 = 0x1F;
/// Separates live content from the terminal JSON envelope.
pub const FINAL_MARKER: &str = "\n\nFINAL_RESULTS:";

/// Removes the framing bytes from model text.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    let is_framing = |c: char| c == RECORD_SEPARATOR as char || c == UNIT_SEPARATOR as char;
    if text.contains(is_framing) {
        Cow::Owned(text.chars().filter(|c| !is_framing(*c)).collect())
    } else {
        Cow::Borrowed(text)
    }
}

/// Serializes one fragment; tagged fragments get a provider header.
pub fn encode_fragment(fragment: &Fragment) -> Bytes {
    let text = sanitize(&fragment.text);
    match &fragment.provider {
        Some(provider) => {
            let id = provider.as_str();
            let mut buf = BytesMut::with_capacity(id.len() + text.len() + 2);
            buf.put_u8(RECORD_SEPARATOR);
            buf.put_slice(id.as_bytes());
            buf.put_u8(UNIT_SEPARATOR);
            buf.put_slice(text.as_bytes());
            buf.freeze()
        }
        None => Bytes::from(text.into_owned()),
    }
}

/// Serializes the terminal frame.
pub fn encode_final(envelope: &FinalEnvelope) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_vec(envelope)?;
    let mut buf = BytesMut::with_capacity(json.len() + FINAL_MARKER.len() + 1);
    buf.put_u8(RECORD_SEPARATOR);
    buf.put_slice(FINAL_MARKER.as_bytes());
    buf.put_slice(&json);
    Ok(buf.freeze())
}
