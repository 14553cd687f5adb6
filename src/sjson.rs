//! The `*.srt.sjson` storage form of a [`Timing`]: a JSON object with
//! `start`, `end` and `text` arrays, indented by two spaces so stored
//! assets diff cleanly.

use crate::error::{Result, TranscriptError};
use crate::timing::Timing;

pub const SJSON_MIME_TYPE: &str = "application/json";

pub fn to_sjson(timing: &Timing) -> Vec<u8> {
    // Serialising plain integer and string arrays cannot fail.
    serde_json::to_vec_pretty(timing).unwrap_or_default()
}

pub fn from_sjson(bytes: &[u8]) -> Result<Timing> {
    serde_json::from_slice(bytes)
        .map_err(|err| TranscriptError::MalformedSubtitleSource(format!("invalid sjson: {}", err)))
}
