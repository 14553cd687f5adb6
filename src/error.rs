use crate::store::StoreError;

use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum TranscriptError {
    /// A playback speed that is zero, negative, not finite or not a number,
    /// as the caller wrote it.
    InvalidSpeed(String),
    UnsupportedFormat(String),
    MalformedSubtitleSource(String),
    /// The `start`, `end` and `text` arrays do not describe the same number of cues.
    InvalidTiming {
        start: usize,
        end: usize,
        text: usize,
    },
    NoSourceAvailable,
    SourceNotFound(String),
    Storage(StoreError),
    Records(anyhow::Error),
}

impl Error for TranscriptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TranscriptError::Storage(err) => Some(err),
            TranscriptError::Records(err) => Some(&**err),
            _ => None,
        }
    }
}

impl fmt::Display for TranscriptError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TranscriptError::InvalidSpeed(speed) => {
                write!(fmt, "Invalid playback speed: '{}'", speed)
            }
            TranscriptError::UnsupportedFormat(format) => write!(
                fmt,
                "Unsupported transcript format '{}': only SubRip (*.srt) is supported",
                format
            ),
            TranscriptError::MalformedSubtitleSource(msg) => {
                write!(fmt, "Malformed subtitle source: {}", msg)
            }
            TranscriptError::InvalidTiming { start, end, text } => write!(
                fmt,
                "Mismatched timing arrays (start: {}, end: {}, text: {})",
                start, end, text
            ),
            TranscriptError::NoSourceAvailable => {
                write!(fmt, "No transcripts could be fetched for any speed")
            }
            TranscriptError::SourceNotFound(filename) => {
                write!(fmt, "Transcript asset not found: {}", filename)
            }
            TranscriptError::Storage(_) => write!(fmt, "Asset storage failure"),
            TranscriptError::Records(_) => write!(fmt, "Failed to commit video record"),
        }
    }
}

impl From<StoreError> for TranscriptError {
    fn from(err: StoreError) -> Self {
        TranscriptError::Storage(err)
    }
}

pub type Result<T> = std::result::Result<T, TranscriptError>;
