use crate::error::{Result, TranscriptError};

use serde::{Deserialize, Serialize};

/// Subtitle timings as parallel arrays: cue `i` starts at `start[i]`, ends
/// at `end[i]` (both in milliseconds) and shows `text[i]`.
///
/// The three arrays always have the same length. Cue ordering and
/// `start <= end` are kept exactly as the source supplied them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTiming")]
pub struct Timing {
    start: Vec<u64>,
    end: Vec<u64>,
    text: Vec<String>,
}

#[derive(Deserialize)]
struct RawTiming {
    start: Vec<u64>,
    end: Vec<u64>,
    text: Vec<String>,
}

impl TryFrom<RawTiming> for Timing {
    type Error = TranscriptError;

    fn try_from(raw: RawTiming) -> Result<Self> {
        Timing::new(raw.start, raw.end, raw.text)
    }
}

impl Timing {
    pub fn new(start: Vec<u64>, end: Vec<u64>, text: Vec<String>) -> Result<Self> {
        if start.len() != end.len() || start.len() != text.len() {
            return Err(TranscriptError::InvalidTiming {
                start: start.len(),
                end: end.len(),
                text: text.len(),
            });
        }
        Ok(Self { start, end, text })
    }

    pub fn empty() -> Self {
        Self {
            start: Vec::new(),
            end: Vec::new(),
            text: Vec::new(),
        }
    }

    pub fn start(&self) -> &[u64] {
        &self.start
    }

    pub fn end(&self) -> &[u64] {
        &self.end
    }

    pub fn text(&self) -> &[String] {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }

    pub fn cues(&self) -> impl Iterator<Item = (u64, u64, &str)> + '_ {
        self.start
            .iter()
            .zip(&self.end)
            .zip(&self.text)
            .map(|((&start, &end), text)| (start, end, text.as_str()))
    }

    /// Builds a new timing with every timestamp passed through `f`.
    pub(crate) fn map_timestamps<F: Fn(u64) -> u64>(&self, f: F) -> Self {
        Self {
            start: self.start.iter().map(|&ts| f(ts)).collect(),
            end: self.end.iter().map(|&ts| f(ts)).collect(),
            text: self.text.clone(),
        }
    }
}

impl FromIterator<(u64, u64, String)> for Timing {
    fn from_iter<I: IntoIterator<Item = (u64, u64, String)>>(iter: I) -> Self {
        let mut timing = Timing::empty();
        for (start, end, text) in iter {
            timing.start.push(start);
            timing.end.push(end);
            timing.text.push(text);
        }
        timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_arrays() {
        let err = Timing::new(vec![0, 1000], vec![500], vec!["a".into(), "b".into()]).unwrap_err();
        match err {
            TranscriptError::InvalidTiming { start, end, text } => {
                assert_eq!((start, end, text), (2, 1, 2))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn keeps_unordered_cues() {
        let timing = Timing::new(vec![5000, 1000], vec![4000, 2000], vec!["b".into(), "a".into()])
            .unwrap();
        let cues: Vec<_> = timing.cues().collect();
        assert_eq!(cues, vec![(5000, 4000, "b"), (1000, 2000, "a")]);
    }

    #[test]
    fn collects_from_cues() {
        let timing: Timing = vec![(0, 10, "x".to_string()), (10, 20, "y".to_string())]
            .into_iter()
            .collect();
        assert_eq!(timing.start(), &[0, 10]);
        assert_eq!(timing.end(), &[10, 20]);
        assert_eq!(timing.text(), &["x".to_string(), "y".to_string()]);
    }
}
