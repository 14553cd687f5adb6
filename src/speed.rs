use crate::error::{Result, TranscriptError};

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A playback-rate multiplier. Always positive and finite.
///
/// Speeds key ordered maps, so they carry a total order; iteration over a
/// `BTreeMap<Speed, _>` runs from the slowest to the fastest speed.
#[derive(Debug, Clone, Copy)]
pub struct Speed(f64);

impl Speed {
    pub const NORMAL: Speed = Speed(1.0);

    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && value > 0.0 {
            Ok(Speed(value))
        } else {
            Err(TranscriptError::InvalidSpeed(value.to_string()))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for Speed {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Speed {}

impl PartialOrd for Speed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Speed {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        // Keep a trailing `.0` on whole speeds so "1.0" reads as a rate.
        if self.0.fract() == 0.0 {
            write!(fmt, "{:.1}", self.0)
        } else {
            write!(fmt, "{}", self.0)
        }
    }
}

impl FromStr for Speed {
    type Err = TranscriptError;

    fn from_str(s: &str) -> Result<Self> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| TranscriptError::InvalidSpeed(s.trim().to_string()))?;
        Speed::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn rejects_non_positive_speeds() {
        for value in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Speed::new(value),
                Err(TranscriptError::InvalidSpeed(_))
            ));
        }
    }

    #[test]
    fn orders_speeds_ascending() {
        let mut map = BTreeMap::new();
        for value in [1.5, 0.75, 1.25, 1.0] {
            map.insert(Speed::new(value).unwrap(), value);
        }
        let order: Vec<f64> = map.values().copied().collect();
        assert_eq!(order, vec![0.75, 1.0, 1.25, 1.5]);
    }

    #[test]
    fn parses_and_displays() {
        assert_eq!("0.75".parse::<Speed>().unwrap().value(), 0.75);
        assert_eq!(Speed::NORMAL.to_string(), "1.0");
        assert_eq!(Speed::new(1.25).unwrap().to_string(), "1.25");
        assert!("0".parse::<Speed>().is_err());
    }

    #[test]
    fn invalid_speed_names_the_input() {
        let err = "fast".parse::<Speed>().unwrap_err();
        assert!(matches!(&err, TranscriptError::InvalidSpeed(s) if s == "fast"));
        assert_eq!(err.to_string(), "Invalid playback speed: 'fast'");
        assert_eq!(
            Speed::new(-0.5).unwrap_err().to_string(),
            "Invalid playback speed: '-0.5'"
        );
    }
}
