use crate::captions::{parse_timed_text, CaptionFetcher};
use crate::error::{Result, TranscriptError};
use crate::naming::Transcripts;
use crate::parser::parse_source;
use crate::record::VideoRecord;
use crate::rescale::rescale;
use crate::speed::Speed;
use crate::timing::Timing;

use std::collections::{BTreeMap, BTreeSet};

use anyhow::bail;
use tracing::{debug, error, info, warn};

/// What [`Transcripts::generate_from_remote`] did for each requested speed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisReport {
    /// Highest speed fetched successfully; every other asset derives from it.
    pub canonical_speed: Speed,
    /// Speeds whose captions were fetched from the service.
    pub fetched: BTreeSet<Speed>,
    /// Speeds whose fetch failed.
    pub failed: BTreeSet<Speed>,
    /// Speeds with no source id.
    pub skipped: BTreeSet<Speed>,
    /// Every asset written, by speed, with the id it was written under.
    pub persisted: BTreeMap<Speed, String>,
}

impl SynthesisReport {
    /// Speeds whose asset was rescaled from the canonical source rather than
    /// written as fetched.
    pub fn synthesized(&self) -> impl Iterator<Item = Speed> + '_ {
        self.persisted
            .keys()
            .copied()
            .filter(move |&speed| speed != self.canonical_speed)
    }
}

fn fetch_timing(fetcher: &dyn CaptionFetcher, source_id: &str) -> anyhow::Result<Timing> {
    let response = fetcher.fetch(source_id)?;
    if !response.is_usable() {
        bail!("captioning service answered with status {}", response.status);
    }
    let timing = parse_timed_text(&response.body)?;
    if timing.is_empty() {
        bail!("captioning service returned no subtitles");
    }
    Ok(timing)
}

impl Transcripts<'_> {
    /// Fetches captions for every speed that has a source id and writes an
    /// asset for each of them.
    ///
    /// Speeds are tried from slowest to fastest. The fastest successful
    /// fetch becomes the canonical source: it is stored as fetched, and all
    /// other speeds, fetched or not, are rescaled from it. Rescaling down
    /// from the fastest rate only ever multiplies by a factor below one.
    pub fn generate_from_remote(
        &self,
        fetcher: &dyn CaptionFetcher,
        sources: &BTreeMap<Speed, String>,
        record: &VideoRecord,
    ) -> Result<SynthesisReport> {
        let mut fetched = BTreeSet::new();
        let mut failed = BTreeSet::new();
        let mut skipped = BTreeSet::new();
        let mut canonical = None;

        for (&speed, source_id) in sources {
            if source_id.is_empty() {
                skipped.insert(speed);
                continue;
            }
            match fetch_timing(fetcher, source_id) {
                Ok(timing) => {
                    debug!(%speed, source_id = %source_id, cues = timing.len(), "fetched captions");
                    fetched.insert(speed);
                    canonical = Some((speed, timing));
                }
                Err(err) => {
                    warn!(%speed, source_id = %source_id, "Can't receive transcripts: {:#}", err);
                    failed.insert(speed);
                }
            }
        }

        let (canonical_speed, canonical_timing) = match canonical {
            Some(canonical) => canonical,
            None => {
                error!("Can't find any transcripts on the captioning service.");
                return Err(TranscriptError::NoSourceAvailable);
            }
        };
        let canonical_id = &sources[&canonical_speed];

        let mut persisted = BTreeMap::new();
        self.save_subs(&canonical_timing, canonical_id, &record.scope)?;
        info!(
            "transcripts for source {} (speed {}) are downloaded and saved",
            canonical_id, canonical_speed
        );
        persisted.insert(canonical_speed, canonical_id.clone());

        for (&speed, subs_id) in sources {
            if speed == canonical_speed || skipped.contains(&speed) {
                continue;
            }
            let timing = rescale(&canonical_timing, canonical_speed, speed);
            self.save_subs(&timing, subs_id, &record.scope)?;
            info!(
                "transcripts for source {} (speed {}) are generated from source {} (speed {}) and saved",
                subs_id, speed, canonical_id, canonical_speed
            );
            persisted.insert(speed, subs_id.clone());
        }

        Ok(SynthesisReport {
            canonical_speed,
            fetched,
            failed,
            skipped,
            persisted,
        })
    }

    /// Parses an uploaded transcript, taken to be at speed 1.0, writes a
    /// rescaled copy for every target speed and returns the parsed timings.
    pub fn generate_from_upload(
        &self,
        format: &str,
        raw: &[u8],
        targets: &BTreeMap<Speed, String>,
        record: &VideoRecord,
    ) -> Result<Timing> {
        let timing = parse_source(format, raw)?;

        for (&speed, subs_id) in targets {
            if subs_id.is_empty() {
                debug!(%speed, "no transcript id for speed, skipping");
                continue;
            }
            self.save_subs(&rescale(&timing, Speed::NORMAL, speed), subs_id, &record.scope)?;
            info!("transcripts {} (speed {}) generated from upload", subs_id, speed);
        }

        Ok(timing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::CaptionResponse;
    use crate::record::MemoryRecordStore;
    use crate::store::{CourseScope, MemoryStore};

    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Answers from a fixed table and remembers the order of requests.
    #[derive(Default)]
    struct ScriptedFetcher {
        responses: HashMap<String, CaptionResponse>,
        requests: RefCell<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn respond(mut self, source_id: &str, status: u16, body: &str) -> Self {
            self.responses.insert(
                source_id.to_string(),
                CaptionResponse {
                    status,
                    body: body.to_string(),
                },
            );
            self
        }
    }

    impl CaptionFetcher for ScriptedFetcher {
        fn fetch(&self, source_id: &str) -> anyhow::Result<CaptionResponse> {
            self.requests.borrow_mut().push(source_id.to_string());
            match self.responses.get(source_id) {
                Some(response) => Ok(response.clone()),
                None => bail!("connection refused"),
            }
        }
    }

    const FAST_CAPTIONS: &str = r#"<transcript>
<text start="1" dur="1">first</text>
<text start="3" dur="1.5">second</text>
</transcript>"#;

    const SLOW_CAPTIONS: &str = r#"<transcript>
<text start="0.6" dur="0.6">slow first</text>
</transcript>"#;

    fn speed(value: f64) -> Speed {
        Speed::new(value).unwrap()
    }

    fn record() -> VideoRecord {
        VideoRecord {
            id: "video_1".to_string(),
            scope: CourseScope::new("MITx", "999"),
            sub: String::new(),
            youtube_id_1_0: String::new(),
            html5_sources: Vec::new(),
        }
    }

    fn sources(entries: &[(f64, &str)]) -> BTreeMap<Speed, String> {
        entries
            .iter()
            .map(|&(value, id)| (speed(value), id.to_string()))
            .collect()
    }

    #[test]
    fn highest_successful_speed_is_canonical() {
        let assets = MemoryStore::new();
        let records = MemoryRecordStore::new();
        let transcripts = Transcripts::new(&assets, &records);
        let fetcher = ScriptedFetcher::default()
            .respond("slow_id", 200, SLOW_CAPTIONS)
            .respond("normal_id", 404, "")
            .respond("fast_id", 200, FAST_CAPTIONS);
        let sources = sources(&[(0.75, "slow_id"), (1.0, "normal_id"), (1.25, "fast_id")]);

        let report = transcripts
            .generate_from_remote(&fetcher, &sources, &record())
            .unwrap();

        assert_eq!(*fetcher.requests.borrow(), vec!["slow_id", "normal_id", "fast_id"]);
        assert_eq!(report.canonical_speed, speed(1.25));
        assert_eq!(report.fetched, [speed(0.75), speed(1.25)].into_iter().collect::<BTreeSet<_>>());
        assert_eq!(report.failed, [speed(1.0)].into_iter().collect::<BTreeSet<_>>());
        assert_eq!(report.persisted.len(), 3);
        assert_eq!(
            report.synthesized().collect::<Vec<_>>(),
            vec![speed(0.75), speed(1.0)]
        );

        let scope = record().scope;
        let fast = transcripts.load_subs("fast_id", &scope).unwrap();
        assert_eq!(fast.start(), &[1000, 3000]);
        assert_eq!(fast.end(), &[2000, 4500]);

        let normal = transcripts.load_subs("normal_id", &scope).unwrap();
        assert_eq!(normal.start(), &[800, 2400]);
        assert_eq!(normal.end(), &[1600, 3600]);

        // Rescaled from the fast source, not the fetched slow captions.
        let slow = transcripts.load_subs("slow_id", &scope).unwrap();
        assert_eq!(slow.start(), &[600, 1800]);
        assert_eq!(slow.end(), &[1200, 2700]);
        assert_eq!(slow.text(), &["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn all_failures_persist_nothing() {
        let assets = MemoryStore::new();
        let records = MemoryRecordStore::new();
        let transcripts = Transcripts::new(&assets, &records);
        let fetcher = ScriptedFetcher::default()
            .respond("slow_id", 500, "<transcript></transcript>")
            .respond("normal_id", 200, "<transcript></transcript>")
            .respond("odd_id", 200, "");
        let sources = sources(&[
            (0.75, "slow_id"),
            (1.0, "normal_id"),
            (1.25, "missing_id"),
            (1.5, "odd_id"),
        ]);

        let err = transcripts
            .generate_from_remote(&fetcher, &sources, &record())
            .unwrap_err();

        assert!(matches!(err, TranscriptError::NoSourceAvailable));
        assert!(assets.is_empty());
    }

    #[test]
    fn speeds_without_ids_are_skipped() {
        let assets = MemoryStore::new();
        let records = MemoryRecordStore::new();
        let transcripts = Transcripts::new(&assets, &records);
        let fetcher = ScriptedFetcher::default().respond("normal_id", 200, FAST_CAPTIONS);
        let sources = sources(&[(0.75, ""), (1.0, "normal_id"), (1.5, "")]);

        let report = transcripts
            .generate_from_remote(&fetcher, &sources, &record())
            .unwrap();

        assert_eq!(*fetcher.requests.borrow(), vec!["normal_id"]);
        assert_eq!(report.skipped, [speed(0.75), speed(1.5)].into_iter().collect::<BTreeSet<_>>());
        assert_eq!(
            assets.filenames(&record().scope),
            vec!["subs_normal_id.srt.sjson"]
        );
        assert_eq!(report.synthesized().count(), 0);
    }

    #[test]
    fn canonical_source_is_stored_verbatim() {
        let assets = MemoryStore::new();
        let records = MemoryRecordStore::new();
        let transcripts = Transcripts::new(&assets, &records);
        let fetcher = ScriptedFetcher::default().respond("half_id", 200, SLOW_CAPTIONS);
        let sources = sources(&[(0.5, "half_id"), (1.0, "normal_id")]);

        let report = transcripts
            .generate_from_remote(&fetcher, &sources, &record())
            .unwrap();

        assert_eq!(report.canonical_speed, speed(0.5));
        let scope = record().scope;
        assert_eq!(
            transcripts.load_subs("half_id", &scope).unwrap(),
            parse_timed_text(SLOW_CAPTIONS).unwrap()
        );
        let normal = transcripts.load_subs("normal_id", &scope).unwrap();
        assert_eq!(normal.start(), &[1200]);
        assert_eq!(normal.end(), &[2400]);
    }

    const UPLOAD: &str = "1\n00:00:00,100 --> 00:00:00,200\nsubs #1\n\n\
                          2\n00:00:00,200 --> 00:00:00,240\nsubs #2\n\n\
                          3\n00:00:00,240 --> 00:00:00,380\nsubs #3\n";

    #[test]
    fn upload_is_rescaled_to_every_speed() {
        let assets = MemoryStore::new();
        let records = MemoryRecordStore::new();
        let transcripts = Transcripts::new(&assets, &records);
        let targets = sources(&[(0.5, "half"), (1.0, "normal"), (2.0, "double")]);

        let timing = transcripts
            .generate_from_upload("srt", UPLOAD.as_bytes(), &targets, &record())
            .unwrap();

        assert_eq!(timing.start(), &[100, 200, 240]);
        let scope = record().scope;
        assert_eq!(transcripts.load_subs("normal", &scope).unwrap(), timing);
        assert_eq!(
            transcripts.load_subs("half", &scope).unwrap().start(),
            &[50, 100, 120]
        );
        assert_eq!(
            transcripts.load_subs("double", &scope).unwrap().end(),
            &[400, 480, 760]
        );
    }

    #[test]
    fn upload_errors_reach_the_caller() {
        let assets = MemoryStore::new();
        let records = MemoryRecordStore::new();
        let transcripts = Transcripts::new(&assets, &records);
        let targets = sources(&[(1.0, "normal")]);

        assert!(matches!(
            transcripts.generate_from_upload("sbv", UPLOAD.as_bytes(), &targets, &record()),
            Err(TranscriptError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            transcripts.generate_from_upload("srt", b"", &targets, &record()),
            Err(TranscriptError::MalformedSubtitleSource(_))
        ));
        assert!(assets.is_empty());
    }
}
