use crate::error::{Result, TranscriptError};
use crate::record::{RecordStore, VideoRecord};
use crate::sjson::{from_sjson, to_sjson, SJSON_MIME_TYPE};
use crate::store::{AssetStore, CourseScope, StoreError};
use crate::timing::Timing;

use tracing::{debug, info, warn};

/// Storage filename of the transcript with id `subs_id`.
pub fn subs_filename(subs_id: &str) -> String {
    format!("subs_{}.srt.sjson", subs_id)
}

/// Transcript operations over an asset store and a record store.
pub struct Transcripts<'a> {
    pub(crate) assets: &'a dyn AssetStore,
    pub(crate) records: &'a dyn RecordStore,
}

/// Outcome of [`Transcripts::reconcile_video_sources`], one entry per
/// candidate id in the order they were tried.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub copied: Vec<String>,
    pub failed: Vec<String>,
}

impl<'a> Transcripts<'a> {
    pub fn new(assets: &'a dyn AssetStore, records: &'a dyn RecordStore) -> Self {
        Self { assets, records }
    }

    /// Writes `timing` as the transcript `subs_id` of `scope` and returns the
    /// filename it was stored under.
    pub fn save_subs(&self, timing: &Timing, subs_id: &str, scope: &CourseScope) -> Result<String> {
        let filename = subs_filename(subs_id);
        self.assets
            .put(scope, &filename, SJSON_MIME_TYPE, &to_sjson(timing))?;
        self.assets.invalidate(scope, &filename);
        debug!(%scope, filename = %filename, cues = timing.len(), "saved transcript");
        Ok(filename)
    }

    pub fn load_subs(&self, subs_id: &str, scope: &CourseScope) -> Result<Timing> {
        let filename = subs_filename(subs_id);
        let data = self.assets.get(scope, &filename).map_err(|err| match err {
            StoreError::NotFound { .. } => TranscriptError::SourceNotFound(filename.clone()),
            other => TranscriptError::Storage(other),
        })?;
        from_sjson(&data)
    }

    /// Deletes the transcript `subs_id`. Missing transcripts are ignored.
    pub fn remove(&self, subs_id: &str, record: &VideoRecord) -> Result<()> {
        let filename = subs_filename(subs_id);
        match self.assets.delete(&record.scope, &filename) {
            Ok(()) => {
                info!("Removed subs {} from store", subs_id);
                Ok(())
            }
            Err(StoreError::NotFound { .. }) => {
                debug!("Subs {} not in store, nothing to remove", subs_id);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Copies transcript `old_id` to `new_id` and points `record` at the copy.
    ///
    /// The record is committed before `old_id` is deleted, so a failed
    /// delete never leaves the record pointing at a missing transcript.
    pub fn copy_or_rename(
        &self,
        new_id: &str,
        old_id: &str,
        record: &mut VideoRecord,
        delete_old: bool,
    ) -> Result<()> {
        let timing = self.load_subs(old_id, &record.scope)?;
        self.save_subs(&timing, new_id, &record.scope)?;
        record.sub = new_id.to_string();
        self.save_record(record)?;
        if delete_old && new_id != old_id {
            self.remove(old_id, record)?;
        }
        Ok(())
    }

    /// Makes the current transcript reachable under every video source id
    /// of `record`. Each copy stands alone: a failure is logged and the
    /// remaining ids are still tried. `record.sub` ends on the last id that
    /// was copied successfully.
    pub fn reconcile_video_sources(&self, record: &mut VideoRecord) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let sub_name = record.sub.clone();
        if sub_name.is_empty() {
            debug!(record = %record.id, "no transcript attached, nothing to reconcile");
            return report;
        }

        for video_id in record.video_source_ids() {
            match self.copy_or_rename(&video_id, &sub_name, record, false) {
                Ok(()) => {
                    debug!("Copied {} file content to {}", sub_name, video_id);
                    report.copied.push(video_id);
                }
                Err(err) => {
                    warn!("Copying {} file content to {} failed: {}", sub_name, video_id, err);
                    report.failed.push(video_id);
                }
            }
        }
        report
    }

    fn save_record(&self, record: &VideoRecord) -> Result<()> {
        self.records
            .save(record)
            .and_then(|_| self.records.update_metadata(&record.id, &record.metadata()))
            .map_err(TranscriptError::Records)
    }
}
