use crate::store::CourseScope;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// The video module that owns a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub scope: CourseScope,
    /// Id of the transcript currently attached to the video.
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub youtube_id_1_0: String,
    #[serde(default)]
    pub html5_sources: Vec<String>,
}

impl VideoRecord {
    /// Ids the transcript should also be reachable under: the normal-speed
    /// YouTube id, then the file stem of every HTML5 source URL.
    pub fn video_source_ids(&self) -> Vec<String> {
        let html5_ids = self.html5_sources.iter().map(|source| {
            let file = source.rsplit('/').next().unwrap_or_default();
            file.split('.').next().unwrap_or_default().to_string()
        });
        std::iter::once(self.youtube_id_1_0.clone())
            .chain(html5_ids)
            .filter(|id| !id.is_empty())
            .collect()
    }

    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            sub: self.sub.clone(),
            youtube_id_1_0: self.youtube_id_1_0.clone(),
            html5_sources: self.html5_sources.clone(),
        }
    }
}

/// The editable fields of a [`VideoRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub sub: String,
    pub youtube_id_1_0: String,
    pub html5_sources: Vec<String>,
}

pub trait RecordStore {
    fn save(&self, record: &VideoRecord) -> Result<()>;
    fn update_metadata(&self, record_id: &str, metadata: &RecordMetadata) -> Result<()>;
}

/// Keeps each record as `<root>/<id>.json`.
pub struct FsRecordStore {
    root: PathBuf,
}

impl FsRecordStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path(&self, record_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", record_id))
    }

    pub fn load(&self, record_id: &str) -> Result<VideoRecord> {
        let path = self.path(record_id);
        let data = fs::read(&path)
            .context(format!("Failed to read video record: '{}'", path.display()))?;
        serde_json::from_slice(&data)
            .context(format!("Failed to parse video record: '{}'", path.display()))
    }
}

impl RecordStore for FsRecordStore {
    fn save(&self, record: &VideoRecord) -> Result<()> {
        fs::create_dir_all(&self.root).context("Failed to create record directory")?;
        let data = serde_json::to_vec_pretty(record)?;
        fs::write(self.path(&record.id), data)
            .context(format!("Failed to write video record: '{}'", record.id))
    }

    fn update_metadata(&self, record_id: &str, metadata: &RecordMetadata) -> Result<()> {
        let mut record = self.load(record_id)?;
        record.sub = metadata.sub.clone();
        record.youtube_id_1_0 = metadata.youtube_id_1_0.clone();
        record.html5_sources = metadata.html5_sources.clone();
        self.save(&record)
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    records: RefCell<HashMap<String, VideoRecord>>,
    metadata: RefCell<HashMap<String, RecordMetadata>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record_id: &str) -> Option<VideoRecord> {
        self.records.borrow().get(record_id).cloned()
    }

    pub fn metadata(&self, record_id: &str) -> Option<RecordMetadata> {
        self.metadata.borrow().get(record_id).cloned()
    }
}

impl RecordStore for MemoryRecordStore {
    fn save(&self, record: &VideoRecord) -> Result<()> {
        self.records
            .borrow_mut()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn update_metadata(&self, record_id: &str, metadata: &RecordMetadata) -> Result<()> {
        self.metadata
            .borrow_mut()
            .insert(record_id.to_string(), metadata.clone());
        Ok(())
    }
}
