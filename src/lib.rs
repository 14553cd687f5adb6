//! Subtitle speed rescaling and format conversion.
//!
//! Transcripts are kept as [`Timing`]s: parallel arrays of start and end
//! milliseconds and cue text. They are stored as `subs_<id>.srt.sjson`
//! assets, one per playback speed, and convert to and from SubRip.

pub mod captions;
pub mod config;
pub mod entities;
pub mod error;
pub mod naming;
pub mod parser;
pub mod record;
pub mod rescale;
pub mod serialiser;
pub mod sjson;
pub mod speed;
pub mod store;
pub mod synth;
pub mod timing;

pub use captions::{parse_timed_text, CaptionFetcher, CaptionResponse, HttpCaptionFetcher};
pub use config::Config;
pub use error::TranscriptError;
pub use naming::{subs_filename, ReconcileReport, Transcripts};
pub use parser::{parse_source, parse_subrip, SubtitleFormat};
pub use record::{FsRecordStore, MemoryRecordStore, RecordMetadata, RecordStore, VideoRecord};
pub use rescale::rescale;
pub use serialiser::render_subrip;
pub use sjson::{from_sjson, to_sjson};
pub use speed::Speed;
pub use store::{AssetStore, CourseScope, FsStore, MemoryStore, StoreError};
pub use synth::SynthesisReport;
pub use timing::Timing;
