use crate::speed::Speed;
use crate::timing::Timing;

/// Converts timings recorded at `source` playback speed into the timings of
/// the same cues at `target` speed.
///
/// Each timestamp is multiplied by `target / source` and rounded half away
/// from zero. Text is carried over untouched.
pub fn rescale(timing: &Timing, source: Speed, target: Speed) -> Timing {
    if source == target {
        return timing.clone();
    }
    let coefficient = target.value() / source.value();
    timing.map_timestamps(|ts| (ts as f64 * coefficient).round() as u64)
}
