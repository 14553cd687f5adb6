use crate::rescale::rescale;
use crate::speed::Speed;
use crate::timing::Timing;

use std::io::{self, Write};
use std::time::Duration;

/// Renders timings recorded at `speed` as a SubRip document at speed 1.0.
///
/// Cues are numbered from 1 in array order. Timings whose arrays disagree
/// in length render as an empty document.
pub fn render_subrip(timing: &Timing, speed: Speed) -> String {
    if timing.start().len() != timing.end().len() || timing.start().len() != timing.text().len()
    {
        return String::new();
    }
    let normal = rescale(timing, speed, Speed::NORMAL);
    let mut buf = Vec::new();
    match write_subs(&mut buf, &normal) {
        Ok(()) => String::from_utf8(buf).unwrap_or_default(),
        Err(_) => String::new(),
    }
}

pub fn write_subs<W: Write>(buf: &mut W, timing: &Timing) -> io::Result<()> {
    for (i, (start, end, text)) in timing.cues().enumerate() {
        write_sub(buf, i + 1, start, end, text)?;
    }
    Ok(())
}

fn write_sub<W: Write>(buf: &mut W, index: usize, start: u64, end: u64, text: &str) -> io::Result<()> {
    writeln!(buf, "{}", index)?;
    write_ts(buf, Duration::from_millis(start))?;
    write!(buf, " --> ")?;
    write_ts(buf, Duration::from_millis(end))?;
    writeln!(buf)?;
    writeln!(buf, "{}", text)?;
    writeln!(buf)?;
    Ok(())
}

fn write_ts<W: Write>(buf: &mut W, timestamp: Duration) -> io::Result<()> {
    let total_secs = timestamp.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = timestamp.subsec_millis();
    write!(
        buf,
        "{:02}:{:02}:{:02},{:03}",
        hours, minutes, seconds, millis
    )
}
