use crate::entities::unescape_html;
use crate::error::{Result, TranscriptError};
use crate::timing::Timing;

use std::str::FromStr;
use std::time::Duration;

use nom::bytes::complete::{tag, take_while1, take_while_m_n};
use nom::character::complete::{digit1, line_ending, multispace0, multispace1, space0, space1};
use nom::combinator::{map_res, opt};
use nom::error::{convert_error, ErrorKind, VerboseError};
use nom::multi::many_till;
use nom::sequence::terminated;
use nom::{branch::alt, error_position, Err, IResult};

/// Source formats accepted for uploaded transcripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    SubRip,
}

impl FromStr for SubtitleFormat {
    type Err = TranscriptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "srt" => Ok(SubtitleFormat::SubRip),
            _ => Err(TranscriptError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// A single SubRip block as it appears in the file.
#[derive(Debug)]
pub struct Cue {
    pub(crate) show_at: Duration,
    pub(crate) hide_at: Duration,
    pub(crate) text: Vec<String>,
}

pub struct Parser;
impl Parser {
    pub fn new() -> Self {
        Self {}
    }

    pub fn parse(&mut self, input: &str) -> Result<Vec<Cue>> {
        match srt_file(input) {
            Ok((_, cues)) => Ok(cues),
            Err(Err::Error(err)) | Err(Err::Failure(err)) => {
                let conv = convert_error(input, err);
                Err(TranscriptError::MalformedSubtitleSource(conv))
            }
            Err(Err::Incomplete(_)) => {
                unreachable!("Incomplete data received by non-streaming parser.")
            }
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses SubRip text into timings at speed 1.0.
///
/// Lines of a multi-line cue are joined with spaces and HTML entities are
/// decoded. Input without a single cue is rejected.
pub fn parse_subrip(raw: &str) -> Result<Timing> {
    let cues = Parser::new().parse(raw)?;
    if cues.is_empty() {
        return Err(TranscriptError::MalformedSubtitleSource(
            "no subtitles found in SubRip source".to_string(),
        ));
    }
    Ok(cues
        .into_iter()
        .map(|cue| {
            let text = unescape_html(&cue.text.join(" ")).into_owned();
            (
                cue.show_at.as_millis() as u64,
                cue.hide_at.as_millis() as u64,
                text,
            )
        })
        .collect())
}

/// Parses an uploaded transcript of the declared `format`.
pub fn parse_source(format: &str, raw: &[u8]) -> Result<Timing> {
    match format.parse::<SubtitleFormat>()? {
        SubtitleFormat::SubRip => {
            let raw = std::str::from_utf8(raw).map_err(|err| {
                TranscriptError::MalformedSubtitleSource(format!("source is not UTF-8: {}", err))
            })?;
            parse_subrip(raw)
        }
    }
}

fn optional_bom(input: &str) -> IResult<&str, Option<&str>, VerboseError<&str>> {
    opt(tag("\u{FEFF}"))(input)
}

fn srt_file(input: &str) -> IResult<&str, Vec<Cue>, VerboseError<&str>> {
    let (input, _) = optional_bom(input)?;
    let (input, cues) = all_cues(input)?;
    let (input, _) = end_of_file(input)?;
    Ok((input, cues))
}

fn all_cues(input: &str) -> IResult<&str, Vec<Cue>, VerboseError<&str>> {
    let mut parsed_cues = Vec::new();
    let (mut input, _) = multispace0(input)?;
    loop {
        match cue(input) {
            Ok((rem_input, cue)) => {
                parsed_cues.push(cue);
                let (rem_input, _) = multispace0(rem_input)?;
                input = rem_input;
            }
            Err(err) => {
                if input.is_empty() {
                    return Ok((input, parsed_cues));
                } else {
                    return Err(err);
                }
            }
        }
    }
}

fn cue(input: &str) -> IResult<&str, Cue, VerboseError<&str>> {
    let (input, _) = multispace0(input)?;
    let (input, _) = terminated(seq_num, multispace1)(input)?;
    let (input, (show_at, hide_at)) = terminated(show_hide, line_ending)(input)?;
    let (input, text) = cue_text(input)?;

    Ok((
        input,
        Cue {
            show_at,
            hide_at,
            text,
        },
    ))
}

fn end_of_file(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    if input.is_empty() {
        Ok((input, input))
    } else {
        std::result::Result::Err(Err::Error(error_position!(input, ErrorKind::Eof)))
    }
}

fn cue_text(input: &str) -> IResult<&str, Vec<String>, VerboseError<&str>> {
    let line = terminated(
        take_while1(|c: char| c != '\n' && c != '\r'),
        alt((line_ending, end_of_file)),
    );

    let (input, (vec, _)) = many_till(line, alt((line_ending, end_of_file)))(input)?;

    Ok((input, vec.into_iter().map(|l| l.trim_end().to_string()).collect()))
}

fn show_hide(input: &str) -> IResult<&str, (Duration, Duration), VerboseError<&str>> {
    let (input, show_at) = timestamp(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("-->")(input)?;
    let (input, _) = space1(input)?;
    let (input, hide_at) = timestamp(input)?;
    let (input, _) = space0(input)?;

    Ok((input, (show_at, hide_at)))
}

fn timestamp(input: &str) -> IResult<&str, Duration, VerboseError<&str>> {
    const MILLIS_MIN: usize = 0;
    const MILLIS_MAX: usize = 3;
    let take_millis = || {
        map_res(
            take_while_m_n(MILLIS_MIN, MILLIS_MAX, |c: char| c.is_ascii_digit()),
            move |s: &str| {
                // `,2` means 200 ms: right-pad short fields to three digits.
                format!("{:0<3}", s).parse::<u64>()
            },
        )
    };

    const MS_MIN: usize = 0;
    const MS_MAX: usize = 2;
    let take_min_sec = || {
        map_res(
            take_while_m_n(MS_MIN, MS_MAX, |c: char| c.is_ascii_digit()),
            // Left-pad instead, so that 1:13:45 reads as 01:13:45.
            |s: &str| format!("{:0>2}", s).parse::<u64>(),
        )
    };

    // Hours have no fixed width; long recordings render as e.g. `100:00:00,000`.
    let (input, hours): (_, u64) = map_res(digit1, |s: &str| s.parse())(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, minutes) = take_min_sec()(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, seconds) = take_min_sec()(input)?;
    let (input, _) = alt((tag(","), tag(".")))(input)?;
    let (rest, millis) = take_millis()(input)?;

    let total = hours
        .checked_mul(60 * 60 * 1000)
        .and_then(|ms| ms.checked_add(minutes * 60 * 1000 + seconds * 1000 + millis));
    match total {
        Some(total) => Ok((rest, Duration::from_millis(total))),
        None => Err(Err::Error(error_position!(input, ErrorKind::TooLarge))),
    }
}

fn seq_num(input: &str) -> IResult<&str, usize, VerboseError<&str>> {
    map_res(digit1, |s: &str| s.parse())(input)
}
