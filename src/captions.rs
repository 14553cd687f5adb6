//! Remote caption transport and the timed-text XML it returns.

use crate::config::CaptionApiConfig;
use crate::entities::unescape_html;
use crate::error::{Result, TranscriptError};
use crate::timing::Timing;

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use regex::Regex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionResponse {
    pub status: u16,
    pub body: String,
}

impl CaptionResponse {
    pub fn is_usable(&self) -> bool {
        self.status == 200 && !self.body.is_empty()
    }
}

/// Fetches the raw caption document for a video source id.
pub trait CaptionFetcher {
    fn fetch(&self, source_id: &str) -> anyhow::Result<CaptionResponse>;
}

/// Blocking HTTP client for the captioning service.
pub struct HttpCaptionFetcher {
    client: reqwest::blocking::Client,
    url: String,
    params: BTreeMap<String, String>,
}

impl HttpCaptionFetcher {
    pub fn new(config: &CaptionApiConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: config.url.clone(),
            params: config.params.clone(),
        })
    }
}

impl CaptionFetcher for HttpCaptionFetcher {
    fn fetch(&self, source_id: &str) -> anyhow::Result<CaptionResponse> {
        let mut params = self.params.clone();
        params.insert("v".to_string(), source_id.to_string());
        debug!(url = %self.url, source_id, "fetching captions");

        let response = self
            .client
            .get(&self.url)
            .query(&params)
            .send()
            .context(format!("Failed to request captions for '{}'", source_id))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .context(format!("Failed to read captions for '{}'", source_id))?;
        Ok(CaptionResponse { status, body })
    }
}

fn text_element_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text\s*>)").expect("valid regex")
    })
}

fn comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"))
}

fn cdata_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"))
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_][\w.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
    })
}

fn attributes(raw: &str) -> BTreeMap<&str, &str> {
    attribute_regex()
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
            Some((name, value))
        })
        .collect()
}

fn seconds_attr(attrs: &BTreeMap<&str, &str>, name: &str) -> Result<Option<f64>> {
    attrs
        .get(name)
        .map(|value| {
            value.trim().parse::<f64>().map_err(|_| {
                TranscriptError::MalformedSubtitleSource(format!(
                    "invalid '{}' attribute: '{}'",
                    name, value
                ))
            })
        })
        .transpose()
}

/// Decodes the character data of a `<text>` element.
///
/// Plain character data is entity-encoded twice (XML, then HTML); CDATA
/// sections skip the XML layer and are decoded once.
fn element_text(content: &str) -> String {
    let content = content.replace('\n', " ");
    let mut text = String::new();
    let mut last = 0;
    for caps in cdata_regex().captures_iter(&content) {
        let Some(section) = caps.get(0) else {
            continue;
        };
        text.push_str(&unescape_html(&unescape_html(&content[last..section.start()])));
        text.push_str(&unescape_html(&caps[1]));
        last = section.end();
    }
    text.push_str(&unescape_html(&unescape_html(&content[last..])));
    text
}

/// Parses a `<transcript><text start=".." dur="..">..</text></transcript>`
/// document into timings at the speed the document was fetched for.
///
/// Elements without text are skipped. `dur` is optional and defaults to 0.
/// XML comments are dropped before matching and CDATA sections are read
/// literally. A CDATA section that itself contains `</text>` is not
/// supported and ends the element early.
pub fn parse_timed_text(body: &str) -> Result<Timing> {
    let body = comment_regex().replace_all(body, "");
    if !body.contains("<transcript") {
        return Err(TranscriptError::MalformedSubtitleSource(
            "caption response is not a timed-text transcript".to_string(),
        ));
    }

    let mut cues = Vec::new();
    for caps in text_element_regex().captures_iter(&body) {
        let text = match caps.get(2) {
            Some(content) => element_text(content.as_str()),
            None => continue,
        };
        if text.is_empty() {
            continue;
        }
        let attrs = attributes(&caps[1]);
        let start = seconds_attr(&attrs, "start")?.ok_or_else(|| {
            TranscriptError::MalformedSubtitleSource("text element without start".to_string())
        })?;
        let duration = seconds_attr(&attrs, "dur")?.unwrap_or(0.0);
        let end = start + duration;

        // The service reports seconds; nudge the end up before truncating so
        // values like 2.72 do not land on 2719 ms.
        let start_ms = (start * 1000.0) as u64;
        let end_ms = ((end + 0.0001) * 1000.0) as u64;
        cues.push((start_ms, end_ms, text));
    }
    Ok(cues.into_iter().collect())
}
