//! YouTube caption transcripts.
//!
//! The watch page embeds the player's caption track list as JSON. We pick a
//! track for the requested language (manual captions before auto-generated
//! ones), download its timed-text XML and turn each `<text>` element into a
//! segment.

use std::sync::OnceLock;

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::text::truncate_chars;

use super::MAX_TRANSCRIPT_CHARS;

const WATCH_URL: &str = "https://www.youtube.com/watch";

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Subtitles are disabled for video {0}")]
    Disabled(String),
    #[error("No transcript found for video {video_id} in {languages:?}")]
    NotFound {
        video_id: String,
        languages: Vec<String>,
    },
    #[error("{0}")]
    Fetch(String),
}

impl TranscriptError {
    /// True when the video simply has no usable transcript, as opposed to a
    /// failure talking to YouTube.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            TranscriptError::Disabled(_) | TranscriptError::NotFound { .. }
        )
    }
}

impl From<reqwest::Error> for TranscriptError {
    fn from(e: reqwest::Error) -> Self {
        TranscriptError::Fetch(e.to_string())
    }
}

impl From<quick_xml::Error> for TranscriptError {
    fn from(e: quick_xml::Error) -> Self {
        TranscriptError::Fetch(format!("unreadable timed text: {e}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the first transcript available in `languages`, in priority order.
    async fn fetch_transcript(
        &self,
        video_id: &str,
        languages: &[&str],
    ) -> Result<Vec<TranscriptSegment>, TranscriptError>;
}

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:v=|youtu\.be/)([\w-]{11})").expect("static regex is valid"))
}

/// The 11-character video id from a `watch?v=` or `youtu.be/` URL.
pub fn extract_video_id(url: &str) -> Option<&str> {
    video_id_regex()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Segment texts joined with single spaces, capped for prompting.
pub fn transcript_text(segments: &[TranscriptSegment]) -> String {
    let joined = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    truncate_chars(&joined, MAX_TRANSCRIPT_CHARS).to_string()
}

// ============================================================================
// Watch-page scraping client
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TrackList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackList {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

pub struct YouTubeTranscripts {
    client: Client,
}

impl YouTubeTranscripts {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn caption_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>, TranscriptError> {
        let resp = self
            .client
            .get(WATCH_URL)
            .query(&[("v", video_id)])
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(TranscriptError::Fetch(format!(
                "watch page returned {}",
                resp.status()
            )));
        }

        let html = resp.text().await?;
        parse_caption_tracks(&html, video_id)
    }
}

fn parse_caption_tracks(html: &str, video_id: &str) -> Result<Vec<CaptionTrack>, TranscriptError> {
    let Some((_, after)) = html.split_once("\"captions\":") else {
        if html.contains("class=\"g-recaptcha\"") {
            return Err(TranscriptError::Fetch(
                "YouTube is rate limiting requests from this address".to_string(),
            ));
        }
        if !html.contains("\"playabilityStatus\":") {
            return Err(TranscriptError::Fetch(format!(
                "video {video_id} is unavailable"
            )));
        }
        return Err(TranscriptError::Disabled(video_id.to_string()));
    };

    let json = after
        .split_once(",\"videoDetails")
        .map(|(captions, _)| captions)
        .unwrap_or(after);

    let captions = serde_json::Deserializer::from_str(json)
        .into_iter::<Captions>()
        .next()
        .ok_or_else(|| TranscriptError::Disabled(video_id.to_string()))?
        .map_err(|e| TranscriptError::Fetch(format!("unreadable caption data: {e}")))?;

    let tracks = captions
        .player_captions_tracklist_renderer
        .map(|list| list.caption_tracks)
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(TranscriptError::Disabled(video_id.to_string()));
    }
    Ok(tracks)
}

fn pick_track<'a>(tracks: &'a [CaptionTrack], languages: &[&str]) -> Option<&'a CaptionTrack> {
    languages.iter().find_map(|lang| {
        let matching: Vec<&CaptionTrack> = tracks
            .iter()
            .filter(|t| t.language_code == *lang)
            .collect();
        matching
            .iter()
            .find(|t| !t.is_generated())
            .or_else(|| matching.first())
            .copied()
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex is valid"))
}

fn seconds_attr(e: &BytesStart<'_>, name: &[u8]) -> f64 {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok()?.parse().ok())
        .unwrap_or(0.0)
}

/// Parse `<transcript><text start=".." dur="..">..</text>...</transcript>`.
fn parse_timed_text(xml: &str) -> Result<Vec<TranscriptSegment>, TranscriptError> {
    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    // (start, duration, escaped-once text) of the open <text> element
    let mut open: Option<(f64, f64, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"text" => {
                open = Some((seconds_attr(&e, b"start"), seconds_attr(&e, b"dur"), String::new()));
            }
            Event::Text(t) => {
                if let Some((_, _, buf)) = open.as_mut() {
                    buf.push_str(&t.unescape()?);
                }
            }
            Event::End(e) if e.name().as_ref() == b"text" => {
                let Some((start, duration, raw)) = open.take() else {
                    continue;
                };
                // Caption markup is escaped a second time inside the XML
                let decoded = quick_xml::escape::unescape(&raw)
                    .map(|c| c.into_owned())
                    .unwrap_or(raw);
                let text = tag_regex().replace_all(&decoded, "").trim().to_string();
                if !text.is_empty() {
                    segments.push(TranscriptSegment {
                        text,
                        start,
                        duration,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(segments)
}

#[async_trait]
impl TranscriptSource for YouTubeTranscripts {
    async fn fetch_transcript(
        &self,
        video_id: &str,
        languages: &[&str],
    ) -> Result<Vec<TranscriptSegment>, TranscriptError> {
        let tracks = self.caption_tracks(video_id).await?;

        let track = pick_track(&tracks, languages).ok_or_else(|| TranscriptError::NotFound {
            video_id: video_id.to_string(),
            languages: languages.iter().map(|l| l.to_string()).collect(),
        })?;

        let url = track.base_url.replace("&fmt=srv3", "");
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(TranscriptError::Fetch(format!(
                "timed text returned {}",
                resp.status()
            )));
        }

        let segments = parse_timed_text(&resp.text().await?)?;
        tracing::debug!(
            video_id,
            language = %track.language_code,
            generated = track.is_generated(),
            segments = segments.len(),
            "Fetched transcript"
        );
        Ok(segments)
    }
}
