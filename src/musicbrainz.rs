//! MusicBrainz web-service lookups.
//!
//! Thin search client over the `/ws/2` JSON endpoints. Requests are paced to
//! stay under the service's one-request-per-second limit, and a 503 gets one
//! retry before the error is surfaced to the caller.

use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ServiceError;

const BASE_URL: &str = "https://musicbrainz.org/ws/2";
const USER_AGENT: &str = concat!("recrate/", env!("CARGO_PKG_VERSION"));
const PACE: Duration = Duration::from_millis(1100);
const RESULT_LIMIT: u32 = 10;

/// Remote metadata search. The MusicBrainz client is the production
/// implementation; tests substitute canned responders.
pub trait MetadataLookup {
    fn find_artists(&self, query: &str) -> Result<Vec<ArtistMatch>, ServiceError>;
    fn find_releases(&self, query: &str) -> Result<Vec<ReleaseMatch>, ServiceError>;
    fn find_recordings(&self, query: &str) -> Result<Vec<RecordingMatch>, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct ArtistMatch {
    pub id: String,
    pub name: String,
    pub score: u8,
}

#[derive(Debug, Clone)]
pub struct ReleaseMatch {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub date: String,
    pub score: u8,
}

#[derive(Debug, Clone)]
pub struct RecordingMatch {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub length: Option<Duration>,
    pub score: u8,
}

pub struct MusicBrainzClient {
    http: reqwest::blocking::Client,
    base_url: String,
    pace: Duration,
}

impl MusicBrainzClient {
    pub fn new() -> Result<Self, ServiceError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ServiceError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: BASE_URL.to_string(),
            pace: PACE,
        })
    }

    /// Point the client at a different service root (local mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the delay inserted before each request. The default keeps
    /// the client under the public service's one-request-per-second limit.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    fn search(&self, entity: &str, query: &str) -> Result<String, ServiceError> {
        let url = format!(
            "{base}/{entity}?query={query}&fmt=json&limit={limit}",
            base = self.base_url,
            query = urlencode(query),
            limit = RESULT_LIMIT,
        );
        self.get_with_retry(&url, false)
    }

    fn get_with_retry(&self, url: &str, is_retry: bool) -> Result<String, ServiceError> {
        std::thread::sleep(self.pace);

        let resp = self
            .http
            .get(url)
            .send()
            .map_err(|e| ServiceError::Transport(format!("request failed: {e}")))?;

        let status = resp.status();
        if status.as_u16() == 503 && !is_retry {
            warn!("musicbrainz busy (503), retrying once");
            return self.get_with_retry(url, true);
        }
        if !status.is_success() {
            return Err(ServiceError::Status(status.as_u16()));
        }

        debug!(%url, "musicbrainz query ok");
        resp.text()
            .map_err(|e| ServiceError::Transport(format!("failed to read response body: {e}")))
    }
}

impl MetadataLookup for MusicBrainzClient {
    fn find_artists(&self, query: &str) -> Result<Vec<ArtistMatch>, ServiceError> {
        parse_artists(&self.search("artist", query)?)
    }

    fn find_releases(&self, query: &str) -> Result<Vec<ReleaseMatch>, ServiceError> {
        parse_releases(&self.search("release", query)?)
    }

    fn find_recordings(&self, query: &str) -> Result<Vec<RecordingMatch>, ServiceError> {
        parse_recordings(&self.search("recording", query)?)
    }
}

// ---- response parsing ----

#[derive(Deserialize)]
struct ArtistResponse {
    artists: Option<Vec<ArtistEntry>>,
}

#[derive(Deserialize)]
struct ArtistEntry {
    id: String,
    name: String,
    score: Option<u8>,
}

#[derive(Deserialize)]
struct ReleaseResponse {
    releases: Option<Vec<ReleaseEntry>>,
}

#[derive(Deserialize)]
struct ReleaseEntry {
    id: String,
    title: String,
    date: Option<String>,
    score: Option<u8>,
    #[serde(rename = "artist-credit")]
    artist_credit: Option<Vec<ArtistCredit>>,
}

#[derive(Deserialize)]
struct RecordingResponse {
    recordings: Option<Vec<RecordingEntry>>,
}

#[derive(Deserialize)]
struct RecordingEntry {
    id: String,
    title: String,
    /// Recording length in milliseconds.
    length: Option<u64>,
    score: Option<u8>,
    #[serde(rename = "artist-credit")]
    artist_credit: Option<Vec<ArtistCredit>>,
}

#[derive(Deserialize)]
struct ArtistCredit {
    name: String,
}

fn credited_artist(credit: &Option<Vec<ArtistCredit>>) -> String {
    credit
        .as_ref()
        .and_then(|c| c.first())
        .map(|c| c.name.clone())
        .unwrap_or_default()
}

fn parse_artists(body: &str) -> Result<Vec<ArtistMatch>, ServiceError> {
    let data: ArtistResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::Malformed(format!("artist search: {e}")))?;
    Ok(data
        .artists
        .unwrap_or_default()
        .into_iter()
        .map(|a| ArtistMatch {
            id: a.id,
            name: a.name,
            score: a.score.unwrap_or(0),
        })
        .collect())
}

fn parse_releases(body: &str) -> Result<Vec<ReleaseMatch>, ServiceError> {
    let data: ReleaseResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::Malformed(format!("release search: {e}")))?;
    Ok(data
        .releases
        .unwrap_or_default()
        .into_iter()
        .map(|r| ReleaseMatch {
            id: r.id,
            title: r.title,
            artist: credited_artist(&r.artist_credit),
            date: r.date.unwrap_or_default(),
            score: r.score.unwrap_or(0),
        })
        .collect())
}

fn parse_recordings(body: &str) -> Result<Vec<RecordingMatch>, ServiceError> {
    let data: RecordingResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::Malformed(format!("recording search: {e}")))?;
    Ok(data
        .recordings
        .unwrap_or_default()
        .into_iter()
        .map(|r| RecordingMatch {
            id: r.id,
            title: r.title,
            artist: credited_artist(&r.artist_credit),
            length: r.length.map(Duration::from_millis),
            score: r.score.unwrap_or(0),
        })
        .collect())
}

fn urlencode(s: &str) -> String {
    const SET: &AsciiSet = &NON_ALPHANUMERIC
        .remove(b'-')
        .remove(b'_')
        .remove(b'.')
        .remove(b'~');
    utf8_percent_encode(s, SET).to_string()
}
