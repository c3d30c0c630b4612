//! yt-dlp backed [`AudioResolver`].

use std::process::Stdio;

use async_trait::async_trait;
use rollbard_core::{AudioError, AudioResolver, ResolvedTrack, Track};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Runs the yt-dlp binary and reads its JSON dump
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    binary: String,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn dump_json(&self, url: &str, args: &[&str]) -> Result<Vec<u8>, AudioError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .args(["--no-warnings", "--quiet", "-J", "--"])
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(binary = %self.binary, url, "running resolver");
        let output = cmd
            .output()
            .await
            .map_err(|source| AudioError::ResolverUnavailable {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(url, %stderr, "resolver failed");
            return Err(AudioError::ResolverFailed {
                url: url.to_string(),
                stderr,
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl AudioResolver for YtDlpResolver {
    async fn resolve(&self, track: &Track) -> Result<Option<ResolvedTrack>, AudioError> {
        let json = self
            .dump_json(track.as_str(), &["--no-playlist", "-f", "bestaudio/best"])
            .await?;
        parse_resolved(&json)
    }

    async fn expand_playlist(&self, url: &str) -> Result<Vec<Track>, AudioError> {
        let json = self.dump_json(url, &["--flat-playlist"]).await?;
        parse_playlist(&json)
    }
}

#[derive(Debug, Deserialize)]
struct Info {
    url: Option<String>,
    title: Option<String>,
    webpage_url: Option<String>,
    id: Option<String>,
    #[serde(default)]
    entries: Vec<Info>,
}

fn parse_info(json: &[u8]) -> Result<Info, AudioError> {
    serde_json::from_slice(json).map_err(|source| AudioError::MalformedResolverOutput { source })
}

/// First playable entry of a dump; a playlist dump resolves to its first item
fn parse_resolved(json: &[u8]) -> Result<Option<ResolvedTrack>, AudioError> {
    let mut info = parse_info(json)?;
    if !info.entries.is_empty() {
        info = info.entries.swap_remove(0);
    }

    Ok(info.url.map(|stream_url| ResolvedTrack {
        title: info.title.unwrap_or_else(|| stream_url.clone()),
        stream_url,
    }))
}

fn parse_playlist(json: &[u8]) -> Result<Vec<Track>, AudioError> {
    let info = parse_info(json)?;
    Ok(info
        .entries
        .into_iter()
        .filter_map(|entry| {
            entry
                .url
                .or(entry.webpage_url)
                .or_else(|| entry.id.map(|id| format!("{WATCH_URL}{id}")))
        })
        .map(Track::new)
        .collect())
}
