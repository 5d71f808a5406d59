//! Subprocess-backed media downloader.
//!
//! Supervises an external downloader tool (e.g. `yt-dlp`), streaming its
//! stdout line by line, parsing progress/speed/eta/phase and watching
//! for rate-limit phrasing. Cooperative cancellation: the cancel token is
//! checked between lines and, if set, the child is killed immediately —
//! a download already past its final write cannot be cancelled.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::BackendError;
use crate::traits::{DownloadProgress, Downloader, IdentifyCandidate};

pub struct SubprocessDownloader {
    binary: String,
}

impl SubprocessDownloader {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

#[async_trait]
impl Downloader for SubprocessDownloader {
    async fn download(
        &self,
        url: &str,
        format: &str,
        out_dir: &Path,
        on_progress: &(dyn Fn(DownloadProgress) + Send + Sync),
        cancel: CancellationToken,
    ) -> Result<Vec<PathBuf>, BackendError> {
        std::fs::create_dir_all(out_dir)?;

        let mut child = Command::new(&self.binary)
            .arg("-f")
            .arg(format)
            .arg("-o")
            .arg(out_dir.join("%(id)s.%(ext)s"))
            .arg(url)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| BackendError::ToolingMissing(format!("failed to spawn {}: {e}", self.binary)))?;

        let stdout = child.stdout.take().expect("stdout piped");
        let mut lines = BufReader::new(stdout).lines();
        let mut rate_limited = false;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = child.kill().await;
                    return Err(BackendError::Cancelled);
                }
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if is_rate_limited(&line) {
                                rate_limited = true;
                            }
                            if let Some(progress) = parse_progress_line(&line) {
                                on_progress(progress);
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!(error = %e, "error reading downloader stdout");
                            break;
                        }
                    }
                }
            }
        }

        let status = child.wait().await.map_err(|e| BackendError::IoFailed(e.to_string()))?;
        if rate_limited {
            return Err(BackendError::RateLimited(format!("{} reported a rate limit", self.binary)));
        }
        if !status.success() {
            return Err(BackendError::NotFound(format!("{} exited with {:?}", self.binary, status.code())));
        }

        let paths: Vec<PathBuf> = std::fs::read_dir(out_dir)
            .map_err(BackendError::from)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .collect();
        Ok(paths)
    }

    /// Runs a flat, no-download search against the extractor's catalog
    /// and parses its one-JSON-object-per-line output.
    async fn identify(&self, query: &str, limit: usize) -> Result<Vec<IdentifyCandidate>, BackendError> {
        let search_spec = format!("ytsearch{limit}:{query}");
        let output = Command::new(&self.binary)
            .arg("--flat-playlist")
            .arg("--dump-json")
            .arg(&search_spec)
            .output()
            .await
            .map_err(|e| BackendError::ToolingMissing(format!("failed to spawn {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::NotFound(format!("{} identify exited with {:?}: {stderr}", self.binary, output.status.code())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(parse_identify_line).collect())
    }

    /// Confirms the downloader binary is actually spawnable before the
    /// first job, rather than discovering a missing tool mid-job.
    async fn load(&self) -> Result<(), BackendError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| BackendError::LoadFailed(format!("{} not runnable: {e}", self.binary)))?;
        if !output.status.success() {
            return Err(BackendError::LoadFailed(format!("{} --version exited with {:?}", self.binary, output.status.code())));
        }
        Ok(())
    }
}

fn parse_identify_line(line: &str) -> Option<IdentifyCandidate> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    Some(IdentifyCandidate {
        id: value.get("id")?.as_str()?.to_string(),
        title: value.get("title").and_then(|v| v.as_str()).unwrap_or("untitled").to_string(),
        url: value
            .get("webpage_url")
            .or_else(|| value.get("url"))
            .and_then(|v| v.as_str())
            .map(str::to_string)?,
        duration_secs: value.get("duration").and_then(|v| v.as_f64()).map(|d| d as u32),
    })
}

fn is_rate_limited(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests")
}

/// Parses yt-dlp-style progress lines, e.g.
/// `[download]  42.0% of 3.50MiB at 1.20MiB/s ETA 00:02`
fn parse_progress_line(line: &str) -> Option<DownloadProgress> {
    if !line.trim_start().starts_with("[download]") {
        return None;
    }
    let percent = line
        .split_whitespace()
        .find_map(|tok| tok.strip_suffix('%'))
        .and_then(|v| v.parse::<f32>().ok())
        .map(|v| v / 100.0)?;

    let speed = line
        .split("at ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .map(str::to_string);
    let eta = line
        .split("ETA ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .map(str::to_string);

    Some(DownloadProgress { progress: percent, speed, eta, phase: Some("downloading".to_string()) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_typical_progress_line() {
        let line = "[download]  42.0% of 3.50MiB at 1.20MiB/s ETA 00:02";
        let parsed = parse_progress_line(line).unwrap();
        assert!((parsed.progress - 0.42).abs() < 1e-6);
        assert_eq!(parsed.speed.as_deref(), Some("1.20MiB/s"));
        assert_eq!(parsed.eta.as_deref(), Some("00:02"));
    }

    #[test]
    fn ignores_non_progress_lines() {
        assert!(parse_progress_line("[info] Writing metadata").is_none());
    }

    #[test]
    fn detects_rate_limit_phrasing() {
        assert!(is_rate_limited("HTTP Error 429: Too Many Requests"));
        assert!(!is_rate_limited("[download] Destination: a.mp3"));
    }

    #[test]
    fn parses_an_identify_line() {
        let line = r#"{"id":"abc123","title":"A Song","webpage_url":"https://example.com/abc123","duration":201.5}"#;
        let parsed = parse_identify_line(line).unwrap();
        assert_eq!(parsed.id, "abc123");
        assert_eq!(parsed.title, "A Song");
        assert_eq!(parsed.duration_secs, Some(201));
    }

    #[test]
    fn identify_line_without_id_is_skipped() {
        assert!(parse_identify_line(r#"{"title":"no id here"}"#).is_none());
    }
}
