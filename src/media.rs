//! ffmpeg helpers for the pipeline
//!
//! The locally installed `ffmpeg` binary handles everything codec-shaped:
//! duration probing, the one-shot re-encode retry for rejected uploads,
//! audio extraction from bot videos, and splitting long audio into
//! API-sized segments. The single-concurrency worker keeps these invocations
//! serialized.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Probe the duration of an audio/video file in seconds.
///
/// Parses the `Duration: HH:MM:SS.ss` line from ffmpeg's stderr banner, the
/// same way for every container format we see. `None` means ffmpeg reported
/// no duration at all (e.g. `Duration: N/A` on streamed fragments), which is
/// not the same thing as a short file.
pub async fn probe_duration(path: &Path) -> Result<Option<f64>> {
    let output = Command::new("ffmpeg")
        .arg("-i")
        .arg(path)
        .output()
        .await
        .context("Failed to run ffmpeg for duration probe")?;

    let duration = parse_duration(&String::from_utf8_lossy(&output.stderr));
    match duration {
        Some(secs) => debug!("Probed duration of {:?}: {:.2}s", path, secs),
        None => debug!("No duration found for {:?}", path),
    }
    Ok(duration)
}

fn parse_duration(stderr: &str) -> Option<f64> {
    for line in stderr.lines() {
        if let Some(rest) = line.trim().strip_prefix("Duration:") {
            let time_str = rest.split(',').next().unwrap_or("").trim();
            let mut parts = time_str.split(':');
            let (h, m, s) = (parts.next()?, parts.next()?, parts.next()?);
            let (Ok(h), Ok(m), Ok(s)) = (h.parse::<f64>(), m.parse::<f64>(), s.parse::<f64>())
            else {
                return None;
            };
            return Some(h * 3600.0 + m * 60.0 + s);
        }
    }
    None
}

/// Re-encode an audio file in place (libvorbis). Used once when the
/// transcription API rejects a chunk as invalid-format.
pub async fn reencode_audio(path: &Path) -> Result<()> {
    let reencoded = path.with_extension("reencoded.webm");

    info!("Re-encoding {:?}", path);

    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(path)
        .args(["-c:a", "libvorbis"])
        .arg(&reencoded)
        .status()
        .await
        .context("Failed to run ffmpeg for re-encode")?;

    if !status.success() {
        anyhow::bail!("ffmpeg re-encode of {:?} failed with {}", path, status);
    }

    tokio::fs::rename(&reencoded, path)
        .await
        .context("Failed to replace original with re-encoded file")?;

    Ok(())
}

/// Extract the audio track of a video into a mono 44.1kHz WAV next to it.
pub async fn extract_audio(video_path: &Path) -> Result<PathBuf> {
    let audio_path = video_path.with_extension("wav");

    info!("Extracting audio from {:?}", video_path);

    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(video_path)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "44100", "-ac", "1"])
        .arg(&audio_path)
        .status()
        .await
        .context("Failed to run ffmpeg for audio extraction")?;

    if !status.success() {
        anyhow::bail!(
            "ffmpeg audio extraction from {:?} failed with {}",
            video_path,
            status
        );
    }

    let len = tokio::fs::metadata(&audio_path)
        .await
        .map(|m| m.len())
        .unwrap_or(0);
    if len == 0 {
        anyhow::bail!("Extracted audio file {:?} is missing or empty", audio_path);
    }

    Ok(audio_path)
}

/// Split an audio file into fixed-length segments for transcription.
/// Returns the segment paths in playback order.
pub async fn segment_audio(audio_path: &Path, segment_secs: u64) -> Result<Vec<PathBuf>> {
    let stem = audio_path
        .file_stem()
        .and_then(|s| s.to_str())
        .context("Audio path has no file stem")?;
    let dir = audio_path.parent().context("Audio path has no parent")?;
    let pattern = dir.join(format!("{}_segment_%03d.wav", stem));

    info!("Segmenting {:?} into {}s pieces", audio_path, segment_secs);

    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(audio_path)
        .args(["-f", "segment", "-segment_time"])
        .arg(segment_secs.to_string())
        .args(["-c", "copy"])
        .arg(&pattern)
        .status()
        .await
        .context("Failed to run ffmpeg for segmentation")?;

    if !status.success() {
        anyhow::bail!("ffmpeg segmentation of {:?} failed with {}", audio_path, status);
    }

    let mut segments = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .context("Failed to read segment directory")?;
    let prefix = format!("{}_segment_", stem);
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(&prefix) && name.ends_with(".wav") {
            segments.push(entry.path());
        }
    }
    segments.sort();

    Ok(segments)
}
