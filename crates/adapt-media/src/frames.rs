//! Frame sampling for ROI detection.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

const FRAME_PREFIX: &str = "frame_";

/// A JPEG frame sampled from the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledFrame {
    /// Time of the frame in seconds
    pub timestamp: f64,
    pub path: PathBuf,
}

/// Write JPEG frames at `sampling_rate` fps into `out_dir`, at most `max_frames`.
///
/// Frames are returned in timestamp order.
pub async fn extract_frames(
    input: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    sampling_rate: f64,
    max_frames: u32,
) -> MediaResult<Vec<SampledFrame>> {
    let input = input.as_ref();
    let out_dir = out_dir.as_ref();

    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return Err(MediaError::internal(format!("invalid sampling rate {}", sampling_rate)));
    }
    if max_frames == 0 {
        return Ok(Vec::new());
    }

    fs::create_dir_all(out_dir).await?;

    let pattern = out_dir.join(format!("{}%04d.jpg", FRAME_PREFIX));
    let cmd = FfmpegCommand::new(input, &pattern)
        .video_filter(format!("fps={}", sampling_rate))
        .max_frames(max_frames)
        .output_arg("-q:v")
        .output_arg("2");

    FfmpegRunner::new().run(&cmd).await?;

    let frames = collect_frames(out_dir, sampling_rate).await?;
    debug!(count = frames.len(), sampling_rate, "Extracted frames");
    Ok(frames)
}

/// List `frame_NNNN.jpg` files in `dir`, ordered by index.
async fn collect_frames(dir: &Path, sampling_rate: f64) -> MediaResult<Vec<SampledFrame>> {
    let mut indexed = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let index = name
            .strip_prefix(FRAME_PREFIX)
            .and_then(|rest| rest.strip_suffix(".jpg"))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(index) = index {
            indexed.push((index, entry.path()));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);

    // FFmpeg numbers output from 1
    Ok(indexed
        .into_iter()
        .map(|(index, path)| SampledFrame {
            timestamp: index.saturating_sub(1) as f64 / sampling_rate,
            path,
        })
        .collect())
}
