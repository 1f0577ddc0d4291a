//! FFmpeg progress snapshots.

use serde::{Deserialize, Serialize};

/// Snapshot of one `-progress` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Frames written so far
    pub frame: u64,
    /// Output position in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime
    pub speed: f64,
    /// FFmpeg reported `progress=end`
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Whole-number percentage of `total_duration_ms`, capped at 100.
    pub fn percent(&self, total_duration_ms: i64) -> u8 {
        if self.is_complete {
            return 100;
        }
        if total_duration_ms <= 0 || self.out_time_ms <= 0 {
            return 0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).clamp(0.0, 100.0) as u8
    }
}
