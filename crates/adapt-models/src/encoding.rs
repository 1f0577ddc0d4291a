//! Video encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 20;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Pixel format accepted by every player we target
pub const DEFAULT_PIX_FMT: &str = "yuv420p";
/// Default output container
pub const DEFAULT_CONTAINER: &str = "mp4";

/// Bitrate ladder for campaign deliverables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    Low,
    Medium,
    #[default]
    High,
    Ultra,
}

impl QualityPreset {
    pub const ALL: &'static [QualityPreset] = &[
        QualityPreset::Low,
        QualityPreset::Medium,
        QualityPreset::High,
        QualityPreset::Ultra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "low",
            QualityPreset::Medium => "medium",
            QualityPreset::High => "high",
            QualityPreset::Ultra => "ultra",
        }
    }

    pub fn video_bitrate(&self) -> &'static str {
        match self {
            QualityPreset::Low => "500k",
            QualityPreset::Medium => "1000k",
            QualityPreset::High => "2000k",
            QualityPreset::Ultra => "4000k",
        }
    }

    pub fn audio_bitrate(&self) -> &'static str {
        match self {
            QualityPreset::Low => "64k",
            QualityPreset::Medium => "128k",
            QualityPreset::High => "192k",
            QualityPreset::Ultra => "320k",
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown quality preset: {0}")]
pub struct QualityPresetParseError(String);

impl FromStr for QualityPreset {
    type Err = QualityPresetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(QualityPreset::Low),
            "medium" => Ok(QualityPreset::Medium),
            "high" => Ok(QualityPreset::High),
            "ultra" => Ok(QualityPreset::Ultra),
            _ => Err(QualityPresetParseError(s.to_string())),
        }
    }
}

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor, ignored when a target bitrate is set
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Target video bitrate (e.g., "2000k")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_bitrate: Option<String>,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Output pixel format
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,

    /// Output container / file extension
    #[serde(default = "default_container")]
    pub container: String,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_pix_fmt() -> String {
    DEFAULT_PIX_FMT.to_string()
}
fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            video_bitrate: None,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            pix_fmt: DEFAULT_PIX_FMT.to_string(),
            container: DEFAULT_CONTAINER.to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    /// Create a new encoding configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration targeting a quality preset's bitrates.
    pub fn for_quality(quality: QualityPreset) -> Self {
        Self {
            video_bitrate: Some(quality.video_bitrate().to_string()),
            audio_bitrate: quality.audio_bitrate().to_string(),
            ..Default::default()
        }
    }

    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Returns a new config writing the given container.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    /// Output file extension.
    pub fn extension(&self) -> &str {
        &self.container
    }

    /// Convert to FFmpeg command arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
        ];

        match &self.video_bitrate {
            Some(bitrate) => args.extend_from_slice(&["-b:v".to_string(), bitrate.clone()]),
            None => args.extend_from_slice(&["-crf".to_string(), self.crf.to_string()]),
        }

        args.extend_from_slice(&[
            "-pix_fmt".to_string(),
            self.pix_fmt.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ]);

        // Progressive playback on signage players
        if matches!(self.container.as_str(), "mp4" | "mov") {
            args.extend_from_slice(&["-movflags".to_string(), "+faststart".to_string()]);
        }

        args.extend(self.extra_args.clone());

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EncodingConfig::default();
        assert_eq!(config.codec, "libx264");
        assert_eq!(config.pix_fmt, "yuv420p");
        assert_eq!(config.extension(), "mp4");
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = EncodingConfig::default().to_ffmpeg_args();
        assert!(args.contains(&"-crf".to_string()));
        assert!(args.contains(&"yuv420p".to_string()));
        assert!(args.contains(&"+faststart".to_string()));
        assert!(!args.contains(&"-b:v".to_string()));
    }

    #[test]
    fn test_quality_preset_args() {
        let args = EncodingConfig::for_quality(QualityPreset::Ultra).to_ffmpeg_args();
        assert!(args.contains(&"4000k".to_string()));
        assert!(args.contains(&"320k".to_string()));
        assert!(!args.contains(&"-crf".to_string()));
    }

    #[test]
    fn test_faststart_only_for_mp4_family() {
        let args = EncodingConfig::default().with_container("mkv").to_ffmpeg_args();
        assert!(!args.contains(&"-movflags".to_string()));
    }

    #[test]
    fn test_quality_parse() {
        assert_eq!("ULTRA".parse::<QualityPreset>().unwrap(), QualityPreset::Ultra);
        assert!("extreme".parse::<QualityPreset>().is_err());
    }
}
