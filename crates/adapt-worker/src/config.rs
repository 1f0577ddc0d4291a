//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use adapt_media::{PlannerConfig, ProtectConfig};
use adapt_models::batch::{DEFAULT_MAX_FRAMES, DEFAULT_SAMPLING_RATE};
use adapt_models::{EncodingConfig, FormatProfile, FormatRegistry, QualityPreset};

use crate::error::WorkerResult;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs per batch
    pub max_concurrent_jobs: usize,
    /// Parent directory for per-job scratch space
    pub work_dir: PathBuf,
    /// Rendered outputs land in `{output_dir}/{batch_id}/`
    pub output_dir: PathBuf,
    /// Kill a single render after this long
    pub render_timeout: Duration,
    /// Render retries after the first attempt
    pub render_retries: u32,
    /// Output container (file extension)
    pub container: String,
    /// Encoding quality preset
    pub quality: QualityPreset,
    /// Probe rendered outputs and reject dimension mismatches
    pub verify_output: bool,
    /// Frames per second sampled for ROI detection
    pub sampling_rate: f64,
    /// Maximum frames sent for ROI detection
    pub max_ai_frames: u32,
    /// ROI boxes below this confidence are ignored
    pub roi_min_confidence: f64,
    /// Extra profiles as comma separated `NAME=WxH[@FPS]`
    pub custom_formats: Option<String>,
    /// Prometheus listener address, metrics disabled when unset
    pub metrics_addr: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            work_dir: PathBuf::from("/tmp/adapt"),
            output_dir: PathBuf::from("./output"),
            render_timeout: Duration::from_secs(3600), // 1 hour
            render_retries: 1,
            container: "mp4".to_string(),
            quality: QualityPreset::High,
            verify_output: false,
            sampling_rate: DEFAULT_SAMPLING_RATE,
            max_ai_frames: DEFAULT_MAX_FRAMES,
            roi_min_confidence: 0.5,
            custom_formats: None,
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: std::env::var("ADAPT_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            work_dir: std::env::var("ADAPT_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: std::env::var("ADAPT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            render_timeout: Duration::from_secs(
                std::env::var("ADAPT_RENDER_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            render_retries: std::env::var("ADAPT_RENDER_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.render_retries),
            container: std::env::var("ADAPT_CONTAINER").unwrap_or(defaults.container),
            quality: std::env::var("ADAPT_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.quality),
            verify_output: std::env::var("ADAPT_VERIFY_OUTPUT")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.verify_output),
            sampling_rate: std::env::var("ADAPT_SAMPLE_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|r: &f64| *r > 0.0)
                .unwrap_or(defaults.sampling_rate),
            max_ai_frames: std::env::var("ADAPT_MAX_AI_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_ai_frames),
            roi_min_confidence: std::env::var("ADAPT_ROI_MIN_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.roi_min_confidence),
            custom_formats: std::env::var("ADAPT_CUSTOM_FORMATS")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            metrics_addr: std::env::var("ADAPT_METRICS_ADDR")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }

    /// Encoding settings for every output of a batch.
    pub fn encoding(&self) -> EncodingConfig {
        EncodingConfig::for_quality(self.quality).with_container(self.container.clone())
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig::default().with_protect(ProtectConfig::default().with_min_confidence(self.roi_min_confidence))
    }

    /// Built-in profiles plus `custom_formats`.
    pub fn registry(&self) -> WorkerResult<FormatRegistry> {
        self.registry_with(Vec::new())
    }

    /// Like [`registry`](Self::registry), with `extra` registered last.
    pub fn registry_with(&self, extra: impl IntoIterator<Item = FormatProfile>) -> WorkerResult<FormatRegistry> {
        let mut builder = FormatRegistry::builder().with_builtins();
        if let Some(specs) = &self.custom_formats {
            builder = builder.with_custom_specs(specs)?;
        }
        for profile in extra {
            builder = builder.add(profile)?;
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.render_retries, 1);
        assert_eq!(config.encoding().extension(), "mp4");
        assert_eq!(config.planner_config().protect.min_confidence, 0.5);
    }

    #[test]
    fn test_registry_with_custom_formats() {
        let config = WorkerConfig {
            custom_formats: Some("LOBBY_WALL=3840x1080@25, 640x480".to_string()),
            ..Default::default()
        };
        let registry = config.registry().unwrap();
        let lobby = registry.resolve("lobby_wall").unwrap();
        assert_eq!((lobby.width, lobby.height, lobby.fps), (3840, 1080, 25));
        assert!(registry.contains("CUSTOM_640x480"));
        assert!(registry.contains("BILLBOARD_14x48"));
    }

    #[test]
    fn test_registry_with_extra_profiles() {
        let registry = WorkerConfig::default()
            .registry_with([FormatProfile::custom("KIOSK", 768, 1366, 30)])
            .unwrap();
        assert_eq!(registry.resolve("kiosk").unwrap().height, 1366);
    }

    #[test]
    fn test_registry_rejects_shadowed_builtin() {
        let config = WorkerConfig {
            custom_formats: Some("BILLBOARD_14x48=100x100".to_string()),
            ..Default::default()
        };
        assert!(config.registry().is_err());
        assert!(WorkerConfig::default()
            .registry_with([FormatProfile::custom("../OUT", 640, 360, 30)])
            .is_err());
    }

    #[test]
    fn test_registry_rejects_bad_spec() {
        let config = WorkerConfig {
            custom_formats: Some("WALL=axb".to_string()),
            ..Default::default()
        };
        assert!(config.registry().is_err());
    }
}
