//! Providers that don't call a model.

use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use adapt_models::{RoiBox, VideoAsset};

use crate::error::{RoiError, RoiResult};
use crate::provider::{RoiProvider, SamplingParams};

/// Returns a fixed set of boxes, e.g. hand-annotated or from a previous run.
#[derive(Debug, Clone, Default)]
pub struct FixedRoiProvider {
    boxes: Vec<RoiBox>,
}

impl FixedRoiProvider {
    pub fn new(boxes: Vec<RoiBox>) -> Self {
        Self { boxes }
    }

    /// Load a JSON array of ROI boxes.
    pub async fn from_json_file(path: impl AsRef<Path>) -> RoiResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let boxes: Vec<RoiBox> = serde_json::from_slice(&bytes)?;
        debug!(path = %path.display(), count = boxes.len(), "Loaded ROI boxes");
        Ok(Self::new(boxes))
    }

    pub fn boxes(&self) -> &[RoiBox] {
        &self.boxes
    }
}

#[async_trait]
impl RoiProvider for FixedRoiProvider {
    async fn detect(&self, _asset: &VideoAsset, _params: &SamplingParams) -> RoiResult<Vec<RoiBox>> {
        Ok(self.boxes.clone())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Always reports detection as unavailable.
#[derive(Debug, Clone, Default)]
pub struct DisabledRoiProvider {
    reason: Option<String>,
}

impl DisabledRoiProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
impl RoiProvider for DisabledRoiProvider {
    async fn detect(&self, _asset: &VideoAsset, _params: &SamplingParams) -> RoiResult<Vec<RoiBox>> {
        Err(RoiError::unavailable(
            self.reason.clone().unwrap_or_else(|| "no ROI provider configured".to_string()),
        ))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
