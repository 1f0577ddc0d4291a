//! Source video asset models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::SourceGeometry;

/// Unique identifier for a source asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A probed source video. Read-only for the duration of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoAsset {
    /// Asset ID
    pub id: VideoId,
    /// Location of the source file
    pub path: PathBuf,
    /// Frame width in pixels
    pub width: i32,
    /// Frame height in pixels
    pub height: i32,
    /// Duration in seconds
    pub duration: f64,
    /// Frame rate
    pub fps: f64,
    /// Whether the container carries an audio stream
    #[serde(default)]
    pub has_audio: bool,
}

impl VideoAsset {
    pub fn new(path: impl Into<PathBuf>, width: i32, height: i32, duration: f64, fps: f64) -> Self {
        Self {
            id: VideoId::new(),
            path: path.into(),
            width,
            height,
            duration,
            fps,
            has_audio: false,
        }
    }

    pub fn with_audio(mut self, has_audio: bool) -> Self {
        self.has_audio = has_audio;
        self
    }

    pub fn geometry(&self) -> SourceGeometry {
        SourceGeometry::new(self.width, self.height)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for logs, falling back to the full path.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
