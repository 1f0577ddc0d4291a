//! Target display profiles and the registry that owns them.
//!
//! Profiles are registry-owned and shared by `Arc`; jobs reference them,
//! they never copy them. The registry is assembled once through
//! [`FormatRegistryBuilder`] and is immutable afterwards.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::AdaptMode;

/// Default frame rate for profiles that don't declare one.
pub const DEFAULT_PROFILE_FPS: u32 = 30;

/// Tolerance used when matching profiles by aspect-ratio label.
const ASPECT_MATCH_TOLERANCE: f64 = 0.1;

/// Display family a profile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FormatCategory {
    Led,
    Billboard,
    Social,
    Custom,
}

impl FormatCategory {
    pub fn label(&self) -> &'static str {
        match self {
            FormatCategory::Led => "LED Displays",
            FormatCategory::Billboard => "Billboards",
            FormatCategory::Social => "Social Media",
            FormatCategory::Custom => "Custom",
        }
    }
}

impl fmt::Display for FormatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A named target display geometry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct FormatProfile {
    /// Registry key, also used as the output file stem
    pub name: String,
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
    /// Target frame rate
    pub fps: u32,
    /// Mode used when the request doesn't override it
    pub default_mode: AdaptMode,
    /// Display family
    pub category: FormatCategory,
    /// Human readable description
    pub description: String,
    /// Whether the downstream encoder needs even dimensions (yuv420p)
    pub even_dimensions: bool,
}

impl FormatProfile {
    /// Create a profile with the product defaults (FILL, even dimensions).
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        fps: u32,
        category: FormatCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            fps,
            default_mode: AdaptMode::Fill,
            category,
            description: description.into(),
            even_dimensions: true,
        }
    }

    /// Create a user-defined profile.
    pub fn custom(name: impl Into<String>, width: u32, height: u32, fps: u32) -> Self {
        Self::new(
            name,
            width,
            height,
            fps,
            FormatCategory::Custom,
            format!("Custom {}x{}", width, height),
        )
    }

    /// Override the default mode.
    pub fn with_default_mode(mut self, mode: AdaptMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// `None` when the profile declares a zero dimension.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }

    /// Dimensions as `WxH`.
    pub fn dimensions(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl fmt::Display for FormatProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}@{}fps)", self.name, self.dimensions(), self.fps)
    }
}

/// Errors from parsing custom format specifications.
#[derive(Debug, Error)]
pub enum FormatSpecError {
    #[error("Invalid format spec: {0}, expected '[NAME=]WxH[@FPS]'")]
    InvalidFormat(String),
    #[error("Invalid number in format spec: {0}")]
    InvalidNumber(String),
    #[error("Invalid aspect ratio label: {0}, expected 'W:H'")]
    InvalidAspect(String),
    #[error("Invalid format name: {0:?}, only letters, digits, '_' and '-' are allowed")]
    InvalidName(String),
    #[error("Format {0} is already registered")]
    DuplicateName(String),
}

/// Profile names become output file stems, so they must not carry path syntax.
pub fn validate_profile_name(name: &str) -> Result<(), FormatSpecError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(FormatSpecError::InvalidName(name.to_string()))
    }
}

/// Parse a custom profile spec: `NAME=WxH[@FPS]` or `WxH[@FPS]`.
///
/// Unnamed specs are keyed `CUSTOM_{W}x{H}`.
pub fn parse_custom_spec(spec: &str) -> Result<FormatProfile, FormatSpecError> {
    let spec = spec.trim();
    let (name, dims) = match spec.split_once('=') {
        Some((name, dims)) if !name.trim().is_empty() => (Some(name.trim()), dims.trim()),
        Some(_) => return Err(FormatSpecError::InvalidFormat(spec.to_string())),
        None => (None, spec),
    };

    let (dims, fps) = match dims.split_once('@') {
        Some((dims, fps)) => {
            let fps = fps
                .trim()
                .parse::<u32>()
                .map_err(|_| FormatSpecError::InvalidNumber(fps.to_string()))?;
            (dims, fps)
        }
        None => (dims, DEFAULT_PROFILE_FPS),
    };

    let (w, h) = dims
        .split_once(['x', 'X'])
        .ok_or_else(|| FormatSpecError::InvalidFormat(spec.to_string()))?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| FormatSpecError::InvalidNumber(w.to_string()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| FormatSpecError::InvalidNumber(h.to_string()))?;

    let name = match name {
        Some(name) => {
            validate_profile_name(name)?;
            name.to_ascii_uppercase()
        }
        None => format!("CUSTOM_{}x{}", width, height),
    };

    Ok(FormatProfile::custom(name, width, height, fps))
}

/// Parse an aspect label like `16:9` into a ratio.
fn parse_aspect_label(label: &str) -> Result<f64, FormatSpecError> {
    let (w, h) = label
        .split_once(':')
        .ok_or_else(|| FormatSpecError::InvalidAspect(label.to_string()))?;
    let w: f64 = w
        .trim()
        .parse()
        .map_err(|_| FormatSpecError::InvalidAspect(label.to_string()))?;
    let h: f64 = h
        .trim()
        .parse()
        .map_err(|_| FormatSpecError::InvalidAspect(label.to_string()))?;
    if w <= 0.0 || h <= 0.0 {
        return Err(FormatSpecError::InvalidAspect(label.to_string()));
    }
    Ok(w / h)
}

/// Immutable catalog of target profiles. Lookup is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    profiles: HashMap<String, Arc<FormatProfile>>,
}

impl FormatRegistry {
    /// Start assembling a registry.
    pub fn builder() -> FormatRegistryBuilder {
        FormatRegistryBuilder::default()
    }

    /// Registry containing only the built-in catalog.
    pub fn builtin() -> Self {
        Self::builder().with_builtins().build()
    }

    /// Look up a profile by name (case-insensitive).
    pub fn resolve(&self, name: &str) -> Option<Arc<FormatProfile>> {
        self.profiles.get(&name.trim().to_ascii_uppercase()).cloned()
    }

    /// Whether a profile with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// All profile names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.values().map(|p| p.name.clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profiles grouped by category, names sorted within each group.
    pub fn by_category(&self) -> BTreeMap<FormatCategory, Vec<Arc<FormatProfile>>> {
        let mut groups: BTreeMap<FormatCategory, Vec<Arc<FormatProfile>>> = BTreeMap::new();
        for profile in self.profiles.values() {
            groups.entry(profile.category).or_default().push(Arc::clone(profile));
        }
        for profiles in groups.values_mut() {
            profiles.sort_by(|a, b| a.name.cmp(&b.name));
        }
        groups
    }

    /// Profiles whose aspect ratio is within 0.1 of `label` (e.g. `16:9`).
    pub fn matching_aspect(&self, label: &str) -> Result<Vec<Arc<FormatProfile>>, FormatSpecError> {
        let wanted = parse_aspect_label(label)?;
        let mut matches: Vec<Arc<FormatProfile>> = self
            .profiles
            .values()
            .filter(|p| {
                p.aspect_ratio()
                    .map(|r| (r - wanted).abs() < ASPECT_MATCH_TOLERANCE)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matches)
    }
}

/// Builder for [`FormatRegistry`]. Names are unique case-insensitively.
#[derive(Debug, Default)]
pub struct FormatRegistryBuilder {
    profiles: HashMap<String, Arc<FormatProfile>>,
}

impl FormatRegistryBuilder {
    /// Add the built-in LED, billboard and social catalog.
    pub fn with_builtins(mut self) -> Self {
        for profile in builtin_profiles() {
            self.profiles
                .insert(profile.name.to_ascii_uppercase(), Arc::new(profile));
        }
        self
    }

    /// Register a profile.
    ///
    /// # Errors
    /// - `InvalidName` when the name is not `[A-Za-z0-9_-]+`
    /// - `DuplicateName` when the name is already registered, built-ins included
    pub fn add(mut self, mut profile: FormatProfile) -> Result<Self, FormatSpecError> {
        profile.name = profile.name.trim().to_string();
        validate_profile_name(&profile.name)?;

        let key = profile.name.to_ascii_uppercase();
        if self.profiles.contains_key(&key) {
            return Err(FormatSpecError::DuplicateName(profile.name));
        }
        self.profiles.insert(key, Arc::new(profile));
        Ok(self)
    }

    /// Register a custom `width x height` profile.
    pub fn custom(
        self,
        name: impl Into<String>,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Self, FormatSpecError> {
        self.add(FormatProfile::custom(name, width, height, fps))
    }

    /// Register every spec in a comma-separated list of `[NAME=]WxH[@FPS]`.
    pub fn with_custom_specs(mut self, specs: &str) -> Result<Self, FormatSpecError> {
        for spec in specs.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            self = self.add(parse_custom_spec(spec)?)?;
        }
        Ok(self)
    }

    /// Freeze the registry.
    pub fn build(self) -> FormatRegistry {
        FormatRegistry {
            profiles: self.profiles,
        }
    }
}

fn builtin_profiles() -> Vec<FormatProfile> {
    use FormatCategory::*;
    vec![
        FormatProfile::new("LED_16x9_FHD", 1920, 1080, 30, Led, "Full HD 16:9 LED Display"),
        FormatProfile::new("LED_9x16_FHD", 1080, 1920, 30, Led, "Full HD 9:16 Portrait LED Display"),
        FormatProfile::new("LED_4x3_XGA", 1024, 768, 30, Led, "XGA 4:3 LED Display"),
        FormatProfile::new("LED_960x320", 960, 320, 30, Led, "Ultra-wide LED Strip Display"),
        FormatProfile::new("LED_256x128", 256, 128, 25, Led, "Low-res LED Matrix Display"),
        FormatProfile::new("LED_1280x720", 1280, 720, 30, Led, "HD 16:9 LED Display"),
        FormatProfile::new("LED_800x600", 800, 600, 30, Led, "SVGA 4:3 LED Display"),
        FormatProfile::new("LED_1024x1024", 1024, 1024, 30, Led, "Square LED Display"),
        FormatProfile::new("BILLBOARD_14x48", 1680, 480, 30, Billboard, "Standard Billboard 14'x48'"),
        FormatProfile::new("BILLBOARD_12x24", 1440, 720, 30, Billboard, "Junior Billboard 12'x24'"),
        FormatProfile::new("BILLBOARD_6x12", 720, 360, 30, Billboard, "Poster Billboard 6'x12'"),
        FormatProfile::new("INSTAGRAM_SQUARE", 1080, 1080, 30, Social, "Instagram Square Post"),
        FormatProfile::new("INSTAGRAM_STORY", 1080, 1920, 30, Social, "Instagram Story"),
        FormatProfile::new("YOUTUBE_16x9", 1920, 1080, 30, Social, "YouTube 16:9 Video"),
        FormatProfile::new("TIKTOK_9x16", 1080, 1920, 30, Social, "TikTok Portrait Video"),
    ]
}
