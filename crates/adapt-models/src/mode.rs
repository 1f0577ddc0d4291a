//! Adaptation mode and composition options.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How the source frame is mapped onto the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdaptMode {
    /// Preserve the whole frame, pad the remainder (letterbox/pillarbox)
    Fit,
    /// Fill the target box, cropping the excess
    #[default]
    Fill,
}

impl AdaptMode {
    pub const ALL: &'static [AdaptMode] = &[AdaptMode::Fit, AdaptMode::Fill];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdaptMode::Fit => "fit",
            AdaptMode::Fill => "fill",
        }
    }
}

impl fmt::Display for AdaptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AdaptMode {
    type Err = AdaptModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fit" | "pad" => Ok(AdaptMode::Fit),
            "fill" | "crop" => Ok(AdaptMode::Fill),
            _ => Err(AdaptModeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown adaptation mode: {0}")]
pub struct AdaptModeParseError(String);

/// Aesthetic treatments composed on top of the geometric transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct CompositionOptions {
    /// Replace flat pad bars with a blurred extension of the scene (FIT only)
    #[serde(default)]
    pub blur_background: bool,
    /// Sharpen and boost contrast on the final composed frame
    #[serde(default)]
    pub legibility_boost: bool,
}

impl CompositionOptions {
    pub fn new(blur_background: bool, legibility_boost: bool) -> Self {
        Self {
            blur_background,
            legibility_boost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("fit".parse::<AdaptMode>().unwrap(), AdaptMode::Fit);
        assert_eq!("FILL".parse::<AdaptMode>().unwrap(), AdaptMode::Fill);
        assert_eq!("crop".parse::<AdaptMode>().unwrap(), AdaptMode::Fill);
        assert!("stretch".parse::<AdaptMode>().is_err());
    }

    #[test]
    fn test_mode_serde() {
        let json = serde_json::to_string(&AdaptMode::Fit).unwrap();
        assert_eq!(json, "\"fit\"");
        assert_eq!(AdaptMode::default(), AdaptMode::Fill);
    }
}
