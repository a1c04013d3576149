//! Configuration for champion icon matching

use crate::geometry::Ratio;
use crate::template_matching::CorrelationMethod;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconConfig {
    /// Folder scanned (non-recursively) for icon images
    pub folder: PathBuf,
    /// Recognised file extension, compared case-insensitively
    pub extension: String,
    /// Icon side length as a fraction of the minimap side
    pub icon_ratio: Ratio,
    /// Share of the resized icon kept along each axis (the rest is trimmed evenly)
    pub search_ratio: f64,
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("champion_icons"),
            extension: "png".to_string(),
            icon_ratio: Ratio::new(25, 280),
            search_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Minimum correlation accepted as a detection
    pub threshold: f32,
    /// Score used for matching
    pub method: CorrelationMethod,
    /// Produce an annotated copy of every frame
    pub annotate: bool,
    pub icons: IconConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            method: CorrelationMethod::ZeroMeanNormalized,
            annotate: true,
            icons: IconConfig::default(),
        }
    }
}

/// Create a default configuration for interactive debugging
pub fn create_default_config() -> MatchConfig {
    MatchConfig::default()
}

/// Configuration preset for telemetry-only runs (no annotated frames)
pub fn create_headless_config() -> MatchConfig {
    MatchConfig {
        annotate: false,
        ..MatchConfig::default()
    }
}
