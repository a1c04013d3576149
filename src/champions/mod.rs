//! Champion icon matching for minimap videos
//!
//! This module loads a folder of champion icons, scales them to the minimap in
//! the video, and reports where each champion's marker appears frame by frame.

pub mod annotate;
pub mod config;
pub mod detector;
pub mod icons;

#[cfg(test)]
mod tests;

// Re-export main types and functions
pub use annotate::annotate;
pub use config::{IconConfig, MatchConfig, create_default_config, create_headless_config};
pub use detector::{
    ChampionIconMatcher, Detection, FrameConsumer, FrameReport, IconScore, MatchSession,
    MatchState, RunSummary,
};
pub use icons::{IconLibrary, IconTemplate, crop_margin, icon_size_for, preprocess_icon};
