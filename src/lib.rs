//! Offline League of Legends minimap tooling
//!
//! - [`minimap`]: crop the minimap out of a gameplay recording
//! - [`champions`]: find champion icons on a cropped minimap video
//!
//! Video files are read and written through a [`video::VideoBackend`].

pub mod champions;
pub mod error;
pub mod geometry;
pub mod minimap;
pub mod report;
pub mod template_matching;
pub mod video;

pub use champions::{ChampionIconMatcher, MatchConfig};
pub use error::{ErrorKind, VisionError, VisionResult};
pub use minimap::{CropConfig, MinimapCropper};
pub use video::{VideoBackend, default_backend};
