/// Template matching data types
use image::{ImageBuffer, Luma};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Correlation scores, one per candidate top-left position
pub type ScoreMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// How a template window is scored against the search image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CorrelationMethod {
    /// Pearson correlation of window and template, in [-1, 1].
    /// Insensitive to uniform brightness and contrast changes.
    #[default]
    ZeroMeanNormalized,
    /// Plain normalized cross-correlation from imageproc, in [0, 1] for luma input
    CrossNormalized,
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationMethod::ZeroMeanNormalized => f.write_str("zncc"),
            CorrelationMethod::CrossNormalized => f.write_str("ncc"),
        }
    }
}

impl FromStr for CorrelationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zncc" | "ccoeff" => Ok(CorrelationMethod::ZeroMeanNormalized),
            "ncc" | "ccorr" => Ok(CorrelationMethod::CrossNormalized),
            other => Err(format!("unknown correlation method '{other}', expected 'zncc' or 'ncc'")),
        }
    }
}

/// Best alignment of a template: top-left corner and its score
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredLocation {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

impl ScoredLocation {
    /// Format as string with score percentage
    pub fn describe(&self, name: &str) -> String {
        let pct = (self.score * 100.0) as i32;
        format!("{} at ({},{}) - {}%", name, self.x, self.y, pct)
    }
}
