/// Template matching module for locating small templates in luma frames
///
/// This module provides:
/// - A zero-mean normalized correlation coefficient in [-1, 1]
/// - imageproc's normalized cross-correlation as an alternative score
/// - Global-maximum search with a deterministic row-major tie-break
/// - BT.601 luma conversion for frames and templates
pub mod luma;
pub mod matcher;
pub mod types;

pub use luma::to_luma;
pub use matcher::{TemplateMatcher, best_match, correlation_map};
pub use types::{CorrelationMethod, ScoreMap, ScoredLocation};
