//! Score model and the report fragments generated from it.

pub mod content;
pub mod score;
pub mod template;

pub use score::{format_score, Dimension, DimensionScores, MAX_DIMENSION_SCORE};
pub use template::DEFAULT_PAGE;
