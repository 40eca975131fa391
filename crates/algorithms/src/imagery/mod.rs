//! Imagery analysis algorithms
//!
//! - Normalize: min-max rescaling of a band to [0, 1]
//! - Normalized difference: generic two-band index with a zero-denominator policy
//! - NDVI

mod indices;
mod normalize;

pub use indices::{ndvi, normalized_difference, ZeroDenominator};
pub use normalize::{normalize, normalize_with, Normalize, NormalizeParams, DEFAULT_EPSILON};
