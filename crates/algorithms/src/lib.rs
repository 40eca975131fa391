//! # Canopy Algorithms
//!
//! Satellite band preprocessing for canopy.
//!
//! ## Modules
//!
//! - **imagery**: Band normalization, normalized difference, NDVI
//! - **features**: Observation model and the NDVI feature extractor

pub mod features;
pub mod imagery;
mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::features::{
        parse_grid, parse_observation, Band, BandSource, FeatureBundle, FeatureExtractor,
        FeatureReport, IndexStatistics, Preprocess, PreprocessorConfig, SatelliteObservation,
        StructuredBands, NIR_BAND_KEY, RED_BAND_KEY,
    };
    pub use crate::imagery::{
        ndvi, normalize, normalize_with, normalized_difference, Normalize, NormalizeParams,
        ZeroDenominator,
    };
    pub use canopy_core::prelude::*;
}
