//! Feature extraction from raw satellite observations
//!
//! - **observation**: structured, stacked and unbanded input conventions
//! - **config**: immutable image size / band order / seed
//! - **extractor**: NIR/red resolution, NDVI, normalized feature bundle
//! - **payload**: JSON marshalling of observations
//! - **synthetic**: placeholder bands for missing inputs

mod bands;
mod config;
mod extractor;
mod observation;
pub mod payload;
mod synthetic;

pub use bands::Band;
pub use config::{PreprocessorConfig, DEFAULT_IMAGE_SIZE, MAX_REGION_DIMENSION};
pub use extractor::{
    BandSource, FeatureBundle, FeatureExtractor, FeatureReport, IndexStatistics, Preprocess,
};
pub use observation::{SatelliteObservation, StructuredBands, NIR_BAND_KEY, RED_BAND_KEY};
pub use payload::{parse_grid, parse_observation, ObservationPayload};
pub use synthetic::{synthetic_band, SYNTHETIC_NIR_MAX, SYNTHETIC_RED_MAX};
