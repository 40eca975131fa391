//! JSON payloads for satellite observations
//!
//! Accepted shapes:
//! - `null`: no data
//! - `[[[...]]]`: stacked `rows x cols x band` array
//! - `[[...]]` or `[...]`: array without a band axis
//! - `{"nirBand": ..., "redBand": ...}`: structured bands, each given as rows
//!   or as a flat row-major pixel list
//!
//! `null` pixels become NaN. Ragged arrays are not an error: they degrade to
//! an unbanded observation (or a missing band), which the extractor fills in.

use ndarray::{Array1, Array3, ArrayD, IxDyn};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use canopy_core::raster::Raster;

use super::config::PreprocessorConfig;
use super::observation::{SatelliteObservation, StructuredBands};

/// A deserialized observation payload, before band resolution
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ObservationPayload {
    Stacked(Vec<Vec<Vec<Option<f64>>>>),
    Grid(Vec<Vec<Option<f64>>>),
    Flat(Vec<Option<f64>>),
    Structured(Map<String, Value>),
}

/// One band inside a structured payload
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BandPayload {
    Grid(Vec<Vec<Option<f64>>>),
    Flat(Vec<Option<f64>>),
}

/// Parse a JSON document into an observation.
///
/// Only malformed JSON (or JSON that is neither null, an array of numbers
/// nor an object) is an error.
pub fn parse_observation(json: &str, config: &PreprocessorConfig) -> serde_json::Result<SatelliteObservation> {
    let payload: Option<ObservationPayload> = serde_json::from_str(json)?;
    Ok(payload.map_or(SatelliteObservation::NoData, |p| p.into_observation(config)))
}

/// Parse a JSON array of rows into a single band.
///
/// `null` cells become NaN. Ragged rows are reported as a JSON data error.
pub fn parse_grid(json: &str) -> serde_json::Result<Raster<f64>> {
    let rows: Vec<Vec<Option<f64>>> = serde_json::from_str(json)?;
    Raster::from_rows(fill_nan_rows(rows)).map_err(serde::de::Error::custom)
}

impl ObservationPayload {
    /// Convert to an observation. Flat structured bands whose length equals
    /// the configured pixel count are reshaped to the configured size.
    pub fn into_observation(self, config: &PreprocessorConfig) -> SatelliteObservation {
        match self {
            Self::Stacked(cube) => stacked(cube),
            Self::Grid(grid) => match Raster::from_rows(fill_nan_rows(grid)) {
                Ok(raster) => SatelliteObservation::Unbanded(raster.into_array().into_dyn()),
                Err(e) => {
                    debug!(error = %e, "ragged grid payload");
                    SatelliteObservation::Unbanded(empty())
                }
            },
            Self::Flat(values) => {
                SatelliteObservation::Unbanded(Array1::from(fill_nan(values)).into_dyn())
            }
            Self::Structured(map) => SatelliteObservation::Structured(structured(map, config)),
        }
    }
}

fn stacked(cube: Vec<Vec<Vec<Option<f64>>>>) -> SatelliteObservation {
    let rows = cube.len();
    let cols = cube.first().map_or(0, Vec::len);
    let depth = cube
        .first()
        .and_then(|row| row.first())
        .map_or(0, Vec::len);

    let mut data = Vec::with_capacity(rows * cols * depth);
    for row in cube {
        if row.len() != cols {
            debug!(expected = cols, got = row.len(), "ragged stacked payload");
            return SatelliteObservation::Unbanded(empty());
        }
        for pixel in row {
            if pixel.len() != depth {
                debug!(expected = depth, got = pixel.len(), "ragged band axis in stacked payload");
                return SatelliteObservation::Unbanded(empty());
            }
            data.extend(fill_nan(pixel));
        }
    }

    match Array3::from_shape_vec((rows, cols, depth), data) {
        Ok(stack) => SatelliteObservation::Stacked(stack),
        Err(e) => {
            debug!(error = %e, "invalid stacked payload");
            SatelliteObservation::Unbanded(empty())
        }
    }
}

fn structured(map: Map<String, Value>, config: &PreprocessorConfig) -> StructuredBands {
    let (rows, cols) = config.image_size();
    let mut bands = StructuredBands::new();

    for (key, value) in map {
        let band = match BandPayload::deserialize(value) {
            Ok(band) => band,
            Err(_) => {
                debug!(%key, "skipping non-band field");
                continue;
            }
        };

        let raster = match band {
            BandPayload::Grid(grid) => Raster::from_rows(fill_nan_rows(grid)),
            BandPayload::Flat(values) if values.len() == rows * cols => {
                Raster::from_vec(fill_nan(values), rows, cols)
            }
            BandPayload::Flat(values) => {
                let len = values.len();
                Raster::from_vec(fill_nan(values), 1, len)
            }
        };

        match raster {
            Ok(raster) => {
                bands.insert(key, raster);
            }
            Err(e) => debug!(%key, error = %e, "skipping malformed band"),
        }
    }

    bands
}

fn fill_nan(values: Vec<Option<f64>>) -> Vec<f64> {
    values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

fn fill_nan_rows(rows: Vec<Vec<Option<f64>>>) -> Vec<Vec<f64>> {
    rows.into_iter().map(fill_nan).collect()
}

fn empty() -> ArrayD<f64> {
    ArrayD::zeros(IxDyn(&[0]))
}
