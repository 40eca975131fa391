//! Feature extraction: raw observation to normalized NDVI bundle
//!
//! Pipeline per call:
//! 1. Resolve NIR and red from the observation, substituting synthetic
//!    placeholders for anything missing or mis-shaped
//! 2. Cast both to f32
//! 3. NDVI with zero-denominator cells set to 0
//! 4. Min-max normalize NDVI, NIR and red; mean of raw NDVI ignoring NaN
//!
//! Missing or malformed input never fails. Buffers sized from the
//! configuration alone (the zero bundle, synthetic bands) are reserved
//! fallibly and report `AllocationFailed`. Layers derived from bands already
//! in memory (NDVI, the normalized copies) allocate like any ndarray.

use ndarray::{ArrayView2, Axis};
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, warn};

use canopy_core::raster::{Raster, RasterElement, RasterStatistics};
use canopy_core::{Algorithm, Error, Result};

use crate::imagery::{ndvi, normalize};

use super::bands::Band;
use super::config::PreprocessorConfig;
use super::observation::{SatelliteObservation, NIR_BAND_KEY, RED_BAND_KEY};
use super::synthetic::{band_rng, synthetic_band, SYNTHETIC_NIR_MAX, SYNTHETIC_RED_MAX};

/// Normalized layers and summary produced for one observation.
///
/// Serializes with exactly the keys `ndvi`, `nir`, `red` and `ndvi_mean`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureBundle {
    /// NDVI rescaled to [0, 1]
    pub ndvi: Raster<f32>,
    /// NIR rescaled to [0, 1]
    pub nir: Raster<f32>,
    /// Red rescaled to [0, 1]
    pub red: Raster<f32>,
    /// Mean of raw (pre-normalization) NDVI over valid pixels; NaN when
    /// there are none
    pub ndvi_mean: f64,
}

impl FeatureBundle {
    /// All-zero bundle of the given size with `ndvi_mean == 0.0`.
    ///
    /// Each layer is reserved separately, so any of the three can report
    /// `AllocationFailed`.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        Ok(Self {
            ndvi: Raster::try_filled(rows, cols, 0.0f32)?,
            nir: Raster::try_filled(rows, cols, 0.0f32)?,
            red: Raster::try_filled(rows, cols, 0.0f32)?,
            ndvi_mean: 0.0,
        })
    }

    /// Spatial shape shared by every layer
    pub fn shape(&self) -> (usize, usize) {
        self.ndvi.shape()
    }
}

/// Where a resolved band came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandSource {
    /// Read from the observation
    Observed,
    /// Generated because the observation lacked a usable band
    Synthetic,
    /// Zero default for a no-data observation
    Empty,
}

/// Summary of raw NDVI values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub valid_pixels: usize,
    pub total_pixels: usize,
}

impl From<RasterStatistics<f32>> for IndexStatistics {
    fn from(stats: RasterStatistics<f32>) -> Self {
        let to_f64 = |v: Option<f32>| v.map_or(f64::NAN, f64::from);
        Self {
            min: to_f64(stats.min),
            max: to_f64(stats.max),
            mean: stats.mean.unwrap_or(f64::NAN),
            std_dev: stats.std_dev.unwrap_or(f64::NAN),
            valid_pixels: stats.valid_count,
            total_pixels: stats.valid_count + stats.nodata_count,
        }
    }
}

/// Feature bundle plus what went into it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureReport {
    pub bundle: FeatureBundle,
    pub ndvi_stats: IndexStatistics,
    pub nir_source: BandSource,
    pub red_source: BandSource,
}

impl FeatureReport {
    /// Whether any layer was synthesized or defaulted instead of observed
    pub fn is_partial(&self) -> bool {
        self.nir_source != BandSource::Observed || self.red_source != BandSource::Observed
    }
}

/// Extracts NDVI features from satellite observations.
///
/// Holds only its configuration; every call is independent and the
/// extractor can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: PreprocessorConfig,
}

impl FeatureExtractor {
    pub fn new(config: PreprocessorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    /// Pipeline entry point; identical to [`extract_features`](Self::extract_features).
    pub fn preprocess(&self, observation: &SatelliteObservation) -> Result<FeatureBundle> {
        self.extract_features(observation)
    }

    /// Produce the normalized `{ndvi, nir, red, ndvi_mean}` bundle.
    ///
    /// A no-data observation yields an all-zero bundle of the configured
    /// size. Missing, mis-shaped or unbanded inputs are replaced by
    /// synthetic bands.
    pub fn extract_features(&self, observation: &SatelliteObservation) -> Result<FeatureBundle> {
        Ok(self.extract_report(observation)?.bundle)
    }

    /// Same as [`extract_features`](Self::extract_features), also reporting
    /// raw NDVI statistics and the provenance of NIR and red.
    pub fn extract_report(&self, observation: &SatelliteObservation) -> Result<FeatureReport> {
        let (rows, cols) = self.config.image_size();
        debug!(kind = observation.kind(), rows, cols, "extracting features");

        let Some(resolved) = self.resolve_bands(observation)? else {
            let bundle = FeatureBundle::zeros(rows, cols)?;
            let ndvi_stats = bundle.ndvi.statistics().into();
            return Ok(FeatureReport {
                bundle,
                ndvi_stats,
                nir_source: BandSource::Empty,
                red_source: BandSource::Empty,
            });
        };

        let raw_ndvi = ndvi(&resolved.nir, &resolved.red)?;
        let ndvi_stats: IndexStatistics = raw_ndvi.statistics().into();
        debug!(
            ndvi_mean = ndvi_stats.mean,
            valid = ndvi_stats.valid_pixels,
            total = ndvi_stats.total_pixels,
            "raw NDVI computed"
        );

        let bundle = FeatureBundle {
            ndvi: normalize(&raw_ndvi),
            nir: normalize(&resolved.nir),
            red: normalize(&resolved.red),
            ndvi_mean: ndvi_stats.mean,
        };

        Ok(FeatureReport {
            bundle,
            ndvi_stats,
            nir_source: resolved.nir_source,
            red_source: resolved.red_source,
        })
    }

    /// NIR and red as f32 rasters of the configured size; `None` for a
    /// no-data observation.
    fn resolve_bands(&self, observation: &SatelliteObservation) -> Result<Option<ResolvedBands>> {
        let (nir, red) = match observation {
            SatelliteObservation::NoData => return Ok(None),
            SatelliteObservation::Structured(bands) => (
                bands
                    .get(NIR_BAND_KEY)
                    .and_then(|b| self.accept(b.view(), b.nodata(), Band::Nir)),
                bands
                    .get(RED_BAND_KEY)
                    .and_then(|b| self.accept(b.view(), b.nodata(), Band::Red)),
            ),
            SatelliteObservation::Stacked(stack) => {
                let layer = |band: Band| {
                    let index = self.config.band_index(band)?;
                    if index >= stack.len_of(Axis(2)) {
                        warn!(%band, index, depth = stack.len_of(Axis(2)), "band missing from stack");
                        return None;
                    }
                    self.accept(stack.index_axis(Axis(2), index), None, band)
                };
                (layer(Band::Nir), layer(Band::Red))
            }
            SatelliteObservation::Unbanded(array) => {
                warn!(shape = ?array.shape(), "observation has no band axis");
                (None, None)
            }
        };

        let mut rng = None;
        let (nir, nir_source) = self.or_synthetic(nir, Band::Nir, SYNTHETIC_NIR_MAX, &mut rng)?;
        let (red, red_source) = self.or_synthetic(red, Band::Red, SYNTHETIC_RED_MAX, &mut rng)?;

        Ok(Some(ResolvedBands {
            nir,
            red,
            nir_source,
            red_source,
        }))
    }

    /// Cast an observed band to f32 if it has the configured shape.
    ///
    /// Cells matching the band's no-data sentinel become NaN.
    fn accept(&self, band: ArrayView2<'_, f64>, nodata: Option<f64>, name: Band) -> Option<Raster<f32>> {
        let expected = self.config.image_size();
        if band.dim() != expected {
            warn!(
                %name,
                got = ?band.dim(),
                expected = ?expected,
                "band shape does not match configured image size"
            );
            return None;
        }

        let cast = band.mapv(|v| if v.is_nodata(nodata) { f32::NAN } else { v as f32 });
        Some(Raster::from_array(cast))
    }

    fn or_synthetic(
        &self,
        band: Option<Raster<f32>>,
        name: Band,
        max: f32,
        rng: &mut Option<StdRng>,
    ) -> Result<(Raster<f32>, BandSource)> {
        if let Some(band) = band {
            return Ok((band, BandSource::Observed));
        }

        warn!(%name, "substituting synthetic band");
        let (rows, cols) = self.config.image_size();
        let rng = rng.get_or_insert_with(|| band_rng(self.config.seed()));
        Ok((synthetic_band(rng, rows, cols, max)?, BandSource::Synthetic))
    }
}

struct ResolvedBands {
    nir: Raster<f32>,
    red: Raster<f32>,
    nir_source: BandSource,
    red_source: BandSource,
}

/// Preprocessing pipeline as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct Preprocess;

impl Algorithm for Preprocess {
    type Input = SatelliteObservation;
    type Output = FeatureBundle;
    type Params = PreprocessorConfig;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Preprocess"
    }

    fn description(&self) -> &'static str {
        "Normalize NIR/red bands and compute NDVI features from a satellite observation"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        FeatureExtractor::new(params).preprocess(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    fn extractor(rows: usize, cols: usize) -> FeatureExtractor {
        FeatureExtractor::new(PreprocessorConfig::new(rows, cols).unwrap().with_seed(11))
    }

    fn band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        Raster::filled(rows, cols, value)
    }

    #[test]
    fn test_no_data_gives_zero_bundle() {
        let report = extractor(8, 6)
            .extract_report(&SatelliteObservation::NoData)
            .unwrap();

        assert_eq!(report.bundle, FeatureBundle::zeros(8, 6).unwrap());
        assert_eq!(report.bundle.ndvi_mean, 0.0);
        assert_eq!(report.nir_source, BandSource::Empty);
        assert_eq!(report.ndvi_stats.mean, 0.0);
        assert!(report.is_partial());
    }

    #[test]
    fn test_structured_constant_bands() {
        let obs = SatelliteObservation::from_bands(Some(band(4, 4, 300.0)), Some(band(4, 4, 100.0)));
        let report = extractor(4, 4).extract_report(&obs).unwrap();

        assert_eq!(report.bundle.ndvi_mean, 0.5);
        assert!(report.bundle.ndvi.iter().all(|&v| v == 0.0));
        assert!(report.bundle.nir.iter().all(|&v| v == 0.0));
        assert!(!report.is_partial());
        assert_eq!(report.ndvi_stats.valid_pixels, 16);
    }

    #[test]
    fn test_missing_band_is_synthesized() {
        let obs = SatelliteObservation::from_bands(None, Some(band(4, 4, 100.0)));
        let report = extractor(4, 4).extract_report(&obs).unwrap();

        assert_eq!(report.nir_source, BandSource::Synthetic);
        assert_eq!(report.red_source, BandSource::Observed);
        assert_eq!(report.bundle.shape(), (4, 4));
        assert!(report.bundle.ndvi_mean.is_finite());
    }

    #[test]
    fn test_wrong_shape_is_synthesized() {
        let obs = SatelliteObservation::from_bands(Some(band(3, 3, 200.0)), Some(band(4, 4, 50.0)));
        let report = extractor(4, 4).extract_report(&obs).unwrap();

        assert_eq!(report.nir_source, BandSource::Synthetic);
        assert_eq!(report.bundle.nir.shape(), (4, 4));
    }

    #[test]
    fn test_stacked_band_indices() {
        let mut stack = Array3::<f64>::zeros((4, 4, 6));
        stack.index_axis_mut(Axis(2), 0).fill(50.0); // RED
        stack.index_axis_mut(Axis(2), 3).fill(200.0); // NIR

        let report = extractor(4, 4)
            .extract_report(&SatelliteObservation::Stacked(stack))
            .unwrap();

        assert!((report.bundle.ndvi_mean - 0.6).abs() < 1e-6);
        assert_eq!(report.nir_source, BandSource::Observed);
        assert_eq!(report.red_source, BandSource::Observed);
    }

    #[test]
    fn test_shallow_stack_falls_back() {
        let stack = Array3::<f64>::from_elem((4, 4, 2), 10.0);
        let report = extractor(4, 4)
            .extract_report(&SatelliteObservation::Stacked(stack))
            .unwrap();

        assert_eq!(report.nir_source, BandSource::Synthetic);
        assert_eq!(report.red_source, BandSource::Observed);
    }

    #[test]
    fn test_unbanded_falls_back() {
        let obs = SatelliteObservation::from(Array2::<f64>::ones((4, 4)));
        let report = extractor(4, 4).extract_report(&obs).unwrap();

        assert_eq!(report.nir_source, BandSource::Synthetic);
        assert_eq!(report.red_source, BandSource::Synthetic);
        assert_eq!(report.bundle.shape(), (4, 4));
    }

    #[test]
    fn test_nodata_sentinel_excluded_from_mean() {
        let mut nir = band(2, 2, 300.0);
        nir.set_nodata(Some(0.0));
        nir.set(0, 0, 0.0).unwrap();
        nir.set(0, 1, 900.0).unwrap();
        let obs = SatelliteObservation::from_bands(Some(nir), Some(band(2, 2, 100.0)));

        let report = extractor(2, 2).extract_report(&obs).unwrap();

        // (0.8 + 0.5 + 0.5) / 3
        assert_eq!(report.ndvi_stats.valid_pixels, 3);
        assert!((report.bundle.ndvi_mean - 0.6).abs() < 1e-6);
        assert!(report.bundle.ndvi.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_preprocess_matches_extract() {
        let obs = SatelliteObservation::from_bands(Some(band(3, 3, 7.0)), None);
        let ex = extractor(3, 3);
        assert_eq!(ex.preprocess(&obs).unwrap(), ex.extract_features(&obs).unwrap());
    }

    #[test]
    fn test_algorithm_impl() {
        let config = PreprocessorConfig::new(5, 5).unwrap();
        let bundle = Preprocess.execute(SatelliteObservation::NoData, config).unwrap();
        assert_eq!(bundle.shape(), (5, 5));

        let default = Preprocess.execute_default(SatelliteObservation::NoData).unwrap();
        assert_eq!(default.shape(), (256, 256));
    }

    #[test]
    fn test_oversized_config_reports_allocation_failure() {
        let huge = FeatureExtractor::new(PreprocessorConfig::new(1 << 31, 1 << 31).unwrap());

        let zero = huge.extract_features(&SatelliteObservation::NoData);
        assert!(
            matches!(zero, Err(Error::AllocationFailed { .. })),
            "No-data bundle should fail to allocate: {:?}",
            zero.map(|b| b.shape())
        );

        let synthetic = huge.extract_features(&SatelliteObservation::from_bands(None, None));
        assert!(matches!(synthetic, Err(Error::AllocationFailed { .. })));

        assert!(matches!(
            FeatureBundle::zeros(1 << 31, 1 << 31),
            Err(Error::AllocationFailed { .. })
        ));
    }

    #[test]
    fn test_extractor_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FeatureExtractor>();
    }
}
