//! Preprocessor configuration
//!
//! Fixed at construction: target image size, band stacking order and an
//! optional seed for synthetic placeholder bands.

use serde::{Deserialize, Serialize};

use canopy_core::{Error, Result};

use super::bands::Band;

/// Default target image size (rows, cols)
pub const DEFAULT_IMAGE_SIZE: (usize, usize) = (256, 256);

/// Largest side produced by [`PreprocessorConfig::for_region_km`]
pub const MAX_REGION_DIMENSION: usize = 512;

/// Pixels added to the 256 px base per kilometre of region size
const PIXELS_PER_KM: f64 = 2.0;

/// Immutable configuration for a [`FeatureExtractor`](super::FeatureExtractor).
///
/// Deserialization runs the same validation as the constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConfigFile", into = "ConfigFile")]
pub struct PreprocessorConfig {
    rows: usize,
    cols: usize,
    band_order: Vec<Band>,
    seed: Option<u64>,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_IMAGE_SIZE.0,
            cols: DEFAULT_IMAGE_SIZE.1,
            band_order: Band::CANONICAL.to_vec(),
            seed: None,
        }
    }
}

impl PreprocessorConfig {
    /// Configuration for a `rows x cols` target image with the canonical
    /// band order.
    ///
    /// Both sides must be positive and `rows * cols` must fit in `usize`.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        check_size(rows, cols)?;
        Ok(Self {
            rows,
            cols,
            ..Self::default()
        })
    }

    /// Square configuration sized for a region of `size_km` kilometres.
    ///
    /// The side is `256 + 2 * size_km` pixels, capped at
    /// [`MAX_REGION_DIMENSION`]: 50 km gives 356 px, 128 km and above give
    /// 512 px.
    pub fn for_region_km(size_km: f64) -> Result<Self> {
        if !size_km.is_finite() || size_km < 0.0 {
            return Err(Error::InvalidParameter {
                name: "size_km",
                value: size_km.to_string(),
                reason: "must be a non-negative finite number".to_string(),
            });
        }

        let side = (DEFAULT_IMAGE_SIZE.0 as f64 + PIXELS_PER_KM * size_km)
            .min(MAX_REGION_DIMENSION as f64)
            .round() as usize;
        Self::new(side, side)
    }

    /// Replace the band stacking order.
    ///
    /// The order must contain NIR and RED and no band twice.
    pub fn with_band_order(mut self, band_order: Vec<Band>) -> Result<Self> {
        check_band_order(&band_order)?;
        self.band_order = band_order;
        Ok(self)
    }

    /// Seed synthetic placeholder bands so repeated calls are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Target image size as (rows, cols)
    pub fn image_size(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Band stacking order
    pub fn band_order(&self) -> &[Band] {
        &self.band_order
    }

    /// Position of `band` along the band axis of a stacked observation
    pub fn band_index(&self, band: Band) -> Option<usize> {
        self.band_order.iter().position(|&b| b == band)
    }

    /// Seed for synthetic bands, if any
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

fn check_size(rows: usize, cols: usize) -> Result<()> {
    if rows == 0 || cols == 0 || rows.checked_mul(cols).is_none() {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    Ok(())
}

fn check_band_order(order: &[Band]) -> Result<()> {
    for required in [Band::Nir, Band::Red] {
        if !order.contains(&required) {
            return Err(Error::InvalidParameter {
                name: "band_order",
                value: format!("{:?}", order),
                reason: format!("missing {}", required),
            });
        }
    }

    for (i, band) in order.iter().enumerate() {
        if order[..i].contains(band) {
            return Err(Error::InvalidParameter {
                name: "band_order",
                value: format!("{:?}", order),
                reason: format!("{} listed twice", band),
            });
        }
    }

    Ok(())
}

/// On-disk form of [`PreprocessorConfig`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    image_size: (usize, usize),
    bands: Vec<Band>,
    seed: Option<u64>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        PreprocessorConfig::default().into()
    }
}

impl From<PreprocessorConfig> for ConfigFile {
    fn from(config: PreprocessorConfig) -> Self {
        Self {
            image_size: (config.rows, config.cols),
            bands: config.band_order,
            seed: config.seed,
        }
    }
}

impl TryFrom<ConfigFile> for PreprocessorConfig {
    type Error = Error;

    fn try_from(file: ConfigFile) -> Result<Self> {
        let (rows, cols) = file.image_size;
        let config = Self::new(rows, cols)?.with_band_order(file.bands)?;
        Ok(match file.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        })
    }
}
