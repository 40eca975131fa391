//! Satellite observations accepted by the feature extractor

use std::collections::HashMap;

use ndarray::{Array2, Array3, ArrayD, Ix3, IxDyn};

use canopy_core::raster::Raster;

/// Key of the near-infrared band in a structured observation
pub const NIR_BAND_KEY: &str = "nirBand";

/// Key of the red band in a structured observation
pub const RED_BAND_KEY: &str = "redBand";

/// Named raw bands; keys other than [`NIR_BAND_KEY`] and [`RED_BAND_KEY`]
/// are carried but not read.
pub type StructuredBands = HashMap<String, Raster<f64>>;

/// Raw satellite data in one of the supported calling conventions.
#[derive(Debug, Clone, Default)]
pub enum SatelliteObservation {
    /// No imagery available
    #[default]
    NoData,
    /// Bands keyed by name (`nirBand`, `redBand`, ...)
    Structured(StructuredBands),
    /// `rows x cols x band` array in the configured band order
    Stacked(Array3<f64>),
    /// Array with no usable band axis (2-D, 1-D, 4-D, ...)
    Unbanded(ArrayD<f64>),
}

impl SatelliteObservation {
    /// Structured observation from optional NIR and red bands
    pub fn from_bands(nir: Option<Raster<f64>>, red: Option<Raster<f64>>) -> Self {
        let mut bands = StructuredBands::new();
        if let Some(nir) = nir {
            bands.insert(NIR_BAND_KEY.to_string(), nir);
        }
        if let Some(red) = red {
            bands.insert(RED_BAND_KEY.to_string(), red);
        }
        Self::Structured(bands)
    }

    /// Classify an array of any dimensionality: 3-D arrays are stacked,
    /// everything else is unbanded.
    pub fn from_array(array: ArrayD<f64>) -> Self {
        if array.ndim() != 3 {
            return Self::Unbanded(array);
        }
        // ndim was checked above, so the conversion cannot fail
        array
            .into_dimensionality::<Ix3>()
            .map_or_else(|_| Self::Unbanded(ArrayD::zeros(IxDyn(&[0]))), Self::Stacked)
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoData => "no-data",
            Self::Structured(_) => "structured",
            Self::Stacked(_) => "stacked",
            Self::Unbanded(_) => "unbanded",
        }
    }

    /// Whether this is the no-data sentinel
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

impl From<StructuredBands> for SatelliteObservation {
    fn from(bands: StructuredBands) -> Self {
        Self::Structured(bands)
    }
}

impl From<Array3<f64>> for SatelliteObservation {
    fn from(stack: Array3<f64>) -> Self {
        Self::Stacked(stack)
    }
}

impl From<Array2<f64>> for SatelliteObservation {
    fn from(grid: Array2<f64>) -> Self {
        Self::Unbanded(grid.into_dyn())
    }
}

impl<T> From<Option<T>> for SatelliteObservation
where
    T: Into<SatelliteObservation>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NoData, Into::into)
    }
}
