//! Min-max band normalization
//!
//! Rescales a band to the unit interval:
//!
//! `band' = (band - min) / (max - min + eps)`
//!
//! The `eps` term keeps constant (zero-variance) bands finite: they map to
//! all zeros instead of dividing by zero. Arithmetic is done in f64 whatever
//! the cell type.

use num_traits::Float;
use canopy_core::raster::{Raster, RasterElement};
use canopy_core::{Algorithm, Error, Result};

use crate::maybe_rayon::map_inplace;

/// Denominator guard used when no other epsilon is requested
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Parameters for band normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeParams {
    /// Added to `max - min` before dividing. Default: 1e-8
    pub epsilon: f64,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

/// Min-max normalization algorithm
#[derive(Debug, Clone, Default)]
pub struct Normalize;

impl Algorithm for Normalize {
    type Input = Raster<f32>;
    type Output = Raster<f32>;
    type Params = NormalizeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Normalize"
    }

    fn description(&self) -> &'static str {
        "Min-max rescaling of a band to the [0, 1] interval"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        if params.epsilon <= 0.0 || !params.epsilon.is_finite() {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                value: params.epsilon.to_string(),
                reason: "must be a positive finite number".to_string(),
            });
        }
        Ok(normalize_with(&input, params))
    }
}

/// Normalize a band to [0, 1] with the default epsilon.
///
/// See [`normalize_with`].
pub fn normalize<T>(band: &Raster<T>) -> Raster<T>
where
    T: RasterElement + Float,
{
    normalize_with(band, NormalizeParams::default())
}

/// Normalize a band to [0, 1].
///
/// The minimum valid value maps to 0 and the maximum to just under 1.
/// No-data cells (including NaN) are left untouched and do not take part in
/// the min/max search. A constant band becomes all zeros. An empty or
/// all-no-data band is returned unchanged.
///
/// Output has the same shape and no-data value as the input.
pub fn normalize_with<T>(band: &Raster<T>, params: NormalizeParams) -> Raster<T>
where
    T: RasterElement + Float,
{
    let mut output = band.clone();

    let Some((min, max)) = valid_range(band) else {
        return output;
    };

    let (Some(lo), Some(hi)) = (min.to_f64(), max.to_f64()) else {
        return output;
    };

    // Halved operands keep `hi - lo` finite for bands spanning the whole
    // float range.
    let half_lo = lo * 0.5;
    let denom = (hi * 0.5 - half_lo) + params.epsilon * 0.5;
    let nodata = band.nodata();

    map_inplace(output.data_mut(), move |v| {
        if v.is_nodata(nodata) {
            return v;
        }
        v.to_f64()
            .map(|x| (x * 0.5 - half_lo) / denom)
            .and_then(<T as RasterElement>::from_f64)
            .unwrap_or(v)
    });

    output
}

/// Minimum and maximum over valid cells, `None` when there are none
fn valid_range<T>(band: &Raster<T>) -> Option<(T, T)>
where
    T: RasterElement + Float,
{
    let nodata = band.nodata();
    band.iter()
        .copied()
        .filter(|v| !v.is_nodata(nodata))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
