//! Normalized difference indices
//!
//! `(band_a - band_b) / (band_a + band_b)` computed cell by cell, with an
//! explicit policy for cells where the denominator is exactly zero.

use num_traits::Float;
use canopy_core::raster::{Raster, RasterElement};
use canopy_core::{Error, Result};

use crate::maybe_rayon::collect_rows;

/// What to write where `band_a + band_b == 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroDenominator {
    /// Substitute 0
    #[default]
    Zero,
    /// Mark the cell as no-data (NaN)
    NoData,
}

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in [-1, 1] wherever both inputs are non-negative. Cells where
/// either input is no-data (NaN or the band's sentinel) are NaN. Cells where
/// the sum is exactly zero follow `on_zero`.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
/// * `on_zero` - Policy for a zero denominator
pub fn normalized_difference<T>(
    band_a: &Raster<T>,
    band_b: &Raster<T>,
    on_zero: ZeroDenominator,
) -> Result<Raster<T>>
where
    T: RasterElement + Float,
{
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();
    let zero_value = match on_zero {
        ZeroDenominator::Zero => T::zero(),
        ZeroDenominator::NoData => T::nan(),
    };

    let data: Vec<T> = collect_rows(rows, |row| {
        let mut row_data = vec![T::nan(); cols];
        for (col, cell) in row_data.iter_mut().enumerate() {
            // SAFETY: row < rows and col < cols, and both bands share the shape
            let a = unsafe { band_a.get_unchecked(row, col) };
            let b = unsafe { band_b.get_unchecked(row, col) };

            if a.is_nodata(nodata_a) || b.is_nodata(nodata_b) {
                continue;
            }

            let sum = a + b;
            *cell = if sum == T::zero() {
                zero_value
            } else {
                (a - b) / sum
            };
        }
        row_data
    });

    let mut output = Raster::from_vec(data, rows, cols)?;
    output.set_nodata(Some(T::nan()));
    Ok(output)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Values range from -1 to 1:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil: 0.1 to 0.2
/// - Water/clouds: -1.0 to 0.0
///
/// Cells where NIR + Red is exactly zero are set to 0, never NaN or
/// infinity.
///
/// # Arguments
/// * `nir` - Near-infrared band
/// * `red` - Red band
pub fn ndvi<T>(nir: &Raster<T>, red: &Raster<T>) -> Result<Raster<T>>
where
    T: RasterElement + Float,
{
    normalized_difference(nir, red, ZeroDenominator::Zero)
}

fn check_dimensions<T: RasterElement>(a: &Raster<T>, b: &Raster<T>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}
