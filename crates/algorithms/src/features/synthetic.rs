//! Synthetic placeholder bands
//!
//! Substituted for bands the observation does not provide, so the pipeline
//! always yields a well-shaped bundle. Values are uniform on `[0, max)` in
//! raw reflectance units.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use canopy_core::raster::Raster;
use canopy_core::Result;

/// Upper bound of synthetic NIR values
pub const SYNTHETIC_NIR_MAX: f32 = 255.0;

/// Upper bound of synthetic red values
pub const SYNTHETIC_RED_MAX: f32 = 200.0;

/// Random source for one extraction call.
///
/// Seeded from the configuration when a seed is set, otherwise from the
/// thread-local generator. Never shared between calls.
pub(crate) fn band_rng(seed: Option<u64>) -> StdRng {
    let seed = seed.unwrap_or_else(|| rand::rng().random::<u64>());
    StdRng::seed_from_u64(seed)
}

/// Generate a `rows x cols` band of uniform values on `[0, max)`.
///
/// Fails only when the band cannot be allocated.
pub fn synthetic_band(rng: &mut StdRng, rows: usize, cols: usize, max: f32) -> Result<Raster<f32>> {
    let mut band = Raster::try_filled(rows, cols, 0.0f32)?;
    for value in band.data_mut().iter_mut() {
        *value = rng.random::<f32>() * max;
    }
    Ok(band)
}
