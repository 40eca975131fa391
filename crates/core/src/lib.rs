//! # Canopy Core
//!
//! Core types and traits for the canopy satellite preprocessing pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic 2D band grid backed by `ndarray`
//! - `RasterElement`: Bound on cell value types
//! - `RasterStatistics`: NaN-aware summary statistics
//! - `Algorithm`: Common trait for pipeline stages

pub mod error;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{Raster, RasterElement, RasterStatistics};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{Raster, RasterElement, RasterStatistics};
    pub use crate::Algorithm;
}

/// Core trait for pipeline stages.
///
/// Stages are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
