//! Row-parallel helpers that fall back to sequential loops.
//!
//! With the `parallel` feature enabled the work is spread over rayon's
//! global pool; without it everything runs on the caller's thread, which is
//! the default for the preprocessing pipeline.

use ndarray::Array2;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Build a row-major buffer by evaluating `row_fn` for every row index.
///
/// `row_fn` must return exactly one row's worth of values.
pub(crate) fn collect_rows<T, F>(rows: usize, row_fn: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        (0..rows).into_par_iter().flat_map(row_fn).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        (0..rows).flat_map(row_fn).collect()
    }
}

/// Replace every cell of `array` with `f(cell)`.
pub(crate) fn map_inplace<T, F>(array: &mut Array2<T>, f: F)
where
    T: Clone + Send + Sync,
    F: Fn(T) -> T + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        array.par_mapv_inplace(f);
    }

    #[cfg(not(feature = "parallel"))]
    {
        array.mapv_inplace(f);
    }
}
