//! Shared test utilities for the climate-agg workspace.
//!
//! This crate provides common testing infrastructure including:
//! - A scriptable fake remote raster service with call counters
//! - Grid data generators
//! - Approximate float assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{FakeRasterService, assert_approx_eq};
//! ```

pub mod fake_service;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fake_service::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert every value of a raster is within `epsilon` of `expected`.
#[macro_export]
macro_rules! assert_raster_approx_eq {
    ($raster:expr, $expected:expr, $epsilon:expr) => {{
        for (i, v) in $raster.data.iter().enumerate() {
            let diff = (*v as f64 - $expected as f64).abs();
            if diff > $epsilon as f64 {
                panic!(
                    "raster value {} at index {} differs from {} by {}",
                    v, i, $expected, diff
                );
            }
        }
    }};
}
