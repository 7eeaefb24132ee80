//! Shared test support for the urban-heat dashboard workspace.
//!
//! - `generators`: synthetic Landsat bands (the NDVI/LST formulas run
//!   backwards), population grids and point layouts
//! - `fixtures`: a square test municipality and canned IBGE/ViaCEP payloads

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Assert two numbers differ by at most `tolerance`.
///
/// ```ignore
/// test_utils::assert_close!(ndvi, 0.6, 1e-5);
/// ```
#[macro_export]
macro_rules! assert_close {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let (actual, expected, tolerance) = ($actual as f64, $expected as f64, $tolerance as f64);
        assert!(
            (actual - expected).abs() <= tolerance,
            "{} = {actual}, expected {expected} ± {tolerance}",
            stringify!($actual)
        );
    }};
}
