//! Image rendering for earth-observation layers.
//!
//! Implements:
//! - Color ramps driven by visualization parameters (min/max/palette)
//! - Nearest-neighbour thumbnail downsampling
//! - PNG encoding (indexed when the palette fits, RGBA otherwise)
//! - `data:` URI encoding and decoding for embedding thumbnails

pub mod data_uri;
pub mod gradient;
pub mod png;

pub use data_uri::{decode_data_uri, encode_png_data_uri};
pub use gradient::{Color, ColorRamp, VisParams};
