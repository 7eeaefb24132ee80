//! `data:` URI helpers for embedding thumbnails in prompts and JSON.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use heat_common::{HeatError, HeatResult};

pub const PNG_MIME: &str = "image/png";

/// Encode PNG bytes as `data:image/png;base64,...`.
pub fn encode_png_data_uri(png: &[u8]) -> String {
    encode_data_uri(PNG_MIME, png)
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Split a base64 data URI into its MIME type and decoded payload.
pub fn decode_data_uri(uri: &str) -> HeatResult<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| HeatError::InvalidImage("not a data URI".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| HeatError::InvalidImage("data URI has no payload".to_string()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| HeatError::InvalidImage("only base64 data URIs are supported".to_string()))?;

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| HeatError::InvalidImage(format!("bad base64 payload: {e}")))?;
    Ok((mime.to_string(), bytes))
}
