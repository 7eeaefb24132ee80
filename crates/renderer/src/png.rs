//! PNG encoding for rendered layer thumbnails.
//!
//! Two encoding modes:
//! - **Indexed PNG (color type 3)** when the image has ≤256 unique colors.
//!   Palette ramps over a clipped municipality nearly always fit.
//! - **RGBA PNG (color type 6)** as the fallback.
//!
//! `create_png_auto` picks the mode; `create_png` always writes RGBA.

use rayon::prelude::*;
use std::collections::HashMap;
use std::io::Write;

use heat_common::{HeatError, HeatResult};

/// PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel palette extraction
const PARALLEL_THRESHOLD: usize = 4096; // 64x64 or larger

type Palette = Vec<(u8, u8, u8, u8)>;

/// Encode RGBA pixels, choosing indexed output when the colors fit.
pub fn create_png_auto(pixels: &[u8], width: usize, height: usize) -> HeatResult<Vec<u8>> {
    check_dimensions(pixels, width, height)?;

    let palette_result = if width * height >= PARALLEL_THRESHOLD {
        extract_palette_parallel(pixels)
    } else {
        extract_palette_sequential(pixels)
    };

    match palette_result {
        Some((palette, indices)) => create_png_indexed(width, height, &palette, &indices),
        None => create_png(pixels, width, height),
    }
}

fn check_dimensions(pixels: &[u8], width: usize, height: usize) -> HeatResult<()> {
    if width == 0 || height == 0 {
        return Err(HeatError::Render(format!("Cannot encode empty {width}x{height} image")));
    }
    if pixels.len() != width * height * 4 {
        return Err(HeatError::Render(format!(
            "Pixel buffer has {} bytes, expected {} for {}x{} RGBA",
            pixels.len(),
            width * height * 4,
            width,
            height
        )));
    }
    Ok(())
}

#[inline(always)]
fn pack_color(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}

#[inline(always)]
fn unpack_color(packed: u32) -> (u8, u8, u8, u8) {
    (
        packed as u8,
        (packed >> 8) as u8,
        (packed >> 16) as u8,
        (packed >> 24) as u8,
    )
}

/// Sequential palette extraction for small images.
fn extract_palette_sequential(pixels: &[u8]) -> Option<(Palette, Vec<u8>)> {
    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices: Vec<u8> = Vec::with_capacity(pixels.len() / 4);

    for chunk in pixels.chunks_exact(4) {
        let packed = pack_color(chunk[0], chunk[1], chunk[2], chunk[3]);

        let index = match color_to_index.get(&packed) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push((chunk[0], chunk[1], chunk[2], chunk[3]));
                color_to_index.insert(packed, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

/// Parallel palette extraction for larger images.
///
/// Unique colors are gathered per chunk, merged, and only then are pixels
/// mapped to indices, so the index pass never has to bail out halfway.
fn extract_palette_parallel(pixels: &[u8]) -> Option<(Palette, Vec<u8>)> {
    let chunk_pixels = (pixels.len() / 4 / rayon::current_num_threads()).max(256);

    let mut unique_colors: Vec<u32> = pixels
        .par_chunks(chunk_pixels * 4)
        .flat_map(|chunk| {
            let mut local: HashMap<u32, ()> = HashMap::with_capacity(MAX_PALETTE_SIZE);
            for pixel in chunk.chunks_exact(4) {
                local.insert(pack_color(pixel[0], pixel[1], pixel[2], pixel[3]), ());
                if local.len() > MAX_PALETTE_SIZE {
                    break;
                }
            }
            local.into_keys().collect::<Vec<_>>()
        })
        .collect();
    // Sorted so identical images always encode to identical bytes.
    unique_colors.sort_unstable();
    unique_colors.dedup();

    let mut global_colors: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    for packed in unique_colors {
        if !global_colors.contains_key(&packed) {
            if palette.len() >= MAX_PALETTE_SIZE {
                return None;
            }
            global_colors.insert(packed, palette.len() as u8);
            palette.push(unpack_color(packed));
        }
    }

    let indices: Vec<u8> = pixels
        .par_chunks_exact(4)
        .map(|p| {
            global_colors
                .get(&pack_color(p[0], p[1], p[2], p[3]))
                .copied()
                .unwrap_or(0)
        })
        .collect();

    Some((palette, indices))
}

/// Create an indexed PNG (color type 3) from palette and indices.
pub fn create_png_indexed(
    width: usize,
    height: usize,
    palette: &[(u8, u8, u8, u8)],
    indices: &[u8],
) -> HeatResult<Vec<u8>> {
    if indices.len() != width * height {
        return Err(HeatError::Render(format!(
            "Index buffer has {} entries, expected {}",
            indices.len(),
            width * height
        )));
    }

    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);

    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));

    let plte: Vec<u8> = palette.iter().flat_map(|(r, g, b, _)| [*r, *g, *b]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    // tRNS only when something is not fully opaque (masked pixels usually are).
    if palette.iter().any(|(_, _, _, a)| *a < 255) {
        let trns: Vec<u8> = palette.iter().map(|(_, _, _, a)| *a).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    let idat = deflate_scanlines(indices, width, height)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Create a PNG image from RGBA pixel data (color type 6).
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> HeatResult<Vec<u8>> {
    check_dimensions(pixels, width, height)?;

    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);

    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 6));
    let idat = deflate_scanlines(pixels, width * 4, height)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

fn ihdr(width: usize, height: usize, color_type: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(13);
    data.extend_from_slice(&(width as u32).to_be_bytes());
    data.extend_from_slice(&(height as u32).to_be_bytes());
    data.push(8); // bit depth
    data.push(color_type);
    data.push(0); // compression method
    data.push(0); // filter method
    data.push(0); // interlace method
    data
}

/// Write a PNG chunk: length, type, data, CRC over type + data.
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Prefix each `row_bytes`-wide scanline with filter type 0 and zlib-compress.
fn deflate_scanlines(data: &[u8], row_bytes: usize, height: usize) -> HeatResult<Vec<u8>> {
    let mut uncompressed = Vec::with_capacity(height * (1 + row_bytes));
    for row in data.chunks_exact(row_bytes).take(height) {
        uncompressed.push(0);
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder
        .write_all(&uncompressed)
        .and_then(|_| encoder.finish())
        .map_err(|e| HeatError::Render(format!("IDAT compression failed: {}", e)))
}

/// Check that `bytes` is a PNG the `image` crate can decode, returning its size.
pub fn validate_png(bytes: &[u8]) -> HeatResult<(u32, u32)> {
    if !bytes.starts_with(&PNG_SIGNATURE) {
        return Err(HeatError::InvalidImage("missing PNG signature".to_string()));
    }
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(|e| HeatError::InvalidImage(e.to_string()))?;
    Ok((img.width(), img.height()))
}
