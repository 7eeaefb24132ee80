//! Test data generators for synthetic earth-observation grids.
//!
//! The Landsat helpers invert the NDVI and LST formulas used by the layer
//! pipeline, so a test can ask for "NDVI 0.6 at 31 °C" and get raw band
//! values that reproduce exactly that.

/// Landsat 9 L2 surface-temperature scale (ST_B10).
pub const ST_B10_SCALE: f32 = 0.003_418_02;
/// Landsat 9 L2 surface-temperature offset in Kelvin.
pub const ST_B10_OFFSET: f32 = 149.0;
pub const KELVIN_OFFSET: f32 = 273.15;

/// Creates a test grid with predictable values.
///
/// Each cell value is `col * 1000 + row`, so a misplaced read shows up as an
/// obviously wrong number.
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Left-to-right linear gradient from `min` to `max`.
pub fn create_gradient_grid(width: usize, height: usize, min: f32, max: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    let denom = (width.max(2) - 1) as f32;
    for _ in 0..height {
        for col in 0..width {
            data.push(min + (max - min) * col as f32 / denom);
        }
    }
    data
}

/// Raw band values for one Landsat pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandsatPixel {
    /// Red (SR_B4)
    pub sr_b4: f32,
    /// Near infrared (SR_B5)
    pub sr_b5: f32,
    /// Thermal (ST_B10), raw DN
    pub st_b10: f32,
}

/// Band values that yield `ndvi` and `lst_celsius` through the pipeline formulas.
///
/// `red` fixes the red reflectance; NIR follows from the NDVI ratio.
pub fn landsat_pixel(ndvi: f32, lst_celsius: f32, red: f32) -> LandsatPixel {
    let nir = red * (1.0 + ndvi) / (1.0 - ndvi);
    let st_b10 = (lst_celsius + KELVIN_OFFSET - ST_B10_OFFSET) / ST_B10_SCALE;
    LandsatPixel {
        sr_b4: red,
        sr_b5: nir,
        st_b10,
    }
}

/// Uniform band grids `[SR_B4, SR_B5, ST_B10]`.
pub fn create_landsat_bands(width: usize, height: usize, ndvi: f32, lst_celsius: f32) -> [Vec<f32>; 3] {
    let px = landsat_pixel(ndvi, lst_celsius, 8000.0);
    let n = width * height;
    [vec![px.sr_b4; n], vec![px.sr_b5; n], vec![px.st_b10; n]]
}

/// A heat island: hot, bare centre fading to cool, green edges.
///
/// NDVI runs from 0.0 (centre) to 0.7 (corners); LST from 38 °C to 24 °C.
pub fn create_heat_island_bands(width: usize, height: usize) -> [Vec<f32>; 3] {
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);

    let mut red = Vec::with_capacity(width * height);
    let mut nir = Vec::with_capacity(width * height);
    let mut thermal = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dx = col as f32 - cx;
            let dy = row as f32 - cy;
            let t = (dx * dx + dy * dy).sqrt() / max_dist;
            let px = landsat_pixel(0.7 * t, 38.0 - 14.0 * t, 8000.0);
            red.push(px.sr_b4);
            nir.push(px.sr_b5);
            thermal.push(px.st_b10);
        }
    }
    [red, nir, thermal]
}

/// Radial population density peaking at `peak` people per pixel in the centre.
pub fn create_population_grid(width: usize, height: usize, peak: f32) -> Vec<f32> {
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);

    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dx = col as f32 - cx;
            let dy = row as f32 - cy;
            let t = (dx * dx + dy * dy).sqrt() / max_dist;
            data.push(peak * (1.0 - t).max(0.0));
        }
    }
    data
}

/// `count` points on an even lattice strictly inside the box.
pub fn scatter_points(min_x: f64, min_y: f64, max_x: f64, max_y: f64, count: usize) -> Vec<(f64, f64)> {
    let side = (count as f64).sqrt().ceil().max(1.0) as usize;
    let step_x = (max_x - min_x) / (side + 1) as f64;
    let step_y = (max_y - min_y) / (side + 1) as f64;

    (0..count)
        .map(|i| {
            let col = i % side + 1;
            let row = i / side + 1;
            (min_x + step_x * col as f64, min_y + step_y * row as f64)
        })
        .collect()
}
