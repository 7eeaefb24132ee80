//! In-memory georeferenced rasters for the local provider.
//!
//! A raster is a lon/lat grid with one or more named `f32` bands stored
//! row-major, north-up. `NaN` is the mask: pixels outside a boundary, missing
//! samples and self-masked zeros all end up as `NaN`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use heat_common::{BoundaryPolygon, BoundingBox, HeatError, HeatResult};

// ============================================================================
// Grid geometry
// ============================================================================

/// Placement of a pixel grid in lon/lat degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub bbox: BoundingBox,
    pub width: usize,
    pub height: usize,
}

impl GridSpec {
    pub fn new(bbox: BoundingBox, width: usize, height: usize) -> HeatResult<Self> {
        if width == 0 || height == 0 {
            return Err(HeatError::Internal(format!("Empty {width}x{height} grid")));
        }
        if !(bbox.width() > 0.0 && bbox.height() > 0.0) {
            return Err(HeatError::Internal(format!("Degenerate grid extent {bbox:?}")));
        }
        Ok(Self { bbox, width, height })
    }

    /// A grid over `bbox` with roughly `pixel_size` degree pixels, capped at
    /// `max_dimension` pixels on the longest side.
    pub fn covering(bbox: BoundingBox, pixel_size: f64, max_dimension: usize) -> HeatResult<Self> {
        if pixel_size <= 0.0 {
            return Err(HeatError::Configuration(format!("pixel size must be positive, got {pixel_size}")));
        }
        let mut width = (bbox.width() / pixel_size).ceil().max(1.0);
        let mut height = (bbox.height() / pixel_size).ceil().max(1.0);

        let longest = width.max(height);
        if longest > max_dimension as f64 {
            let scale = max_dimension as f64 / longest;
            width = (width * scale).round().max(1.0);
            height = (height * scale).round().max(1.0);
        }
        Self::new(bbox, width as usize, height as usize)
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pixel size in degrees `(dx, dy)`.
    pub fn pixel_size(&self) -> (f64, f64) {
        (
            self.bbox.width() / self.width as f64,
            self.bbox.height() / self.height as f64,
        )
    }

    /// Centre of pixel `(col, row)`; row 0 is the northern edge.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        let (dx, dy) = self.pixel_size();
        (
            self.bbox.min_x + (col as f64 + 0.5) * dx,
            self.bbox.max_y - (row as f64 + 0.5) * dy,
        )
    }

    /// The pixel containing `(x, y)`, if any. The east and south edges belong
    /// to the last column and row.
    pub fn locate(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !self.bbox.contains_point(x, y) {
            return None;
        }
        let (dx, dy) = self.pixel_size();
        let col = (((x - self.bbox.min_x) / dx) as usize).min(self.width - 1);
        let row = (((self.bbox.max_y - y) / dy) as usize).min(self.height - 1);
        Some((col, row))
    }
}

// ============================================================================
// Raster
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    grid: GridSpec,
    bands: BTreeMap<String, Vec<f32>>,
}

impl Raster {
    /// A raster with no bands yet.
    pub fn new(grid: GridSpec) -> Self {
        Self {
            grid,
            bands: BTreeMap::new(),
        }
    }

    /// A single band filled with `value`.
    pub fn filled(grid: GridSpec, band: &str, value: f32) -> Self {
        let mut raster = Self::new(grid);
        raster.bands.insert(band.to_string(), vec![value; grid.len()]);
        raster
    }

    /// Add a band; its length must match the grid.
    pub fn with_band(mut self, name: impl Into<String>, data: Vec<f32>) -> HeatResult<Self> {
        let name = name.into();
        if data.len() != self.grid.len() {
            return Err(HeatError::Internal(format!(
                "Band {name} has {} values, grid needs {}",
                data.len(),
                self.grid.len()
            )));
        }
        self.bands.insert(name, data);
        Ok(self)
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    pub fn band(&self, name: &str) -> HeatResult<&[f32]> {
        self.bands
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| HeatError::Internal(format!("Image has no band {name}")))
    }

    /// The only band of a single-band image.
    pub fn single_band(&self) -> HeatResult<&[f32]> {
        match self.bands.len() {
            1 => Ok(self.bands.values().next().map(Vec::as_slice).unwrap_or_default()),
            n => Err(HeatError::Internal(format!("Expected a single-band image, found {n} bands"))),
        }
    }

    /// Nearest-neighbour value of `band` at `(x, y)`; `NaN` off the grid.
    pub fn sample(&self, band: &[f32], x: f64, y: f64) -> f32 {
        match self.grid.locate(x, y) {
            Some((col, row)) => band[row * self.grid.width + col],
            None => f32::NAN,
        }
    }

    /// Reproject every band onto `target` by sampling at target pixel centres.
    pub fn resample_to(&self, target: &GridSpec) -> Raster {
        if &self.grid == target {
            return self.clone();
        }

        let bands = self
            .bands
            .iter()
            .map(|(name, data)| {
                let mut out = Vec::with_capacity(target.len());
                for row in 0..target.height {
                    for col in 0..target.width {
                        let (x, y) = target.pixel_center(col, row);
                        out.push(self.sample(data, x, y));
                    }
                }
                (name.clone(), out)
            })
            .collect();

        Raster { grid: *target, bands }
    }

    /// Mask every pixel whose centre falls outside `boundary`.
    pub fn clip(&self, boundary: &BoundaryPolygon) -> Raster {
        let inside: Vec<bool> = (0..self.grid.height)
            .flat_map(|row| (0..self.grid.width).map(move |col| (col, row)))
            .map(|(col, row)| {
                let (x, y) = self.grid.pixel_center(col, row);
                boundary.contains(x, y)
            })
            .collect();

        self.map_bands(|data| {
            data.iter()
                .zip(&inside)
                .map(|(v, keep)| if *keep { *v } else { f32::NAN })
                .collect()
        })
    }

    /// `(a - b) / (a + b)` as a single band named `nd`. A zero denominator
    /// is masked.
    pub fn normalized_difference(&self, band_a: &str, band_b: &str) -> HeatResult<Raster> {
        let a = self.band(band_a)?;
        let b = self.band(band_b)?;
        let data = a
            .iter()
            .zip(b)
            .map(|(a, b)| {
                let sum = a + b;
                if sum == 0.0 {
                    f32::NAN
                } else {
                    (a - b) / sum
                }
            })
            .collect();
        Raster::new(self.grid).with_band("nd", data)
    }

    /// `band * scale + offset`, keeping the band name. Computed in `f64`.
    pub fn linear(&self, band: &str, scale: f64, offset: f64) -> HeatResult<Raster> {
        let data = self
            .band(band)?
            .iter()
            .map(|v| (*v as f64 * scale + offset) as f32)
            .collect();
        Raster::new(self.grid).with_band(band, data)
    }

    /// Mask zeros in every band.
    pub fn self_mask(&self) -> Raster {
        self.map_bands(|data| {
            data.iter()
                .map(|v| if *v == 0.0 { f32::NAN } else { *v })
                .collect()
        })
    }

    /// Write `value` into a `width`-pixel square around each point.
    ///
    /// Points off the grid are skipped.
    pub fn paint_points(&mut self, band: &str, points: &[(f64, f64)], value: f32, width: u32) -> HeatResult<()> {
        let grid = self.grid;
        let data = self
            .bands
            .get_mut(band)
            .ok_or_else(|| HeatError::Internal(format!("Image has no band {band}")))?;

        let width = width.max(1) as i64;
        let before = (width - 1) / 2;
        for &(x, y) in points {
            let Some((col, row)) = grid.locate(x, y) else {
                continue;
            };
            for dr in -before..width - before {
                for dc in -before..width - before {
                    let (c, r) = (col as i64 + dc, row as i64 + dr);
                    if c >= 0 && r >= 0 && (c as usize) < grid.width && (r as usize) < grid.height {
                        data[r as usize * grid.width + c as usize] = value;
                    }
                }
            }
        }
        Ok(())
    }

    /// Pixel-wise sum of two single-band rasters on the same grid. The result
    /// takes the first raster's band name; a masked input masks the output.
    pub fn add(&self, other: &Raster) -> HeatResult<Raster> {
        check_same_grid(&self.grid, &other.grid)?;
        let name = self
            .bands
            .keys()
            .next()
            .cloned()
            .ok_or_else(|| HeatError::Internal("Cannot add an image with no bands".to_string()))?;
        let data = self
            .single_band()?
            .iter()
            .zip(other.single_band()?)
            .map(|(a, b)| a + b)
            .collect();
        Raster::new(self.grid).with_band(name, data)
    }

    /// Count of unmasked pixels in `band`.
    pub fn valid_count(&self, band: &str) -> HeatResult<usize> {
        Ok(self.band(band)?.iter().filter(|v| !v.is_nan()).count())
    }

    fn map_bands<F>(&self, f: F) -> Raster
    where
        F: Fn(&[f32]) -> Vec<f32>,
    {
        Raster {
            grid: self.grid,
            bands: self
                .bands
                .iter()
                .map(|(name, data)| (name.clone(), f(data)))
                .collect(),
        }
    }
}

fn check_same_grid(a: &GridSpec, b: &GridSpec) -> HeatResult<()> {
    if a != b {
        return Err(HeatError::Internal(format!("Grid mismatch: {a:?} vs {b:?}")));
    }
    Ok(())
}

// ============================================================================
// Collection reducers
// ============================================================================

/// Per-pixel, per-band median over the valid samples of `rasters`.
///
/// All rasters must share a grid. Only bands present in every raster are
/// kept. A pixel with no valid sample stays masked. An even number of samples
/// averages the two middle values.
pub fn median_composite(rasters: &[Raster]) -> HeatResult<Raster> {
    let first = rasters
        .first()
        .ok_or_else(|| HeatError::Internal("Median of an empty collection".to_string()))?;
    for raster in &rasters[1..] {
        check_same_grid(&first.grid, &raster.grid)?;
    }

    let common: Vec<&String> = first
        .bands
        .keys()
        .filter(|name| rasters.iter().all(|r| r.bands.contains_key(*name)))
        .collect();

    let mut out = Raster::new(first.grid);
    let mut samples = Vec::with_capacity(rasters.len());
    for name in common {
        let sources: Vec<&[f32]> = rasters.iter().map(|r| r.bands[name].as_slice()).collect();
        let mut data = Vec::with_capacity(first.grid.len());
        for idx in 0..first.grid.len() {
            samples.clear();
            samples.extend(sources.iter().map(|s| s[idx]).filter(|v| !v.is_nan()));
            data.push(median(&mut samples));
        }
        out.bands.insert(name.clone(), data);
    }
    Ok(out)
}

fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return f32::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Stack `rasters` in order; later rasters cover earlier ones wherever they
/// are valid.
pub fn mosaic(rasters: &[Raster]) -> HeatResult<Raster> {
    let first = rasters
        .first()
        .ok_or_else(|| HeatError::Internal("Mosaic of an empty collection".to_string()))?;

    let mut out = first.clone();
    for raster in &rasters[1..] {
        check_same_grid(&out.grid, &raster.grid)?;
        for (name, data) in &raster.bands {
            let target = out
                .bands
                .entry(name.clone())
                .or_insert_with(|| vec![f32::NAN; data.len()]);
            for (dst, src) in target.iter_mut().zip(data) {
                if !src.is_nan() {
                    *dst = *src;
                }
            }
        }
    }
    Ok(out)
}
