//! Color-ramp rendering for gridded layer data.
//!
//! Grids are row-major `f32` slices where `NaN` marks masked pixels (outside
//! the municipality boundary, or self-masked zeros). Masked pixels render fully
//! transparent, the way Earth Engine thumbnails do.

use serde::{Deserialize, Serialize};

use heat_common::{HeatError, HeatResult};

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }

    /// Parse a palette entry: a CSS color name or a hex triplet
    /// (`"ff0000"`, `"#ff0000"`, `"f00"`).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(color) = named_color(&s.to_ascii_lowercase()) {
            return Some(color);
        }

        let hex = s.trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                let expand = |c: &str| channel(c).map(|v| v * 17);
                Some(Self::rgb(expand(&hex[0..1])?, expand(&hex[1..2])?, expand(&hex[2..3])?))
            }
            _ => None,
        }
    }
}

/// The CSS names used by the layer palettes, plus a few common neighbours.
fn named_color(name: &str) -> Option<Color> {
    let (r, g, b) = match name {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "lime" => (0, 255, 0),
        "darkgreen" => (0, 100, 0),
        "blue" => (0, 0, 255),
        "navy" => (0, 0, 128),
        "yellow" => (255, 255, 0),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "magenta" | "fuchsia" => (255, 0, 255),
        "cyan" | "aqua" => (0, 255, 255),
        "brown" => (165, 42, 42),
        "gray" | "grey" => (128, 128, 128),
        _ => return None,
    };
    Some(Color::rgb(r, g, b))
}

/// Linear color interpolation
pub fn interpolate_color(color1: Color, color2: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let t_inv = 1.0 - t;
    let mix = |a: u8, b: u8| ((a as f32 * t_inv) + (b as f32 * t)).round() as u8;

    Color::new(
        mix(color1.r, color2.r),
        mix(color1.g, color2.g),
        mix(color1.b, color2.b),
        mix(color1.a, color2.a),
    )
}

/// Visualization parameters for one layer: stretch range and palette.
///
/// With three `bands` and no palette the image is rendered as a true-color
/// composite instead, each band stretched over `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    #[serde(default)]
    pub min: f32,
    #[serde(default = "default_max")]
    pub max: f32,
    #[serde(default)]
    pub palette: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bands: Vec<String>,
}

fn default_max() -> f32 {
    1.0
}

impl VisParams {
    pub fn new(min: f32, max: f32, palette: &[&str]) -> Self {
        Self {
            min,
            max,
            palette: palette.iter().map(|c| c.to_string()).collect(),
            bands: Vec::new(),
        }
    }

    /// Red, green and blue bands stretched linearly over `[min, max]`.
    pub fn rgb(bands: [&str; 3], min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            palette: Vec::new(),
            bands: bands.iter().map(|b| b.to_string()).collect(),
        }
    }

    pub fn is_rgb(&self) -> bool {
        self.palette.is_empty() && self.bands.len() == 3
    }

    /// A single-color palette; every unmasked pixel gets that color.
    pub fn solid(color: &str) -> Self {
        Self::new(0.0, 1.0, &[color])
    }
}

/// A palette spread evenly across `[min, max]`.
#[derive(Debug, Clone)]
pub struct ColorRamp {
    min: f32,
    max: f32,
    colors: Vec<Color>,
}

impl ColorRamp {
    pub fn from_vis(vis: &VisParams) -> HeatResult<Self> {
        if vis.palette.is_empty() {
            return Err(HeatError::Render("Palette must have at least one color".to_string()));
        }
        if !(vis.max > vis.min) {
            return Err(HeatError::Render(format!(
                "Visualization max ({}) must exceed min ({})",
                vis.max, vis.min
            )));
        }

        let colors = vis
            .palette
            .iter()
            .map(|c| Color::parse(c).ok_or_else(|| HeatError::Render(format!("Unknown palette color: {c}"))))
            .collect::<HeatResult<Vec<_>>>()?;

        Ok(Self {
            min: vis.min,
            max: vis.max,
            colors,
        })
    }

    /// Color for a data value. Values outside the range clamp to the end colors.
    pub fn color_at(&self, value: f32) -> Color {
        if value.is_nan() {
            return Color::transparent();
        }
        if self.colors.len() == 1 {
            return self.colors[0];
        }

        let normalized = ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        let position = normalized * (self.colors.len() - 1) as f32;
        let low = position.floor() as usize;
        let high = (low + 1).min(self.colors.len() - 1);
        interpolate_color(self.colors[low], self.colors[high], position - low as f32)
    }
}

/// Render grid data through a color ramp.
///
/// # Returns
/// RGBA pixel data (4 bytes per pixel)
pub fn render_grid(data: &[f32], width: usize, height: usize, ramp: &ColorRamp) -> Vec<u8> {
    let mut pixels = vec![0u8; width * height * 4];

    for (idx, value) in data.iter().take(width * height).enumerate() {
        let color = ramp.color_at(*value);
        let pixel_idx = idx * 4;
        pixels[pixel_idx] = color.r;
        pixels[pixel_idx + 1] = color.g;
        pixels[pixel_idx + 2] = color.b;
        pixels[pixel_idx + 3] = color.a;
    }

    pixels
}

/// Render three bands as an RGB composite.
///
/// A pixel is transparent when any of its bands is masked.
pub fn render_rgb(bands: [&[f32]; 3], width: usize, height: usize, min: f32, max: f32) -> Vec<u8> {
    let mut pixels = vec![0u8; width * height * 4];
    let span = (max - min).max(f32::EPSILON);
    let stretch = |v: f32| (((v - min) / span).clamp(0.0, 1.0) * 255.0).round() as u8;

    for idx in 0..width * height {
        let sample = |band: &[f32]| band.get(idx).copied().unwrap_or(f32::NAN);
        let (r, g, b) = (sample(bands[0]), sample(bands[1]), sample(bands[2]));
        if r.is_nan() || g.is_nan() || b.is_nan() {
            continue;
        }
        let pixel_idx = idx * 4;
        pixels[pixel_idx] = stretch(r);
        pixels[pixel_idx + 1] = stretch(g);
        pixels[pixel_idx + 2] = stretch(b);
        pixels[pixel_idx + 3] = 255;
    }

    pixels
}

/// Target dimensions that fit `width x height` inside `max_dimension` on the
/// longest side, preserving aspect ratio. Never upsamples.
pub fn thumbnail_dimensions(width: usize, height: usize, max_dimension: usize) -> (usize, usize) {
    let longest = width.max(height);
    if longest <= max_dimension || longest == 0 {
        return (width, height);
    }
    let scale = max_dimension as f64 / longest as f64;
    let w = ((width as f64 * scale).round() as usize).max(1);
    let h = ((height as f64 * scale).round() as usize).max(1);
    (w, h)
}

/// Resample grid data with nearest-neighbour lookup.
///
/// Nearest-neighbour keeps the `NaN` mask crisp; bilinear would bleed masked
/// pixels into their neighbours.
pub fn resample_nearest(
    data: &[f32],
    src_width: usize,
    src_height: usize,
    dst_width: usize,
    dst_height: usize,
) -> Vec<f32> {
    if src_width == dst_width && src_height == dst_height {
        return data.to_vec();
    }

    let mut output = vec![f32::NAN; dst_width * dst_height];
    let x_ratio = src_width as f64 / dst_width as f64;
    let y_ratio = src_height as f64 / dst_height as f64;

    for y in 0..dst_height {
        let src_y = (((y as f64 + 0.5) * y_ratio) as usize).min(src_height - 1);
        for x in 0..dst_width {
            let src_x = (((x as f64 + 0.5) * x_ratio) as usize).min(src_width - 1);
            output[y * dst_width + x] = data.get(src_y * src_width + src_x).copied().unwrap_or(f32::NAN);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_colors() {
        assert_eq!(Color::parse("blue"), Some(Color::rgb(0, 0, 255)));
        assert_eq!(Color::parse("Purple"), Some(Color::rgb(128, 0, 128)));
        assert_eq!(Color::parse("#FF8000"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(Color::parse("00ff00"), Some(Color::rgb(0, 255, 0)));
        assert_eq!(Color::parse("f00"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse("not-a-color"), None);
        assert_eq!(Color::parse("#GGGGGG"), None);
        // Multibyte input whose byte length matches a hex form.
        assert_eq!(Color::parse("aéabc"), None);
        assert_eq!(Color::parse("éa"), None);
        assert!(ColorRamp::from_vis(&VisParams::new(0.0, 1.0, &["aéabc", "red"])).is_err());
    }

    #[test]
    fn test_ramp_endpoints_and_midpoint() {
        let ramp = ColorRamp::from_vis(&VisParams::new(-0.2, 0.8, &["blue", "white", "green"])).unwrap();
        assert_eq!(ramp.color_at(-0.2), Color::rgb(0, 0, 255));
        assert_eq!(ramp.color_at(0.3), Color::rgb(255, 255, 255));
        assert_eq!(ramp.color_at(0.8), Color::rgb(0, 128, 0));
        // Clamped outside the stretch.
        assert_eq!(ramp.color_at(-1.0), Color::rgb(0, 0, 255));
        assert_eq!(ramp.color_at(5.0), Color::rgb(0, 128, 0));
        assert_eq!(ramp.color_at(f32::NAN), Color::transparent());
    }

    #[test]
    fn test_solid_palette() {
        let ramp = ColorRamp::from_vis(&VisParams::solid("purple")).unwrap();
        assert_eq!(ramp.color_at(2.0), Color::rgb(128, 0, 128));
        assert_eq!(ramp.color_at(f32::NAN).a, 0);
    }

    #[test]
    fn test_invalid_vis_rejected() {
        assert!(ColorRamp::from_vis(&VisParams::new(0.0, 1.0, &[])).is_err());
        assert!(ColorRamp::from_vis(&VisParams::new(1.0, 1.0, &["red"])).is_err());
        assert!(ColorRamp::from_vis(&VisParams::new(0.0, 1.0, &["red", "nope"])).is_err());
    }

    #[test]
    fn test_render_rgb_stretch_and_mask() {
        let r = [0.0, 3000.0, f32::NAN];
        let g = [1500.0, 3000.0, 10.0];
        let b = [-50.0, 6000.0, 10.0];
        let pixels = render_rgb([&r, &g, &b], 3, 1, 0.0, 3000.0);
        assert_eq!(&pixels[0..4], &[0, 128, 0, 255]);
        assert_eq!(&pixels[4..8], &[255, 255, 255, 255]);
        assert_eq!(pixels[11], 0);
    }

    #[test]
    fn test_thumbnail_dimensions() {
        assert_eq!(thumbnail_dimensions(100, 50, 512), (100, 50));
        assert_eq!(thumbnail_dimensions(2048, 1024, 512), (512, 256));
        assert_eq!(thumbnail_dimensions(10, 4000, 512), (1, 512));
    }
}
