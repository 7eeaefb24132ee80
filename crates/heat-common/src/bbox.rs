//! Lon/lat extents.

use serde::{Deserialize, Serialize};

/// An axis-aligned extent in EPSG:4326 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Extent of a vertex set; `None` when there are no vertices.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        points.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => Self::new(x, y, x, y),
                Some(b) => Self::new(b.min_x.min(x), b.min_y.min(y), b.max_x.max(x), b.max_y.max(y)),
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Overlap test; touching edges do not count.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x && other.min_x < self.max_x && self.min_y < other.max_y && other.min_y < self.max_y
    }

    /// Inclusive on every edge.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enclosing_ring() {
        let bbox = BoundingBox::enclosing([(-47.2, -23.0), (-46.9, -22.7), (-47.0, -22.9)]).unwrap();
        assert_eq!(bbox, BoundingBox::new(-47.2, -23.0, -46.9, -22.7));
        assert!(BoundingBox::enclosing(std::iter::empty()).is_none());
    }

    #[test]
    fn test_overlap_and_containment() {
        let city = BoundingBox::new(-47.2, -23.0, -47.0, -22.8);
        let scene = BoundingBox::new(-47.1, -22.9, -46.5, -22.0);
        let elsewhere = BoundingBox::new(-40.0, -10.0, -39.0, -9.0);
        let adjacent = BoundingBox::new(-47.0, -23.0, -46.8, -22.8);

        assert!(city.intersects(&scene));
        assert!(!city.intersects(&elsewhere));
        assert!(!city.intersects(&adjacent));

        assert!(city.contains_point(-47.2, -22.8));
        assert!(!city.contains_point(-46.99, -22.9));
    }
}
