//! Municipality boundary polygons.
//!
//! A boundary is a `geo` multipolygon in lon/lat degrees: one part per
//! island, each with an exterior ring and optional holes. GeoJSON `Polygon`
//! and `MultiPolygon` geometries convert directly.

use geo::{BoundingRect, Contains, LineString, MultiPolygon, Point, Polygon, Rect};

use crate::bbox::BoundingBox;
use crate::error::{HeatError, HeatResult};

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPolygon {
    shape: MultiPolygon<f64>,
    bbox: BoundingBox,
}

impl BoundaryPolygon {
    /// A single-part boundary: the first ring is the exterior, the rest are
    /// holes. Rings are closed automatically.
    pub fn new(rings: Vec<Vec<(f64, f64)>>) -> HeatResult<Self> {
        let mut rings = rings.into_iter().map(LineString::from);
        let exterior = rings
            .next()
            .ok_or_else(|| HeatError::invalid("boundary", "Boundary has no rings."))?;
        Self::from_multi_polygon(MultiPolygon::new(vec![Polygon::new(exterior, rings.collect())]))
    }

    pub fn from_multi_polygon(shape: MultiPolygon<f64>) -> HeatResult<Self> {
        // A closed ring repeats its first vertex, so a triangle has 4 coords.
        let degenerate = shape
            .iter()
            .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
            .any(|ring| ring.0.len() < 4);
        if degenerate {
            return Err(HeatError::invalid("boundary", "Boundary ring needs at least 3 vertices."));
        }

        let rect = shape
            .bounding_rect()
            .ok_or_else(|| HeatError::invalid("boundary", "Boundary has no rings."))?;
        let bbox = BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
        Ok(Self { shape, bbox })
    }

    /// Axis-aligned rectangle, handy for fixtures and bbox-only catalogs.
    pub fn rectangle(bbox: BoundingBox) -> Self {
        let rect = Rect::new((bbox.min_x, bbox.min_y), (bbox.max_x, bbox.max_y));
        Self {
            shape: MultiPolygon::new(vec![rect.to_polygon()]),
            bbox,
        }
    }

    /// Convert a GeoJSON `Polygon` or `MultiPolygon` geometry.
    pub fn from_geojson(geometry: geojson::Geometry) -> HeatResult<Self> {
        let shape: geo::Geometry<f64> = geometry
            .value
            .try_into()
            .map_err(|e: geojson::Error| HeatError::invalid("boundary", format!("Invalid GeoJSON boundary: {e}")))?;

        match shape {
            geo::Geometry::Polygon(polygon) => Self::from_multi_polygon(MultiPolygon::new(vec![polygon])),
            geo::Geometry::MultiPolygon(parts) => Self::from_multi_polygon(parts),
            _ => Err(HeatError::invalid(
                "boundary",
                "Boundary geometry must be a Polygon or MultiPolygon.",
            )),
        }
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Whether `(x, y)` lies strictly inside; points on an edge are outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.bbox.contains_point(x, y) && self.shape.contains(&Point::new(x, y))
    }
}
