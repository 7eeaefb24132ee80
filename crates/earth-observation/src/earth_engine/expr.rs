//! Earth Engine expression graphs.
//!
//! The REST API evaluates a serialized computation graph. Every image,
//! collection and filter here is an [`Expr`] node; nothing runs until the
//! graph is posted to `value:compute` or `thumbnails`.
//!
//! Nodes serialize inline: the graph always has a single value `"0"` holding
//! the root, with arguments nested as `functionInvocationValue`,
//! `constantValue` or `arrayValue`.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use heat_common::DateWindow;
use renderer::VisParams;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(Value),
    Array(Vec<Expr>),
    Invocation {
        function: String,
        args: BTreeMap<String, Expr>,
    },
}

impl Expr {
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    pub fn call<'a, I>(function: &str, args: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Expr)>,
    {
        Expr::Invocation {
            function: function.to_string(),
            args: args.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    pub fn strings<S: AsRef<str>>(items: &[S]) -> Self {
        Expr::Array(items.iter().map(|s| Expr::constant(s.as_ref())).collect())
    }

    /// The node form used inside argument maps.
    pub fn to_value_node(&self) -> Value {
        match self {
            Expr::Constant(value) => json!({ "constantValue": value }),
            Expr::Array(items) => json!({
                "arrayValue": { "values": items.iter().map(Expr::to_value_node).collect::<Vec<_>>() }
            }),
            Expr::Invocation { function, args } => {
                let arguments: serde_json::Map<String, Value> =
                    args.iter().map(|(k, v)| (k.clone(), v.to_value_node())).collect();
                json!({
                    "functionInvocationValue": {
                        "functionName": function,
                        "arguments": arguments,
                    }
                })
            }
        }
    }

    /// The top-level `Expression` object.
    pub fn to_expression(&self) -> Value {
        json!({
            "result": "0",
            "values": { "0": self.to_value_node() },
        })
    }

    /// Name of the outermost function, if any.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Expr::Invocation { function, .. } => Some(function.as_str()),
            _ => None,
        }
    }

    pub fn arg(&self, name: &str) -> Option<&Expr> {
        match self {
            Expr::Invocation { args, .. } => args.get(name),
            _ => None,
        }
    }
}

// ============================================================================
// Feature collections
// ============================================================================

pub fn load_table(table_id: &str) -> Expr {
    Expr::call("Collection.loadTable", [("tableId", Expr::constant(table_id))])
}

pub fn filter(collection: Expr, filter: Expr) -> Expr {
    Expr::call("Collection.filter", [("collection", collection), ("filter", filter)])
}

pub fn filter_eq(collection: Expr, field: &str, value: &str) -> Expr {
    let eq = Expr::call(
        "Filter.equals",
        [("leftField", Expr::constant(field)), ("rightValue", Expr::constant(value))],
    );
    filter(collection, eq)
}

pub fn filter_lt(collection: Expr, field: &str, value: f64) -> Expr {
    let lt = Expr::call(
        "Filter.lessThan",
        [("leftField", Expr::constant(field)), ("rightValue", Expr::constant(value))],
    );
    filter(collection, lt)
}

pub fn filter_bounds(collection: Expr, geometry: Expr) -> Expr {
    let intersects = Expr::call(
        "Filter.intersects",
        [("leftField", Expr::constant(".all")), ("rightValue", geometry)],
    );
    filter(collection, intersects)
}

/// `filterDate(start, end)`; the end is exclusive.
pub fn filter_date(collection: Expr, window: &DateWindow) -> Expr {
    let range = Expr::call(
        "DateRange",
        [
            ("start", Expr::constant(window.start_str())),
            ("end", Expr::constant(window.end_str())),
        ],
    );
    let contains = Expr::call(
        "Filter.dateRangeContains",
        [("leftValue", range), ("rightField", Expr::constant("system:time_start"))],
    );
    filter(collection, contains)
}

pub fn size(collection: Expr) -> Expr {
    Expr::call("Collection.size", [("collection", collection)])
}

pub fn first(collection: Expr) -> Expr {
    Expr::call("Collection.first", [("collection", collection)])
}

pub fn feature_geometry(feature: Expr) -> Expr {
    Expr::call("Feature.geometry", [("feature", feature)])
}

// ============================================================================
// Images
// ============================================================================

pub fn image_collection(id: &str) -> Expr {
    Expr::call("ImageCollection.load", [("id", Expr::constant(id))])
}

pub fn median(collection: Expr) -> Expr {
    Expr::call("reduce.median", [("collection", collection)])
}

pub fn mosaic(collection: Expr) -> Expr {
    Expr::call("ImageCollection.mosaic", [("collection", collection)])
}

pub fn clip(image: Expr, geometry: Expr) -> Expr {
    Expr::call("Image.clip", [("input", image), ("geometry", geometry)])
}

pub fn select(image: Expr, bands: &[&str]) -> Expr {
    Expr::call("Image.select", [("input", image), ("bandSelectors", Expr::strings(bands))])
}

pub fn normalized_difference(image: Expr, band_a: &str, band_b: &str) -> Expr {
    Expr::call(
        "Image.normalizedDifference",
        [("input", image), ("bandNames", Expr::strings(&[band_a, band_b]))],
    )
}

pub fn constant_image(value: f64) -> Expr {
    Expr::call("Image.constant", [("value", Expr::constant(value))])
}

pub fn multiply(a: Expr, b: Expr) -> Expr {
    Expr::call("Image.multiply", [("image1", a), ("image2", b)])
}

pub fn add(a: Expr, b: Expr) -> Expr {
    Expr::call("Image.add", [("image1", a), ("image2", b)])
}

/// `image.select(band).multiply(scale).add(offset)`
pub fn linear(image: Expr, band: &str, scale: f64, offset: f64) -> Expr {
    let scaled = multiply(select(image, &[band]), constant_image(scale));
    add(scaled, constant_image(offset))
}

pub fn paint(image: Expr, features: Expr, color: f64, width: u32) -> Expr {
    Expr::call(
        "Image.paint",
        [
            ("image", image),
            ("featureCollection", features),
            ("color", Expr::constant(color)),
            ("width", Expr::constant(width)),
        ],
    )
}

pub fn self_mask(image: Expr) -> Expr {
    Expr::call("Image.selfMask", [("image", image)])
}

/// `image.visualize(vis)`: a palette ramp, or an RGB stretch of three bands.
pub fn visualize(image: Expr, vis: &VisParams) -> Expr {
    let mut args = vec![("image", image)];
    if vis.is_rgb() {
        args.push(("bands", Expr::strings(vis.bands.as_slice())));
        args.push(("min", Expr::constant(vis.min)));
        args.push(("max", Expr::constant(vis.max)));
    } else {
        args.push(("palette", Expr::strings(vis.palette.as_slice())));
        if vis.palette.len() > 1 {
            args.push(("min", Expr::constant(vis.min)));
            args.push(("max", Expr::constant(vis.max)));
        }
    }
    Expr::call("Image.visualize", args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_eq_serialization() {
        let expr = filter_eq(load_table("projects/x/assets/Brasil_Mun"), "NM_MUN", "Campinas");
        let value = expr.to_expression();

        assert_eq!(value["result"], "0");
        let root = &value["values"]["0"]["functionInvocationValue"];
        assert_eq!(root["functionName"], "Collection.filter");
        let filter = &root["arguments"]["filter"]["functionInvocationValue"];
        assert_eq!(filter["functionName"], "Filter.equals");
        assert_eq!(filter["arguments"]["leftField"]["constantValue"], "NM_MUN");
        assert_eq!(filter["arguments"]["rightValue"]["constantValue"], "Campinas");
        let table = &root["arguments"]["collection"]["functionInvocationValue"];
        assert_eq!(table["arguments"]["tableId"]["constantValue"], "projects/x/assets/Brasil_Mun");
    }

    #[test]
    fn test_band_arrays() {
        let expr = normalized_difference(image_collection("L9"), "SR_B5", "SR_B4");
        let node = expr.to_value_node();
        let bands = &node["functionInvocationValue"]["arguments"]["bandNames"]["arrayValue"]["values"];
        assert_eq!(bands[0]["constantValue"], "SR_B5");
        assert_eq!(bands[1]["constantValue"], "SR_B4");
    }

    #[test]
    fn test_linear_nests_multiply_in_add() {
        let expr = linear(image_collection("L9"), "ST_B10", 0.00341802, -124.15);
        assert_eq!(expr.function_name(), Some("Image.add"));
        let scaled = expr.arg("image1").unwrap();
        assert_eq!(scaled.function_name(), Some("Image.multiply"));
        assert_eq!(scaled.arg("image1").unwrap().function_name(), Some("Image.select"));
    }

    #[test]
    fn test_visualize_solid_palette_omits_range() {
        let expr = visualize(constant_image(1.0), &VisParams::solid("purple"));
        assert!(expr.arg("min").is_none());
        assert_eq!(expr.arg("palette"), Some(&Expr::strings(&["purple"])));

        let rgb = visualize(constant_image(1.0), &VisParams::rgb(["B4", "B3", "B2"], 0.0, 3000.0));
        assert!(rgb.arg("palette").is_none());
        assert_eq!(rgb.arg("max"), Some(&Expr::constant(3000.0f32)));
    }
}
