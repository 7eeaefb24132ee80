//! Common types and utilities shared across the urban-heat dashboard crates.

pub mod bbox;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod municipality;
pub mod profile;
pub mod records;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{FieldError, HeatError, HeatResult};
pub use geometry::BoundaryPolygon;
pub use layer::{LayerBundle, LayerKind};
pub use municipality::Municipality;
pub use profile::{CityProfile, PostalAddress, UNAVAILABLE};
pub use records::{City, NewCity, NewUser, Role, User, UserPatch};
pub use time::DateWindow;
