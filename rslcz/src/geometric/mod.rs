pub mod grid;

pub use grid::{AttributeUpdate, FieldValue, PolygonFeature, PolygonGrid};
