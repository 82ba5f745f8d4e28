use std::collections::{BTreeMap, HashMap};
use std::fmt;

use geo::{Geometry as GeoGeometry, MultiPolygon};
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue};
use log::warn;

#[cfg(feature = "polars")]
use polars::prelude::*;

use crate::error::{LczError, Result};
use crate::geo_core::BoundingBox;

/// Value stored in a grid attribute
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Number(n) => n.as_f64().map_or(FieldValue::Null, FieldValue::Number),
            JsonValue::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Number(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            FieldValue::Text(s) => JsonValue::String(s.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Number)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// One grid cell: stable id, footprint and attribute table row
#[derive(Debug, Clone)]
pub struct PolygonFeature {
    pub id: i64,
    pub geometry: MultiPolygon<f64>,
    attributes: BTreeMap<String, FieldValue>,
}

impl PolygonFeature {
    pub fn new(id: i64, geometry: impl Into<MultiPolygon<f64>>) -> Self {
        PolygonFeature {
            id,
            geometry: geometry.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, FieldValue> {
        &self.attributes
    }

    /// Numeric value of a field.
    ///
    /// Absent, null and NaN fields read as `None`; text is a conversion error.
    pub fn number(&self, name: &str) -> Result<Option<f64>> {
        match self.attributes.get(name) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Number(v)) if v.is_nan() => Ok(None),
            Some(FieldValue::Number(v)) => Ok(Some(*v)),
            Some(other) => Err(LczError::Conversion {
                feature_id: self.id,
                field: name.to_string(),
                value: other.to_string(),
            }),
        }
    }

    /// Bounding box of a usable footprint
    pub fn bbox(&self) -> Result<BoundingBox> {
        let invalid = |reason: &str| LczError::InvalidGeometry {
            feature_id: self.id,
            reason: reason.to_string(),
        };
        if self.geometry.0.iter().all(|p| p.exterior().0.len() < 4) {
            return Err(invalid("empty geometry"));
        }
        let bbox = BoundingBox::of_geometry(&self.geometry).ok_or_else(|| invalid("no coordinates"))?;
        if ![bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(invalid("non-finite coordinates"));
        }
        if bbox.is_empty() {
            return Err(invalid("zero-area footprint"));
        }
        Ok(bbox)
    }
}

/// Attribute writes for one feature; applied together or not at all
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeUpdate {
    pub feature_id: i64,
    pub values: Vec<(String, FieldValue)>,
}

impl AttributeUpdate {
    pub fn new(feature_id: i64) -> Self {
        AttributeUpdate {
            feature_id,
            values: Vec::new(),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.values.push((field.to_string(), value.into()));
        self
    }
}

/// Polygon grid with an ordered attribute schema
#[derive(Debug, Clone, Default)]
pub struct PolygonGrid {
    fields: Vec<String>,
    features: Vec<PolygonFeature>,
    index: HashMap<i64, usize>,
}

impl PolygonGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_features(features: Vec<PolygonFeature>) -> Result<Self> {
        let mut grid = PolygonGrid::new();
        for feature in features {
            grid.push(feature)?;
        }
        Ok(grid)
    }

    /// Add a feature; ids must be unique
    pub fn push(&mut self, feature: PolygonFeature) -> Result<()> {
        if self.index.contains_key(&feature.id) {
            return Err(LczError::DuplicateFeatureId(feature.id));
        }
        for name in feature.attributes.keys() {
            self.add_field(name);
        }
        self.index.insert(feature.id, self.features.len());
        self.features.push(feature);
        Ok(())
    }

    /// Register a field in the schema (no-op when present)
    pub fn add_field(&mut self, name: &str) {
        if !self.has_field(name) {
            self.fields.push(name.to_string());
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    /// Fail with `MissingInput` unless `name` is part of the schema
    pub fn require_field(&self, name: &str) -> Result<()> {
        if self.has_field(name) {
            Ok(())
        } else {
            Err(LczError::MissingInput(format!("grid field '{}'", name)))
        }
    }

    pub fn features(&self) -> &[PolygonFeature] {
        &self.features
    }

    pub fn get(&self, id: i64) -> Option<&PolygonFeature> {
        self.index.get(&id).map(|&i| &self.features[i])
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Apply a batch of attribute updates.
    ///
    /// Each update is applied as a whole. Updates for unknown ids are skipped
    /// with a warning. Returns the number of features changed.
    pub fn commit(&mut self, updates: Vec<AttributeUpdate>) -> usize {
        let mut applied = 0;
        for update in updates {
            let Some(&idx) = self.index.get(&update.feature_id) else {
                warn!("Skipping update for unknown feature {}", update.feature_id);
                continue;
            };
            for (name, _) in &update.values {
                if !self.fields.iter().any(|f| f == name) {
                    self.fields.push(name.clone());
                }
            }
            let feature = &mut self.features[idx];
            for (name, value) in update.values {
                feature.attributes.insert(name, value);
            }
            applied += 1;
        }
        applied
    }

    /// Build a grid from a GeoJSON document.
    ///
    /// Ids come from `id_field` when given, else from the feature id, else the
    /// feature position. Null or non-polygon geometries are kept as empty
    /// footprints so their rows survive and get reported during aggregation.
    pub fn from_geojson(geojson: &GeoJson, id_field: Option<&str>) -> Result<Self> {
        let features: Vec<&Feature> = match geojson {
            GeoJson::FeatureCollection(fc) => fc.features.iter().collect(),
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(_) => {
                return Err(LczError::MissingInput(
                    "GeoJSON features (got a bare geometry)".to_string(),
                ))
            }
        };

        let mut grid = PolygonGrid::new();
        for (position, feature) in features.into_iter().enumerate() {
            let id = Self::feature_id(feature, id_field, position)?;
            let geometry = match &feature.geometry {
                Some(geometry) => Self::geojson_to_multipolygon(id, geometry),
                None => {
                    warn!("Feature {} has no geometry", id);
                    MultiPolygon::new(vec![])
                }
            };
            let mut cell = PolygonFeature::new(id, geometry);
            if let Some(properties) = &feature.properties {
                for (key, value) in properties {
                    cell.set(key, FieldValue::from_json(value));
                }
            }
            grid.push(cell)?;
        }
        Ok(grid)
    }

    fn feature_id(feature: &Feature, id_field: Option<&str>, position: usize) -> Result<i64> {
        if let Some(field) = id_field {
            let value = feature
                .property(field)
                .ok_or_else(|| LczError::MissingInput(format!("id field '{}'", field)))?;
            return value
                .as_i64()
                .or_else(|| value.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64))
                .ok_or_else(|| LczError::Conversion {
                    feature_id: position as i64,
                    field: field.to_string(),
                    value: value.to_string(),
                });
        }
        match &feature.id {
            Some(Id::Number(n)) => n.as_i64().ok_or_else(|| LczError::Conversion {
                feature_id: position as i64,
                field: "id".to_string(),
                value: n.to_string(),
            }),
            Some(Id::String(s)) => s.parse::<i64>().map_err(|_| LczError::Conversion {
                feature_id: position as i64,
                field: "id".to_string(),
                value: s.clone(),
            }),
            None => Ok(position as i64),
        }
    }

    fn geojson_to_multipolygon(id: i64, geometry: &Geometry) -> MultiPolygon<f64> {
        let converted: std::result::Result<GeoGeometry<f64>, _> = geometry.try_into();
        match converted {
            Ok(GeoGeometry::Polygon(poly)) => MultiPolygon::new(vec![poly]),
            Ok(GeoGeometry::MultiPolygon(mp)) => mp,
            Ok(_) => {
                warn!("Feature {} is not a polygon, footprint left empty", id);
                MultiPolygon::new(vec![])
            }
            Err(e) => {
                warn!("Feature {} has an unreadable geometry: {}", id, e);
                MultiPolygon::new(vec![])
            }
        }
    }

    /// GeoJSON FeatureCollection with every schema field as a property
    pub fn to_geojson(&self) -> GeoJson {
        let features = self
            .features
            .iter()
            .map(|cell| {
                let mut properties = JsonObject::new();
                for name in &self.fields {
                    let value = cell.get(name).map_or(JsonValue::Null, |v| v.to_json());
                    properties.insert(name.clone(), value);
                }
                let geometry = if cell.geometry.0.is_empty() {
                    None
                } else {
                    Some(Geometry::new(geojson::Value::from(&cell.geometry)))
                };
                Feature {
                    bbox: None,
                    geometry,
                    id: Some(Id::Number(cell.id.into())),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        GeoJson::FeatureCollection(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }

    /// Attribute table as a Polars DataFrame: an `id` column followed by
    /// one column per field (numeric unless the field holds text)
    #[cfg(feature = "polars")]
    pub fn to_polars_df(&self) -> Result<DataFrame> {
        let ids: Vec<i64> = self.features.iter().map(|f| f.id).collect();
        let mut columns: Vec<Column> = vec![Column::new("id".into(), ids)];

        for name in &self.fields {
            let has_text = self
                .features
                .iter()
                .any(|f| matches!(f.get(name), Some(FieldValue::Text(_))));
            if has_text {
                let values: Vec<Option<String>> = self
                    .features
                    .iter()
                    .map(|f| match f.get(name) {
                        Some(FieldValue::Text(s)) => Some(s.clone()),
                        Some(FieldValue::Number(v)) => Some(v.to_string()),
                        _ => None,
                    })
                    .collect();
                columns.push(Column::new(name.as_str().into(), values));
            } else {
                let values: Vec<Option<f64>> = self
                    .features
                    .iter()
                    .map(|f| f.get(name).and_then(FieldValue::as_f64))
                    .collect();
                columns.push(Column::new(name.as_str().into(), values));
            }
        }

        DataFrame::new(columns)
            .map_err(|e| LczError::Export(format!("failed to build DataFrame: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x: f64, y: f64, size: f64) -> geo::Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut grid = PolygonGrid::new();
        grid.push(PolygonFeature::new(1, square(0.0, 0.0, 1.0))).unwrap();
        let err = grid.push(PolygonFeature::new(1, square(1.0, 0.0, 1.0)));
        assert!(matches!(err, Err(LczError::DuplicateFeatureId(1))));
    }

    #[test]
    fn test_number_reads() {
        let cell = PolygonFeature::new(7, square(0.0, 0.0, 1.0))
            .with_attribute("a", 2.5)
            .with_attribute("b", FieldValue::Null)
            .with_attribute("c", "tall")
            .with_attribute("d", f64::NAN);
        assert_eq!(cell.number("a").unwrap(), Some(2.5));
        assert_eq!(cell.number("b").unwrap(), None);
        assert_eq!(cell.number("missing").unwrap(), None);
        assert_eq!(cell.number("d").unwrap(), None);
        assert!(matches!(
            cell.number("c"),
            Err(LczError::Conversion { feature_id: 7, .. })
        ));
    }

    #[test]
    fn test_bbox_of_empty_geometry_is_invalid() {
        let cell = PolygonFeature::new(3, MultiPolygon::new(vec![]));
        assert!(matches!(
            cell.bbox(),
            Err(LczError::InvalidGeometry { feature_id: 3, .. })
        ));
        let ok = PolygonFeature::new(4, square(2.0, 3.0, 4.0));
        assert_eq!(ok.bbox().unwrap(), BoundingBox::new(2.0, 3.0, 6.0, 7.0));
    }

    #[test]
    fn test_commit_updates_schema_and_values() {
        let mut grid = PolygonGrid::from_features(vec![
            PolygonFeature::new(1, square(0.0, 0.0, 1.0)),
            PolygonFeature::new(2, square(1.0, 0.0, 1.0)),
        ])
        .unwrap();
        let applied = grid.commit(vec![
            AttributeUpdate::new(2)
                .with("median_dist", 4.0)
                .with("aspect_ratio", 0.5),
            AttributeUpdate::new(99).with("median_dist", 1.0),
        ]);
        assert_eq!(applied, 1);
        assert_eq!(grid.fields(), &["median_dist".to_string(), "aspect_ratio".to_string()]);
        assert_eq!(grid.get(2).unwrap().number("aspect_ratio").unwrap(), Some(0.5));
        assert!(grid.get(1).unwrap().get("median_dist").is_none());
        assert!(grid.require_field("median_dist").is_ok());
        assert!(matches!(
            grid.require_field("dsm_median"),
            Err(LczError::MissingInput(_))
        ));
    }

    #[test]
    fn test_geojson_round_trip_keeps_ids_and_attributes() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": 10,
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[30,0],[30,30],[0,30],[0,0]]]},
                 "properties": {"mean_build_height": 12.5, "name": "cell"}},
                {"type": "Feature", "id": 11, "geometry": null,
                 "properties": {"mean_build_height": null}}
            ]
        }"#;
        let geojson: GeoJson = json.parse().unwrap();
        let grid = PolygonGrid::from_geojson(&geojson, None).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.get(10).unwrap().number("mean_build_height").unwrap(), Some(12.5));
        assert!(grid.get(11).unwrap().bbox().is_err());

        let out = grid.to_geojson();
        let GeoJson::FeatureCollection(fc) = out else {
            panic!("expected a feature collection");
        };
        assert_eq!(fc.features.len(), 2);
        assert_eq!(fc.features[0].property("name").unwrap(), "cell");
        assert!(fc.features[1].geometry.is_none());
    }

    #[test]
    fn test_geojson_id_field() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature",
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]},
                 "properties": {"fid": 42}}
            ]
        }"#;
        let geojson: GeoJson = json.parse().unwrap();
        let grid = PolygonGrid::from_geojson(&geojson, Some("fid")).unwrap();
        assert!(grid.get(42).is_some());
        assert!(PolygonGrid::from_geojson(&geojson, Some("other")).is_err());
    }
}
