use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometric::PolygonFeature;

/// The ten urban morphology parameters an LCZ class is defined on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorphologyParameter {
    SkyViewFactor,
    AspectRatio,
    BuildingSurfaceFraction,
    ImperviousSurfaceFraction,
    PerviousSurfaceFraction,
    HeightRoughness,
    TerrainRoughness,
    SurfaceAdmittance,
    SurfaceAlbedo,
    AnthropogenicHeat,
}

impl MorphologyParameter {
    pub const ALL: [MorphologyParameter; 10] = [
        MorphologyParameter::SkyViewFactor,
        MorphologyParameter::AspectRatio,
        MorphologyParameter::BuildingSurfaceFraction,
        MorphologyParameter::ImperviousSurfaceFraction,
        MorphologyParameter::PerviousSurfaceFraction,
        MorphologyParameter::HeightRoughness,
        MorphologyParameter::TerrainRoughness,
        MorphologyParameter::SurfaceAdmittance,
        MorphologyParameter::SurfaceAlbedo,
        MorphologyParameter::AnthropogenicHeat,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            MorphologyParameter::SkyViewFactor => "sky_view_factor",
            MorphologyParameter::AspectRatio => "aspect_ratio",
            MorphologyParameter::BuildingSurfaceFraction => "building_surface_fraction",
            MorphologyParameter::ImperviousSurfaceFraction => "impervious_surface_fraction",
            MorphologyParameter::PerviousSurfaceFraction => "pervious_surface_fraction",
            MorphologyParameter::HeightRoughness => "height_roughness",
            MorphologyParameter::TerrainRoughness => "terrain_roughness",
            MorphologyParameter::SurfaceAdmittance => "surface_admittance",
            MorphologyParameter::SurfaceAlbedo => "surface_albedo",
            MorphologyParameter::AnthropogenicHeat => "anthropogenic_heat",
        }
    }
}

impl fmt::Display for MorphologyParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MorphologyParameter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        MorphologyParameter::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown morphology parameter '{}'", s))
    }
}

/// Attribute names the parameters are read from on a grid feature.
///
/// Parameters without an explicit entry are read from the field named
/// after the parameter itself. Deserialized entries override the defaults
/// one by one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterFields {
    fields: BTreeMap<MorphologyParameter, String>,
}

impl Default for ParameterFields {
    fn default() -> Self {
        let fields = [
            (MorphologyParameter::BuildingSurfaceFraction, "perc_buildings"),
            (MorphologyParameter::ImperviousSurfaceFraction, "perc_impervious"),
            (MorphologyParameter::PerviousSurfaceFraction, "perc_pervious"),
            (MorphologyParameter::HeightRoughness, "Height_rou"),
            (MorphologyParameter::SurfaceAlbedo, "albedo"),
        ]
        .into_iter()
        .map(|(p, name)| (p, name.to_string()))
        .collect();
        ParameterFields { fields }
    }
}

impl<'de> Deserialize<'de> for ParameterFields {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let overrides = BTreeMap::<MorphologyParameter, String>::deserialize(deserializer)?;
        let mut fields = ParameterFields::default();
        fields.fields.extend(overrides);
        Ok(fields)
    }
}

impl ParameterFields {
    /// Read every parameter from the field of the same name
    pub fn identity() -> Self {
        ParameterFields {
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, parameter: MorphologyParameter, field: &str) -> Self {
        self.fields.insert(parameter, field.to_string());
        self
    }

    pub fn field(&self, parameter: MorphologyParameter) -> &str {
        self.fields
            .get(&parameter)
            .map(String::as_str)
            .unwrap_or_else(|| parameter.name())
    }
}

/// Snapshot of a cell's parameters; any of them may be absent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MorphologyParameterSet {
    values: [Option<f64>; 10],
}

impl MorphologyParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, parameter: MorphologyParameter) -> Option<f64> {
        self.values[parameter.index()]
    }

    /// NaN is stored as absent
    pub fn set(&mut self, parameter: MorphologyParameter, value: Option<f64>) {
        self.values[parameter.index()] = value.filter(|v| !v.is_nan());
    }

    pub fn with(mut self, parameter: MorphologyParameter, value: f64) -> Self {
        self.set(parameter, Some(value));
        self
    }

    /// Number of non-null parameters
    pub fn available_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MorphologyParameter, Option<f64>)> + '_ {
        MorphologyParameter::ALL
            .iter()
            .map(move |&p| (p, self.values[p.index()]))
    }

    /// Read the parameters from a grid feature.
    ///
    /// Missing fields are absent parameters; a text value is a conversion error.
    pub fn from_feature(feature: &PolygonFeature, fields: &ParameterFields) -> Result<Self> {
        let mut set = MorphologyParameterSet::new();
        for parameter in MorphologyParameter::ALL {
            set.set(parameter, feature.number(fields.field(parameter))?);
        }
        Ok(set)
    }
}

impl Serialize for MorphologyParameterSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let map: BTreeMap<MorphologyParameter, Option<f64>> = self.iter().collect();
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MorphologyParameterSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = BTreeMap::<MorphologyParameter, Option<f64>>::deserialize(deserializer)?;
        let mut set = MorphologyParameterSet::new();
        for (parameter, value) in map {
            set.set(parameter, value);
        }
        Ok(set)
    }
}
