use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LczError, Result};
use crate::lcz::{MorphologyParameter, ParameterFields};
use crate::zonal::{Category, ZonalAggregator};

/// Settings of a full LCZ run. Every section falls back to its defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fields: FieldNames,
    pub categories: CategoryCodes,
    /// Explicit source attribute per morphology parameter. Parameters not
    /// listed are read from the matching entry of `fields`, or from the
    /// field named after the parameter.
    pub parameters: BTreeMap<MorphologyParameter, String>,
    /// Written when a median has no valid sample; absent leaves the field unset
    pub median_fallback: Option<f64>,
    pub min_median_dist: f64,
    pub albedo_scale: f64,
    pub parallel: bool,
    pub progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let aggregator = ZonalAggregator::default();
        Self {
            fields: FieldNames::default(),
            categories: CategoryCodes::default(),
            parameters: BTreeMap::new(),
            median_fallback: aggregator.median_fallback,
            min_median_dist: aggregator.min_median_dist,
            albedo_scale: aggregator.albedo_scale,
            parallel: aggregator.parallel,
            progress: aggregator.progress,
        }
    }
}

/// Attribute names read and written on the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub median_dist: String,
    pub dsm_median: String,
    pub dtm_median: String,
    pub height_roughness: String,
    pub perc_impervious: String,
    pub perc_pervious: String,
    pub perc_buildings: String,
    pub mean_build_height: String,
    pub aspect_ratio: String,
    pub albedo_majority: String,
    pub albedo: String,
    pub lcz_class: String,
    pub lcz_int: String,
    pub lcz_rmsep: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            median_dist: "median_dist".to_string(),
            dsm_median: "dsm_median".to_string(),
            dtm_median: "dtm_median".to_string(),
            height_roughness: "Height_rou".to_string(),
            perc_impervious: "perc_impervious".to_string(),
            perc_pervious: "perc_pervious".to_string(),
            perc_buildings: "perc_buildings".to_string(),
            mean_build_height: "mean_build_height".to_string(),
            aspect_ratio: "aspect_ratio".to_string(),
            albedo_majority: "albedo_majority".to_string(),
            albedo: "albedo".to_string(),
            lcz_class: "lcz_class".to_string(),
            lcz_int: "lcz_int".to_string(),
            lcz_rmsep: "lcz_rmsep".to_string(),
        }
    }
}

/// Pixel codes of the land-cover raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryCodes {
    pub impervious: i64,
    pub pervious: i64,
    pub building: i64,
}

impl Default for CategoryCodes {
    fn default() -> Self {
        Self {
            impervious: 0,
            pervious: 1,
            building: 2,
        }
    }
}

impl PipelineConfig {
    /// Land-cover categories paired with the fields their shares go to
    pub fn category_fields(&self) -> Vec<Category> {
        vec![
            Category::new(self.categories.impervious, &self.fields.perc_impervious),
            Category::new(self.categories.pervious, &self.fields.perc_pervious),
            Category::new(self.categories.building, &self.fields.perc_buildings),
        ]
    }

    /// Attributes the classifier reads, following the names the aggregation
    /// passes write to
    pub fn parameter_fields(&self) -> ParameterFields {
        let f = &self.fields;
        let derived = [
            (MorphologyParameter::BuildingSurfaceFraction, &f.perc_buildings),
            (MorphologyParameter::ImperviousSurfaceFraction, &f.perc_impervious),
            (MorphologyParameter::PerviousSurfaceFraction, &f.perc_pervious),
            (MorphologyParameter::HeightRoughness, &f.height_roughness),
            (MorphologyParameter::AspectRatio, &f.aspect_ratio),
            (MorphologyParameter::SurfaceAlbedo, &f.albedo),
        ];
        let fields = derived
            .into_iter()
            .fold(ParameterFields::identity(), |fields, (p, name)| fields.with(p, name));
        self.parameters
            .iter()
            .fold(fields, |fields, (&p, name)| fields.with(p, name))
    }

    pub fn aggregator(&self) -> ZonalAggregator {
        ZonalAggregator {
            median_fallback: self.median_fallback,
            min_median_dist: self.min_median_dist,
            albedo_scale: self.albedo_scale,
            parallel: self.parallel,
            progress: self.progress,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_median_dist > 0.0) {
            return Err(LczError::Config(format!(
                "min_median_dist must be positive, got {}",
                self.min_median_dist
            )));
        }
        if !(self.albedo_scale > 0.0) {
            return Err(LczError::Config(format!(
                "albedo_scale must be positive, got {}",
                self.albedo_scale
            )));
        }
        let c = &self.categories;
        if c.impervious == c.pervious || c.impervious == c.building || c.pervious == c.building {
            return Err(LczError::Config(
                "land-cover category codes must be distinct".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read and validate a JSON pipeline configuration
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let contents = fs::read_to_string(path).map_err(|e| {
        LczError::Config(format!("failed to read config {}: {}", path.display(), e))
    })?;
    let config: PipelineConfig = serde_json::from_str(&contents).map_err(|e| {
        LczError::Config(format!("failed to parse config {}: {}", path.display(), e))
    })?;
    config.validate()?;
    Ok(config)
}
