//! End-to-end LCZ run over a polygon grid

use std::collections::BTreeMap;
use std::fmt;

use log::{info, warn};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::geometric::{AttributeUpdate, FieldValue, PolygonFeature, PolygonGrid};
use crate::lcz::{
    ClassificationResult, LczClass, MorphologyParameter, MorphologyParameterSet, ParameterFields,
    RmsepClassifier,
};
use crate::raster::RasterSource;
use crate::zonal::{AggregationReport, FeatureOutcome, ZonalAggregator};

/// Rasters a run can draw from. Each is optional: the steps needing an
/// absent raster are skipped.
#[derive(Default, Clone, Copy)]
pub struct PipelineInputs<'a> {
    /// Distance to the nearest building, 0 on buildings
    pub distance: Option<&'a dyn RasterSource>,
    /// Surface model, masked to the built objects
    pub dsm: Option<&'a dyn RasterSource>,
    /// Terrain model
    pub dtm: Option<&'a dyn RasterSource>,
    /// Impervious / pervious / building codes
    pub land_cover: Option<&'a dyn RasterSource>,
    /// Albedo scaled by `albedo_scale`
    pub albedo: Option<&'a dyn RasterSource>,
}

impl<'a> PipelineInputs<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_distance(mut self, raster: &'a dyn RasterSource) -> Self {
        self.distance = Some(raster);
        self
    }

    pub fn with_dsm(mut self, raster: &'a dyn RasterSource) -> Self {
        self.dsm = Some(raster);
        self
    }

    pub fn with_dtm(mut self, raster: &'a dyn RasterSource) -> Self {
        self.dtm = Some(raster);
        self
    }

    pub fn with_land_cover(mut self, raster: &'a dyn RasterSource) -> Self {
        self.land_cover = Some(raster);
        self
    }

    pub fn with_albedo(mut self, raster: &'a dyn RasterSource) -> Self {
        self.albedo = Some(raster);
        self
    }
}

/// Counters of every step that ran, plus the number of cells per class
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub steps: Vec<AggregationReport>,
    pub classes: BTreeMap<LczClass, usize>,
}

impl PipelineReport {
    pub fn step(&self, name: &str) -> Option<&AggregationReport> {
        self.steps.iter().find(|s| s.step == name)
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            writeln!(f, "{}", step)?;
        }
        for (class, count) in &self.classes {
            writeln!(f, "LCZ {} ({}): {}", class, class.description(), count)?;
        }
        Ok(())
    }
}

/// Runs the aggregation steps in dependency order, then classifies every cell
pub struct LczPipeline {
    config: PipelineConfig,
    aggregator: ZonalAggregator,
    parameters: ParameterFields,
    classifier: RmsepClassifier<'static>,
}

impl Default for LczPipeline {
    fn default() -> Self {
        LczPipeline::new(PipelineConfig::default())
    }
}

impl LczPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let aggregator = config.aggregator();
        let parameters = config.parameter_fields();
        LczPipeline {
            config,
            aggregator,
            parameters,
            classifier: RmsepClassifier::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &RmsepClassifier<'static> {
        &self.classifier
    }

    pub fn run(&self, grid: &mut PolygonGrid, inputs: &PipelineInputs<'_>) -> Result<PipelineReport> {
        self.config.validate()?;
        let fields = &self.config.fields;
        let aggregator = &self.aggregator;
        let mut report = PipelineReport::default();

        info!("Running LCZ pipeline on {} cells", grid.len());

        match inputs.distance {
            Some(raster) => report
                .steps
                .push(aggregator.median_of_valid(grid, raster, &fields.median_dist)?),
            None => info!("No distance raster, skipping median distance"),
        }

        match inputs.dsm {
            Some(raster) => report
                .steps
                .push(aggregator.median_of_valid(grid, raster, &fields.dsm_median)?),
            None => info!("No surface model, skipping {}", fields.dsm_median),
        }
        match inputs.dtm {
            Some(raster) => report
                .steps
                .push(aggregator.median_of_valid(grid, raster, &fields.dtm_median)?),
            None => info!("No terrain model, skipping {}", fields.dtm_median),
        }

        if grid.has_field(&fields.dsm_median) && grid.has_field(&fields.dtm_median) {
            report.steps.push(aggregator.derive_height_roughness(
                grid,
                &fields.dsm_median,
                &fields.dtm_median,
                &fields.height_roughness,
            )?);
        } else {
            info!("Surface or terrain medians missing, skipping roughness height");
        }

        match inputs.land_cover {
            Some(raster) => report.steps.push(aggregator.categorical_percentages(
                grid,
                raster,
                &self.config.category_fields(),
            )?),
            None => info!("No land-cover raster, skipping surface fractions"),
        }

        match inputs.albedo {
            Some(raster) => {
                report
                    .steps
                    .push(aggregator.majority(grid, raster, &fields.albedo_majority)?);
                report.steps.push(aggregator.derive_albedo(
                    grid,
                    &fields.albedo_majority,
                    &fields.albedo,
                )?);
            }
            None => info!("No albedo raster, skipping albedo"),
        }

        if grid.has_field(&fields.mean_build_height) {
            report.steps.push(aggregator.derive_aspect_ratio(
                grid,
                &fields.mean_build_height,
                &fields.median_dist,
                &fields.aspect_ratio,
            )?);
        } else {
            warn!(
                "Grid has no '{}' field, skipping aspect ratio",
                fields.mean_build_height
            );
        }

        report.steps.push(self.classify_grid(grid)?);
        report.classes = class_histogram(grid, &fields.lcz_int);

        info!("LCZ pipeline finished");
        Ok(report)
    }

    /// Parameters of one cell, read through the configured field names
    pub fn parameters(&self, feature: &PolygonFeature) -> Result<MorphologyParameterSet> {
        MorphologyParameterSet::from_feature(feature, &self.parameters)
    }

    pub fn classify_feature(&self, feature: &PolygonFeature) -> Result<ClassificationResult> {
        self.classifier.classify(&self.parameters(feature)?)
    }

    /// Classify every cell and write its class id, integer code and RMSEP.
    ///
    /// The surface-fraction fields must exist in the grid. Cells whose values
    /// are not numeric or fail validation are counted and left as they were.
    pub fn classify_grid(&self, grid: &mut PolygonGrid) -> Result<AggregationReport> {
        for parameter in [
            MorphologyParameter::BuildingSurfaceFraction,
            MorphologyParameter::ImperviousSurfaceFraction,
            MorphologyParameter::PerviousSurfaceFraction,
        ] {
            grid.require_field(self.parameters.field(parameter))?;
        }
        let fields = &self.config.fields;

        let outputs = [
            fields.lcz_class.as_str(),
            fields.lcz_int.as_str(),
            fields.lcz_rmsep.as_str(),
        ];

        self.aggregator.run_pass(grid, "classification", &outputs, |feature| {
            let result = self.classify_feature(feature)?;
            let rmsep = if result.rmsep.is_finite() {
                FieldValue::Number(result.rmsep)
            } else {
                FieldValue::Null
            };
            Ok(FeatureOutcome::Updated(
                AttributeUpdate::new(feature.id)
                    .with(&fields.lcz_class, result.class.id())
                    .with(&fields.lcz_int, result.class.code() as f64)
                    .with(&fields.lcz_rmsep, rmsep),
            ))
        })
    }
}

fn class_histogram(grid: &PolygonGrid, code_field: &str) -> BTreeMap<LczClass, usize> {
    let mut classes = BTreeMap::new();
    for feature in grid.features() {
        let class = feature
            .get(code_field)
            .and_then(FieldValue::as_f64)
            .and_then(|code| LczClass::from_code(code as u8));
        if let Some(class) = class {
            *classes.entry(class).or_insert(0) += 1;
        }
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LczError;
    use geo::{polygon, MultiPolygon};

    fn cell(id: i64) -> PolygonFeature {
        let p = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        PolygonFeature::new(id, MultiPolygon(vec![p]))
    }

    #[test]
    fn test_classify_grid_writes_class_fields() {
        let mut grid = PolygonGrid::from_features(vec![
            cell(1)
                .with_attribute("perc_buildings", 0.0)
                .with_attribute("perc_impervious", 0.0)
                .with_attribute("perc_pervious", 100.0)
                .with_attribute("sky_view_factor", 0.3)
                .with_attribute("Height_rou", 20.0),
            cell(2)
                .with_attribute("perc_buildings", 10.0)
                .with_attribute("perc_impervious", 10.0)
                .with_attribute("perc_pervious", 10.0),
            cell(3).with_attribute("perc_buildings", "unknown"),
        ])
        .unwrap();

        let pipeline = LczPipeline::default();
        let report = pipeline.classify_grid(&mut grid).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.errors, 2);

        let dense_trees = grid.get(1).unwrap();
        assert_eq!(dense_trees.get("lcz_class"), Some(&FieldValue::from("A")));
        assert_eq!(dense_trees.number("lcz_int").unwrap(), Some(11.0));
        assert_eq!(dense_trees.number("lcz_rmsep").unwrap(), Some(0.0));
        assert_eq!(grid.get(2).unwrap().get("lcz_class"), None);

        let classes = class_histogram(&grid, "lcz_int");
        assert_eq!(classes.get(&LczClass::DenseTrees), Some(&1));
    }

    #[test]
    fn test_classify_grid_requires_fraction_fields() {
        let mut grid = PolygonGrid::from_features(vec![cell(1)]).unwrap();
        let err = LczPipeline::default().classify_grid(&mut grid).unwrap_err();
        assert!(matches!(err, LczError::MissingInput(_)));
    }

    #[test]
    fn test_infinite_rmsep_is_null() {
        // natural cell with heat output: every land-cover class has a zero target
        let mut grid = PolygonGrid::from_features(vec![cell(1)
            .with_attribute("perc_buildings", 0.0)
            .with_attribute("perc_impervious", 50.0)
            .with_attribute("perc_pervious", 50.0)
            .with_attribute("anthropogenic_heat", 40.0)])
        .unwrap();
        LczPipeline::default().classify_grid(&mut grid).unwrap();
        let feature = grid.get(1).unwrap();
        assert!(feature.get("lcz_class").is_some());
        assert_eq!(feature.get("lcz_rmsep"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_report_display() {
        let mut report = PipelineReport::default();
        report.steps.push(AggregationReport::new("albedo"));
        report.classes.insert(LczClass::Water, 3);
        let text = report.to_string();
        assert!(text.contains("albedo: 0 processed"));
        assert!(text.contains("LCZ G (Water): 3"));
    }
}
