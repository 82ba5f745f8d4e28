pub mod commons;
pub mod config;
pub mod error;
pub mod geo_core;
pub mod geometric;
pub mod lcz;
pub mod pipeline;
pub mod raster;
pub mod zonal;

// Local Climate Zone classification of polygon grids.
// Raster zonal statistics feed the morphology parameters of each cell,
// which are then scored against the LCZ reference ranges (RMSEP).
pub use config::{load_config, PipelineConfig};
pub use error::{LczError, Result};
pub use geo_core::BoundingBox;
pub use geometric::{AttributeUpdate, FieldValue, PolygonFeature, PolygonGrid};
pub use lcz::{
    ClassificationResult, LczClass, LczReferenceTable, MorphologyParameter,
    MorphologyParameterSet, RmsepClassifier,
};
pub use pipeline::{LczPipeline, PipelineInputs, PipelineReport};
pub use raster::{Raster, RasterMeta, RasterSampler, RasterSource, Sample};
pub use zonal::{AggregationReport, ZonalAggregator};
