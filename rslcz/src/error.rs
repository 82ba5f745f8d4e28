use thiserror::Error;

/// Errors raised while sampling rasters, aggregating grid attributes or classifying cells
#[derive(Debug, Error)]
pub enum LczError {
    /// A required raster, grid or attribute field is absent. Fatal for the whole pass.
    #[error("missing required input: {0}")]
    MissingInput(String),

    /// Feature geometry is empty or unreadable. Local to one feature.
    #[error("invalid geometry for feature {feature_id}: {reason}")]
    InvalidGeometry { feature_id: i64, reason: String },

    /// A stored attribute is not numeric where a number is expected. Local to one feature.
    #[error("field '{field}' of feature {feature_id} is not numeric: {value}")]
    Conversion {
        feature_id: i64,
        field: String,
        value: String,
    },

    #[error("'building_surface_fraction' is required for classification")]
    MissingBuildingFraction,

    #[error(
        "surface fractions must sum to 100 \
         (building={building}, impervious={impervious}, pervious={pervious}, sum={sum})"
    )]
    FractionSum {
        building: f64,
        impervious: f64,
        pervious: f64,
        sum: f64,
    },

    #[error("duplicate feature id {0}")]
    DuplicateFeatureId(i64),

    #[error("invalid raster: {0}")]
    InvalidRaster(String),

    #[error("failed to read raster block: {0}")]
    RasterRead(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "gdal")]
    #[error(transparent)]
    Gdal(#[from] gdal::errors::GdalError),
}

impl LczError {
    /// True for errors that only concern one feature and must not abort a batch
    pub fn is_feature_local(&self) -> bool {
        matches!(
            self,
            LczError::InvalidGeometry { .. } | LczError::Conversion { .. }
        )
    }

    /// True for the classification precondition failures
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LczError::MissingBuildingFraction | LczError::FractionSum { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LczError>;
