use std::path::Path;
use std::sync::Mutex;

use gdal::Dataset;
use log::info;

use super::{PixelWindow, RasterMeta, RasterSource};
use crate::error::{LczError, Result};

/// Band 1 of a GDAL dataset, read window by window.
///
/// GDAL handles are not shareable between threads, so reads are serialised
/// behind a mutex; the sampling work around them still runs in parallel.
pub struct GdalRaster {
    dataset: Mutex<Dataset>,
    meta: RasterMeta,
}

impl GdalRaster {
    /// Open a raster file (GeoTIFF or any GDAL-readable format)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LczError::MissingInput(format!(
                "raster file {}",
                path.display()
            )));
        }
        let dataset = Dataset::open(path)?;

        if dataset.raster_count() < 1 {
            return Err(LczError::InvalidRaster(format!(
                "{} has no raster band",
                path.display()
            )));
        }

        let (width, height) = dataset.raster_size();
        let geo_transform = dataset.geo_transform()?;
        let nodata = dataset.rasterband(1)?.no_data_value();
        let projection = dataset.projection();

        let mut meta =
            RasterMeta::from_geo_transform(geo_transform, width, height)?.with_nodata(nodata);
        if !projection.is_empty() {
            meta = meta.with_crs(projection);
        }

        info!(
            "Opened raster {:?}: {}x{} px, pixel size ({}, {})",
            path, width, height, meta.pixel_size_x, meta.pixel_size_y
        );

        Ok(GdalRaster {
            dataset: Mutex::new(dataset),
            meta,
        })
    }
}

impl RasterSource for GdalRaster {
    fn meta(&self) -> &RasterMeta {
        &self.meta
    }

    fn read_block(&self, window: &PixelWindow) -> Result<Vec<f64>> {
        let dataset = self
            .dataset
            .lock()
            .map_err(|_| LczError::RasterRead("raster handle poisoned".to_string()))?;
        let band = dataset.rasterband(1)?;
        let buffer = band.read_as::<f64>(
            (window.col_off as isize, window.row_off as isize),
            (window.cols, window.rows),
            (window.cols, window.rows),
            None,
        )?;
        Ok(buffer.data().to_vec())
    }
}
