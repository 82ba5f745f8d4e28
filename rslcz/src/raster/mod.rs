//! Georeferenced rasters and the block-read boundary used by the zonal sampler.
//!
//! The core never opens files itself: anything that can describe its grid with a
//! [`RasterMeta`] and hand out pixel windows implements [`RasterSource`].

pub mod sampler;

#[cfg(feature = "gdal")]
pub mod gdal_source;

use crate::commons::basic_functions::is_data;
use crate::error::{LczError, Result};
use crate::geo_core::BoundingBox;

#[cfg(feature = "gdal")]
pub use gdal_source::GdalRaster;
pub use sampler::{RasterSampler, Sample};

/// Grid description of a north-up raster (band 1 only)
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMeta {
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    /// Pixel width in map units (positive)
    pub pixel_size_x: f64,
    /// Pixel height in map units (positive)
    pub pixel_size_y: f64,
    /// Outer extent of the raster
    pub extent: BoundingBox,
    /// Value marking missing samples
    pub nodata: Option<f64>,
    /// Opaque CRS identifier, passed through unchanged
    pub crs: Option<String>,
}

impl RasterMeta {
    /// Build from an origin at the top-left corner
    pub fn new(
        width: usize,
        height: usize,
        origin_x: f64,
        origin_y: f64,
        pixel_size_x: f64,
        pixel_size_y: f64,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(LczError::InvalidRaster(format!(
                "raster has no pixels ({}x{})",
                width, height
            )));
        }
        if !(pixel_size_x > 0.0 && pixel_size_y > 0.0) {
            return Err(LczError::InvalidRaster(format!(
                "pixel size must be positive, got ({}, {})",
                pixel_size_x, pixel_size_y
            )));
        }
        let extent = BoundingBox::new(
            origin_x,
            origin_y - height as f64 * pixel_size_y,
            origin_x + width as f64 * pixel_size_x,
            origin_y,
        );
        Ok(RasterMeta {
            width,
            height,
            pixel_size_x,
            pixel_size_y,
            extent,
            nodata: None,
            crs: None,
        })
    }

    /// Build from a GDAL-style geotransform `[x0, dx, rx, y0, ry, dy]`.
    /// Rotated grids are rejected since the inputs are expected north-up.
    pub fn from_geo_transform(gt: [f64; 6], width: usize, height: usize) -> Result<Self> {
        if gt[2] != 0.0 || gt[4] != 0.0 {
            return Err(LczError::InvalidRaster(
                "rotated geotransforms are not supported".to_string(),
            ));
        }
        Self::new(width, height, gt[0], gt[3], gt[1], gt[5].abs())
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    /// Pixel window covering `area`, clipped to the raster.
    ///
    /// Column/row counts are `floor(size / pixel_size)` of the clipped area, so
    /// a window may come back empty even when the boxes overlap.
    pub fn window_for(&self, area: &BoundingBox) -> Option<PixelWindow> {
        let clipped = area.intersection(&self.extent)?;

        let col_off = snap_floor((clipped.min_x - self.extent.min_x) / self.pixel_size_x);
        let row_off = snap_floor((self.extent.max_y - clipped.max_y) / self.pixel_size_y);
        let cols = snap_floor(clipped.width() / self.pixel_size_x);
        let rows = snap_floor(clipped.height() / self.pixel_size_y);

        let col_off = col_off.min(self.width);
        let row_off = row_off.min(self.height);
        let cols = cols.min(self.width - col_off);
        let rows = rows.min(self.height - row_off);

        if cols == 0 || rows == 0 {
            return None;
        }
        Some(PixelWindow {
            col_off,
            row_off,
            cols,
            rows,
        })
    }
}

/// `floor` that absorbs the rounding noise of coordinates sitting on pixel edges
fn snap_floor(value: f64) -> usize {
    const EDGE_EPSILON: f64 = 1e-9;
    let floored = (value + EDGE_EPSILON).floor();
    if floored <= 0.0 {
        0
    } else {
        floored as usize
    }
}

/// Rectangular pixel window, offsets counted from the top-left pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub cols: usize,
    pub rows: usize,
}

impl PixelWindow {
    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Values of one pixel window together with its georeferencing
#[derive(Debug, Clone)]
pub struct Block {
    pub window: PixelWindow,
    /// Map x of the window's left edge
    pub origin_x: f64,
    /// Map y of the window's top edge
    pub origin_y: f64,
    pub pixel_size_x: f64,
    pub pixel_size_y: f64,
    pub nodata: Option<f64>,
    /// Row-major values, `window.rows * window.cols` long
    pub values: Vec<f64>,
}

impl Block {
    pub fn new(meta: &RasterMeta, window: PixelWindow, values: Vec<f64>) -> Result<Self> {
        if values.len() != window.len() {
            return Err(LczError::RasterRead(format!(
                "block holds {} values, window {}x{} needs {}",
                values.len(),
                window.cols,
                window.rows,
                window.len()
            )));
        }
        Ok(Block {
            window,
            origin_x: meta.extent.min_x + window.col_off as f64 * meta.pixel_size_x,
            origin_y: meta.extent.max_y - window.row_off as f64 * meta.pixel_size_y,
            pixel_size_x: meta.pixel_size_x,
            pixel_size_y: meta.pixel_size_y,
            nodata: meta.nodata,
            values,
        })
    }

    pub fn rows(&self) -> usize {
        self.window.rows
    }

    pub fn cols(&self) -> usize {
        self.window.cols
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.window.cols + col]
    }

    /// Map x of the centre of column `col`
    pub fn center_x(&self, col: usize) -> f64 {
        self.origin_x + (col as f64 + 0.5) * self.pixel_size_x
    }

    /// Map y of the centre of row `row`
    pub fn center_y(&self, row: usize) -> f64 {
        self.origin_y - (row as f64 + 0.5) * self.pixel_size_y
    }

    /// Samples that carry data (finite and not nodata)
    pub fn data_values(&self) -> impl Iterator<Item = f64> + '_ {
        let nodata = self.nodata;
        self.values.iter().copied().filter(move |&v| is_data(v, nodata))
    }
}

/// Synchronous raster storage boundary.
///
/// Implementations must be safe to read from several worker threads at once;
/// the core treats every raster as immutable shared state.
pub trait RasterSource: Send + Sync {
    fn meta(&self) -> &RasterMeta;

    /// Row-major band 1 values of `window`
    fn read_block(&self, window: &PixelWindow) -> Result<Vec<f64>>;
}

/// Raster held fully in memory
#[derive(Debug, Clone)]
pub struct Raster {
    meta: RasterMeta,
    data: Vec<f64>,
}

impl Raster {
    pub fn new(meta: RasterMeta, data: Vec<f64>) -> Result<Self> {
        if data.len() != meta.width * meta.height {
            return Err(LczError::InvalidRaster(format!(
                "expected {} values for a {}x{} raster, got {}",
                meta.width * meta.height,
                meta.width,
                meta.height,
                data.len()
            )));
        }
        Ok(Raster { meta, data })
    }

    /// Build from rows listed top to bottom
    pub fn from_rows(
        rows: &[Vec<f64>],
        origin_x: f64,
        origin_y: f64,
        pixel_size: f64,
    ) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        if rows.iter().any(|r| r.len() != width) {
            return Err(LczError::InvalidRaster(
                "rows have different lengths".to_string(),
            ));
        }
        let meta = RasterMeta::new(width, height, origin_x, origin_y, pixel_size, pixel_size)?;
        Raster::new(meta, rows.concat())
    }

    /// Constant-valued raster
    pub fn filled(meta: RasterMeta, value: f64) -> Self {
        let len = meta.width * meta.height;
        Raster {
            meta,
            data: vec![value; len],
        }
    }

    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.meta.height && col < self.meta.width {
            Some(self.data[row * self.meta.width + col])
        } else {
            None
        }
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if row >= self.meta.height || col >= self.meta.width {
            return Err(LczError::InvalidRaster(format!(
                "pixel ({}, {}) outside {}x{} raster",
                row, col, self.meta.width, self.meta.height
            )));
        }
        self.data[row * self.meta.width + col] = value;
        Ok(())
    }

    pub fn set_nodata(&mut self, nodata: Option<f64>) {
        self.meta.nodata = nodata;
    }
}

impl RasterSource for Raster {
    fn meta(&self) -> &RasterMeta {
        &self.meta
    }

    fn read_block(&self, window: &PixelWindow) -> Result<Vec<f64>> {
        if window.col_off + window.cols > self.meta.width
            || window.row_off + window.rows > self.meta.height
        {
            return Err(LczError::RasterRead(format!(
                "window {:?} exceeds {}x{} raster",
                window, self.meta.width, self.meta.height
            )));
        }
        let mut values = Vec::with_capacity(window.len());
        for row in window.row_off..window.row_off + window.rows {
            let start = row * self.meta.width + window.col_off;
            values.extend_from_slice(&self.data[start..start + window.cols]);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_4x3() -> Raster {
        Raster::from_rows(
            &[
                vec![1.0, 2.0, 3.0, 4.0],
                vec![5.0, 6.0, 7.0, 8.0],
                vec![9.0, 10.0, 11.0, 12.0],
            ],
            100.0,
            200.0,
            2.0,
        )
        .unwrap()
    }

    #[test]
    fn test_meta_extent() {
        let raster = grid_4x3();
        assert_eq!(
            raster.meta().extent,
            BoundingBox::new(100.0, 194.0, 108.0, 200.0)
        );
    }

    #[test]
    fn test_from_geo_transform() {
        let meta = RasterMeta::from_geo_transform([10.0, 0.5, 0.0, 20.0, 0.0, -0.5], 4, 2).unwrap();
        assert_eq!(meta.extent, BoundingBox::new(10.0, 19.0, 12.0, 20.0));
        assert!(RasterMeta::from_geo_transform([0.0, 1.0, 0.2, 0.0, 0.0, -1.0], 2, 2).is_err());
    }

    #[test]
    fn test_window_for_inner_area() {
        let raster = grid_4x3();
        let window = raster
            .meta()
            .window_for(&BoundingBox::new(102.0, 194.0, 106.0, 198.0))
            .unwrap();
        assert_eq!(
            window,
            PixelWindow {
                col_off: 1,
                row_off: 1,
                cols: 2,
                rows: 2
            }
        );
        assert_eq!(raster.read_block(&window).unwrap(), vec![6.0, 7.0, 10.0, 11.0]);
    }

    #[test]
    fn test_window_for_clips_to_extent() {
        let raster = grid_4x3();
        let window = raster
            .meta()
            .window_for(&BoundingBox::new(104.0, 150.0, 300.0, 196.0))
            .unwrap();
        assert_eq!(window.col_off, 2);
        assert_eq!(window.row_off, 2);
        assert_eq!((window.cols, window.rows), (2, 1));
    }

    #[test]
    fn test_window_for_sub_pixel_overlap_is_empty() {
        let raster = grid_4x3();
        // 1 map unit wide but pixels are 2 units wide
        assert!(raster
            .meta()
            .window_for(&BoundingBox::new(107.0, 194.0, 110.0, 200.0))
            .is_none());
    }

    #[test]
    fn test_block_centres() {
        let raster = grid_4x3();
        let window = PixelWindow {
            col_off: 1,
            row_off: 1,
            cols: 2,
            rows: 1,
        };
        let block = Block::new(raster.meta(), window, raster.read_block(&window).unwrap()).unwrap();
        assert_eq!(block.center_x(0), 103.0);
        assert_eq!(block.center_y(0), 197.0);
        assert_eq!(block.value(0, 1), 7.0);
    }

    #[test]
    fn test_raster_rejects_bad_length() {
        let meta = RasterMeta::new(2, 2, 0.0, 2.0, 1.0, 1.0).unwrap();
        assert!(Raster::new(meta, vec![1.0; 3]).is_err());
    }
}
