use log::debug;

use super::{Block, RasterSource};
use crate::error::Result;
use crate::geo_core::BoundingBox;

/// Outcome of sampling a raster under a bounding box
#[derive(Debug, Clone)]
pub enum Sample {
    /// Pixels covering the clipped area
    Block(Block),
    /// The box misses the raster, or the overlap is thinner than one pixel.
    /// Not an error: callers pick their own fallback.
    NoOverlap,
}

impl Sample {
    pub fn block(&self) -> Option<&Block> {
        match self {
            Sample::Block(block) => Some(block),
            Sample::NoOverlap => None,
        }
    }

    pub fn is_no_overlap(&self) -> bool {
        matches!(self, Sample::NoOverlap)
    }
}

/// Reads the pixel block lying under a geometry's bounding box.
///
/// Borrows the raster: the sampler is cheap to build per pass and can be
/// shared between worker threads.
pub struct RasterSampler<'a, R: RasterSource + ?Sized> {
    source: &'a R,
}

impl<'a, R: RasterSource + ?Sized> RasterSampler<'a, R> {
    pub fn new(source: &'a R) -> Self {
        RasterSampler { source }
    }

    pub fn source(&self) -> &'a R {
        self.source
    }

    /// Sample the raster under `bbox`, clipped to the raster extent
    pub fn sample(&self, bbox: &BoundingBox) -> Result<Sample> {
        let meta = self.source.meta();
        let window = match meta.window_for(bbox) {
            Some(window) => window,
            None => {
                debug!("no pixel overlap for {:?}", bbox);
                return Ok(Sample::NoOverlap);
            }
        };
        let values = self.source.read_block(&window)?;
        Ok(Sample::Block(Block::new(meta, window, values)?))
    }
}
