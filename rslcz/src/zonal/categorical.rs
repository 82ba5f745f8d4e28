use geo::{LineString, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::commons::basic_functions::{is_data, percentage};
use crate::raster::Block;

/// A land-cover code and the attribute its percentage is written to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub code: i64,
    pub field: String,
}

impl Category {
    pub fn new(code: i64, field: &str) -> Self {
        Category {
            code,
            field: field.to_string(),
        }
    }
}

/// Rasterize `geometry` onto the pixel grid of `block`.
///
/// A pixel is inside when its centre is, by the even-odd rule over every
/// ring. Returns a row-major mask the size of the block.
pub fn polygon_mask(geometry: &MultiPolygon<f64>, block: &Block) -> Vec<bool> {
    let (rows, cols) = (block.rows(), block.cols());
    let mut mask = vec![false; rows * cols];
    let rings: Vec<&LineString<f64>> = geometry
        .0
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .collect();

    let mut crossings = Vec::new();
    for row in 0..rows {
        let yc = block.center_y(row);
        crossings.clear();
        for ring in &rings {
            for line in ring.lines() {
                let (x0, y0, x1, y1) = (line.start.x, line.start.y, line.end.x, line.end.y);
                // half-open so a vertex on the scanline counts once
                if (y0 <= yc) != (y1 <= yc) {
                    crossings.push(x0 + (yc - y0) * (x1 - x0) / (y1 - y0));
                }
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let (xa, xb) = (span[0], span[1]);
            let first = ((xa - block.origin_x) / block.pixel_size_x - 0.5).floor().max(0.0) as usize;
            for col in first..cols {
                let xc = block.center_x(col);
                if xc >= xb {
                    break;
                }
                if xc > xa {
                    mask[row * cols + col] = true;
                }
            }
        }
    }
    mask
}

/// Pixel counts per category inside the polygon, in `categories` order.
/// Nodata pixels and pixels holding other values are ignored.
pub fn category_counts(
    geometry: &MultiPolygon<f64>,
    block: &Block,
    categories: &[Category],
) -> Vec<usize> {
    let mask = polygon_mask(geometry, block);
    let mut counts = vec![0; categories.len()];
    for (value, _) in block.values.iter().zip(mask).filter(|(_, inside)| *inside) {
        if !is_data(*value, block.nodata) {
            continue;
        }
        if let Some(i) = categories.iter().position(|c| c.code as f64 == *value) {
            counts[i] += 1;
        }
    }
    counts
}

/// Percentages of each category over the categorised pixels inside the
/// polygon. `None` when no such pixel exists.
pub fn category_percentages(
    geometry: &MultiPolygon<f64>,
    block: &Block,
    categories: &[Category],
) -> Option<Vec<f64>> {
    let counts = category_counts(geometry, block, categories);
    let total: usize = counts.iter().sum();
    counts.iter().map(|&count| percentage(count, total)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Raster, RasterMeta, RasterSampler};
    use crate::geo_core::BoundingBox;
    use geo::{polygon, Contains, Point};

    fn block_of(raster: &Raster, bbox: BoundingBox) -> Block {
        RasterSampler::new(raster)
            .sample(&bbox)
            .unwrap()
            .block()
            .unwrap()
            .clone()
    }

    fn categories() -> Vec<Category> {
        vec![
            Category::new(0, "perc_impervious"),
            Category::new(1, "perc_pervious"),
            Category::new(2, "perc_buildings"),
        ]
    }

    #[test]
    fn test_mask_matches_point_in_polygon() {
        // L-shaped footprint with a hole, vertices off the pixel centres
        let shape = polygon!(
            exterior: [
                (x: 0.3, y: 0.2),
                (x: 9.7, y: 0.2),
                (x: 9.7, y: 4.1),
                (x: 4.2, y: 4.1),
                (x: 4.2, y: 9.8),
                (x: 0.3, y: 9.8),
            ],
            interiors: [
                [(x: 1.1, y: 1.1), (x: 2.9, y: 1.1), (x: 2.9, y: 2.9), (x: 1.1, y: 2.9)],
            ],
        );
        let geometry = MultiPolygon(vec![shape.clone()]);
        let raster = Raster::filled(
            RasterMeta::new(10, 10, 0.0, 10.0, 1.0, 1.0).unwrap(),
            1.0,
        );
        let block = block_of(&raster, BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        let mask = polygon_mask(&geometry, &block);

        let mut inside = 0;
        for row in 0..block.rows() {
            for col in 0..block.cols() {
                let centre = Point::new(block.center_x(col), block.center_y(row));
                assert_eq!(
                    mask[row * block.cols() + col],
                    shape.contains(&centre),
                    "pixel ({}, {})",
                    row,
                    col
                );
                inside += mask[row * block.cols() + col] as usize;
            }
        }
        // 10x4 strip + 4x6 column minus the 2x2 hole
        assert_eq!(inside, 40 + 24 - 4);
    }

    #[test]
    fn test_single_category_is_full_share() {
        let raster = Raster::filled(
            RasterMeta::new(4, 4, 0.0, 4.0, 1.0, 1.0).unwrap(),
            2.0,
        );
        let square = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)];
        let geometry = MultiPolygon(vec![square]);
        let block = block_of(&raster, BoundingBox::new(0.0, 0.0, 4.0, 4.0));
        let shares = category_percentages(&geometry, &block, &categories()).unwrap();
        assert_eq!(shares, vec![0.0, 0.0, 100.0]);
    }

    #[test]
    fn test_only_pixels_inside_are_counted() {
        // left half impervious, right half building
        let raster = Raster::from_rows(
            &[vec![0.0, 0.0, 2.0, 2.0], vec![0.0, 0.0, 2.0, 2.0]],
            0.0,
            2.0,
            1.0,
        )
        .unwrap();
        let triangle = polygon![(x: 0.0, y: 0.0), (x: 3.2, y: 0.0), (x: 0.0, y: 3.2)];
        let geometry = MultiPolygon(vec![triangle]);
        let block = block_of(&raster, BoundingBox::new(0.0, 0.0, 3.0, 3.0));
        let counts = category_counts(&geometry, &block, &categories());
        // centres (0.5,1.5) (1.5,1.5) (0.5,0.5) (1.5,0.5) (2.5,0.5) are inside
        assert_eq!(counts, vec![4, 0, 1]);
    }

    #[test]
    fn test_uncategorised_pixels_give_no_share() {
        let raster = Raster::filled(
            RasterMeta::new(2, 2, 0.0, 2.0, 1.0, 1.0).unwrap(),
            9.0,
        );
        let square = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        let block = block_of(&raster, BoundingBox::new(0.0, 0.0, 2.0, 2.0));
        assert!(category_percentages(&MultiPolygon(vec![square]), &block, &categories()).is_none());
    }
}
