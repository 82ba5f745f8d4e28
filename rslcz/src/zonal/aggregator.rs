use log::{debug, warn};

use super::categorical::{category_percentages, polygon_mask, Category};
use super::{AggregationReport, FeatureOutcome, ZonalAggregator};
use crate::commons::basic_functions::{majority, median_of_valid};
use crate::error::Result;
use crate::geometric::{AttributeUpdate, FieldValue, PolygonGrid};
use crate::raster::{RasterSampler, RasterSource, Sample};

impl ZonalAggregator {
    /// Median of the non-zero valid samples under each feature's bounding box,
    /// written to `field`.
    ///
    /// Features without overlap or valid samples get the configured fallback,
    /// or keep the field unset when there is none.
    pub fn median_of_valid<R>(
        &self,
        grid: &mut PolygonGrid,
        raster: &R,
        field: &str,
    ) -> Result<AggregationReport>
    where
        R: RasterSource + ?Sized,
    {
        let sampler = RasterSampler::new(raster);
        let fallback = self.median_fallback;
        let step = format!("median {}", field);

        self.run_pass(grid, &step, &[field], |feature| {
            let bbox = feature.bbox()?;
            let median = match sampler.sample(&bbox)? {
                Sample::Block(block) => median_of_valid(&block.values, block.nodata),
                Sample::NoOverlap => None,
            };
            Ok(match median {
                Some(value) => {
                    FeatureOutcome::Updated(AttributeUpdate::new(feature.id).with(field, value))
                }
                None => {
                    debug!("feature {}: no valid sample for {}", feature.id, field);
                    FeatureOutcome::Missing(
                        fallback.map(|v| AttributeUpdate::new(feature.id).with(field, v)),
                    )
                }
            })
        })
    }

    /// Most frequent value among the pixels whose centres lie inside each
    /// feature, written to `field`.
    pub fn majority<R>(
        &self,
        grid: &mut PolygonGrid,
        raster: &R,
        field: &str,
    ) -> Result<AggregationReport>
    where
        R: RasterSource + ?Sized,
    {
        let sampler = RasterSampler::new(raster);
        let step = format!("majority {}", field);

        self.run_pass(grid, &step, &[field], |feature| {
            let bbox = feature.bbox()?;
            let value = match sampler.sample(&bbox)? {
                Sample::Block(block) => {
                    let mask = polygon_mask(&feature.geometry, &block);
                    let inside = block
                        .values
                        .iter()
                        .zip(mask)
                        .filter_map(|(&v, inside)| inside.then_some(v));
                    majority(inside, block.nodata)
                }
                Sample::NoOverlap => None,
            };
            Ok(match value {
                Some(value) => {
                    FeatureOutcome::Updated(AttributeUpdate::new(feature.id).with(field, value))
                }
                None => FeatureOutcome::Missing(None),
            })
        })
    }

    /// Share of each land-cover category inside each feature, one field per
    /// category. A feature with no categorised pixel inside gets no value.
    pub fn categorical_percentages<R>(
        &self,
        grid: &mut PolygonGrid,
        raster: &R,
        categories: &[Category],
    ) -> Result<AggregationReport>
    where
        R: RasterSource + ?Sized,
    {
        let sampler = RasterSampler::new(raster);
        let outputs: Vec<&str> = categories.iter().map(|c| c.field.as_str()).collect();

        self.run_pass(grid, "surface fractions", &outputs, |feature| {
            let bbox = feature.bbox()?;
            let shares = match sampler.sample(&bbox)? {
                Sample::Block(block) => category_percentages(&feature.geometry, &block, categories),
                Sample::NoOverlap => None,
            };
            let Some(shares) = shares else {
                warn!("No categorised pixel inside feature {}", feature.id);
                return Ok(FeatureOutcome::Missing(None));
            };
            let update = categories
                .iter()
                .zip(shares)
                .fold(AttributeUpdate::new(feature.id), |update, (category, share)| {
                    update.with(&category.field, FieldValue::Number(share))
                });
            Ok(FeatureOutcome::Updated(update))
        })
    }
}
