use log::debug;

use super::{AggregationReport, FeatureOutcome, ZonalAggregator};
use crate::error::Result;
use crate::geometric::{AttributeUpdate, PolygonGrid};

impl ZonalAggregator {
    /// `out = dsm - dtm` where both medians are numeric; otherwise the feature
    /// is counted missing and `out` stays unset.
    pub fn derive_height_roughness(
        &self,
        grid: &mut PolygonGrid,
        dsm_field: &str,
        dtm_field: &str,
        out_field: &str,
    ) -> Result<AggregationReport> {
        grid.require_field(dsm_field)?;
        grid.require_field(dtm_field)?;

        self.run_pass(grid, "height roughness", &[out_field], |feature| {
            let dsm = feature.number(dsm_field)?;
            let dtm = feature.number(dtm_field)?;
            Ok(match (dsm, dtm) {
                (Some(dsm), Some(dtm)) => FeatureOutcome::Updated(
                    AttributeUpdate::new(feature.id).with(out_field, dsm - dtm),
                ),
                _ => {
                    debug!("feature {}: missing surface or terrain median", feature.id);
                    FeatureOutcome::Missing(None)
                }
            })
        })
    }

    /// `aspect_ratio = height / max(median_dist, min_median_dist)`.
    ///
    /// Every feature gets the floored distance written back to `dist_field`,
    /// an absent distance included. An absent height leaves only the ratio
    /// unset.
    pub fn derive_aspect_ratio(
        &self,
        grid: &mut PolygonGrid,
        height_field: &str,
        dist_field: &str,
        out_field: &str,
    ) -> Result<AggregationReport> {
        grid.require_field(height_field)?;
        let floor = self.min_median_dist;

        self.run_pass(grid, "aspect ratio", &[dist_field, out_field], |feature| {
            let height = feature.number(height_field)?;
            let distance = feature
                .number(dist_field)?
                .filter(|&d| d >= floor)
                .unwrap_or(floor);
            let update = AttributeUpdate::new(feature.id).with(dist_field, distance);
            Ok(match height {
                Some(height) => FeatureOutcome::Updated(update.with(out_field, height / distance)),
                None => FeatureOutcome::Missing(Some(update)),
            })
        })
    }

    /// `out = raw / albedo_scale`
    pub fn derive_albedo(
        &self,
        grid: &mut PolygonGrid,
        raw_field: &str,
        out_field: &str,
    ) -> Result<AggregationReport> {
        grid.require_field(raw_field)?;
        let scale = self.albedo_scale;

        self.run_pass(grid, "albedo", &[out_field], |feature| {
            Ok(match feature.number(raw_field)? {
                Some(raw) => FeatureOutcome::Updated(
                    AttributeUpdate::new(feature.id).with(out_field, raw / scale),
                ),
                None => FeatureOutcome::Missing(None),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LczError;
    use crate::geometric::PolygonFeature;
    use approx::assert_relative_eq;
    use geo::{polygon, MultiPolygon};

    fn cell(id: i64) -> PolygonFeature {
        let p = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        PolygonFeature::new(id, MultiPolygon(vec![p]))
    }

    #[test]
    fn test_height_roughness_needs_both_medians() {
        let mut grid = PolygonGrid::from_features(vec![
            cell(1).with_attribute("dsm_median", 42.5).with_attribute("dtm_median", 12.5),
            cell(2).with_attribute("dsm_median", 42.5),
            cell(3)
                .with_attribute("dsm_median", "n/a")
                .with_attribute("dtm_median", 10.0),
        ])
        .unwrap();
        let report = ZonalAggregator::new()
            .derive_height_roughness(&mut grid, "dsm_median", "dtm_median", "Height_rou")
            .unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.missing, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(grid.get(1).unwrap().number("Height_rou").unwrap(), Some(30.0));
        assert_eq!(grid.get(2).unwrap().get("Height_rou"), None);
        assert_eq!(grid.get(3).unwrap().get("Height_rou"), None);
    }

    #[test]
    fn test_height_roughness_requires_fields() {
        let mut grid = PolygonGrid::from_features(vec![cell(1)]).unwrap();
        let err = ZonalAggregator::new()
            .derive_height_roughness(&mut grid, "dsm_median", "dtm_median", "Height_rou")
            .unwrap_err();
        assert!(matches!(err, LczError::MissingInput(name) if name.contains("dsm_median")));
    }

    #[test]
    fn test_aspect_ratio_floors_distance() {
        let mut grid = PolygonGrid::from_features(vec![
            cell(1)
                .with_attribute("mean_build_height", 12.0)
                .with_attribute("median_dist", 4.0),
            cell(2)
                .with_attribute("mean_build_height", 12.0)
                .with_attribute("median_dist", 0.001),
            cell(3).with_attribute("mean_build_height", 9.0),
            cell(4).with_attribute("median_dist", 8.0),
            cell(5).with_attribute("median_dist", 0.2),
            cell(6),
        ])
        .unwrap();
        let report = ZonalAggregator::new()
            .derive_aspect_ratio(&mut grid, "mean_build_height", "median_dist", "aspect_ratio")
            .unwrap();

        assert_eq!(report.updated, 3);
        assert_eq!(report.missing, 3);
        assert_eq!(grid.get(1).unwrap().number("aspect_ratio").unwrap(), Some(3.0));
        assert_eq!(grid.get(2).unwrap().number("aspect_ratio").unwrap(), Some(12.0));
        assert_eq!(grid.get(2).unwrap().number("median_dist").unwrap(), Some(1.0));
        assert_eq!(grid.get(3).unwrap().number("median_dist").unwrap(), Some(1.0));
        assert_eq!(grid.get(4).unwrap().get("aspect_ratio"), None);
        assert_eq!(grid.get(4).unwrap().number("median_dist").unwrap(), Some(8.0));
        // no building height: the distance is still floored
        assert_eq!(grid.get(5).unwrap().number("median_dist").unwrap(), Some(1.0));
        assert_eq!(grid.get(6).unwrap().number("median_dist").unwrap(), Some(1.0));
        assert_eq!(grid.get(6).unwrap().get("aspect_ratio"), None);
    }

    #[test]
    fn test_albedo_is_rescaled() {
        let mut grid = PolygonGrid::from_features(vec![
            cell(1).with_attribute("albedo_majority", 1500.0),
            cell(2),
        ])
        .unwrap();
        ZonalAggregator::new()
            .derive_albedo(&mut grid, "albedo_majority", "albedo")
            .unwrap();
        assert_relative_eq!(
            grid.get(1).unwrap().number("albedo").unwrap().unwrap(),
            0.15
        );
        assert_eq!(grid.get(2).unwrap().get("albedo"), None);
    }
}
