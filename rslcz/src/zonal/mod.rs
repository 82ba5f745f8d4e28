//! Per-feature zonal statistics over a polygon grid.
//!
//! Every pass reads the grid and the rasters concurrently, collects one
//! [`AttributeUpdate`] per feature and commits the batch serially, so all
//! fields written for a feature appear together.

pub mod aggregator;
pub mod categorical;
pub mod derived;

use std::fmt;

use log::{info, warn};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::Serialize;

#[cfg(feature = "indicatif")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::Result;
use crate::geometric::{AttributeUpdate, PolygonFeature, PolygonGrid};

pub use categorical::{polygon_mask, Category};

#[cfg(feature = "indicatif")]
fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {percent} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

/// Counters of one aggregation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationReport {
    pub step: String,
    /// Features visited
    pub processed: usize,
    /// Features that received a value
    pub updated: usize,
    /// Features without a usable value (no overlap, no valid samples, absent inputs)
    pub missing: usize,
    /// Features skipped on a per-feature error (invalid geometry, non-numeric
    /// input, parameters failing validation)
    pub errors: usize,
}

impl AggregationReport {
    pub fn new(step: &str) -> Self {
        AggregationReport {
            step: step.to_string(),
            ..Default::default()
        }
    }
}

impl fmt::Display for AggregationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} processed, {} updated, {} missing, {} errors",
            self.step, self.processed, self.updated, self.missing, self.errors
        )
    }
}

/// What a pass produced for one feature
#[derive(Debug)]
pub(crate) enum FeatureOutcome {
    Updated(AttributeUpdate),
    /// No value; the update, if any, carries fallback values
    Missing(Option<AttributeUpdate>),
}

/// Settings shared by the aggregation passes
#[derive(Debug, Clone)]
pub struct ZonalAggregator {
    /// Value written when a median has no valid sample. `None` leaves the field unset.
    pub median_fallback: Option<f64>,
    /// Floor applied to the median distance before dividing by it
    pub min_median_dist: f64,
    /// Raw albedo encoding factor
    pub albedo_scale: f64,
    pub parallel: bool,
    pub progress: bool,
}

impl Default for ZonalAggregator {
    fn default() -> Self {
        ZonalAggregator {
            median_fallback: None,
            min_median_dist: 1.0,
            albedo_scale: 10_000.0,
            parallel: true,
            progress: false,
        }
    }
}

impl ZonalAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_median_fallback(mut self, fallback: Option<f64>) -> Self {
        self.median_fallback = fallback;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Run `compute` on every feature, then commit the collected updates.
    ///
    /// `outputs` join the grid schema once the pass completes, even when no
    /// feature received a value. Feature-local errors and failed
    /// classification preconditions are logged and counted; any other error
    /// aborts the pass before anything is written.
    pub(crate) fn run_pass<F>(
        &self,
        grid: &mut PolygonGrid,
        step: &str,
        outputs: &[&str],
        compute: F,
    ) -> Result<AggregationReport>
    where
        F: Fn(&PolygonFeature) -> Result<FeatureOutcome> + Sync + Send,
    {
        let outcomes = self.map_features(grid.features(), step, &compute);

        let mut report = AggregationReport::new(step);
        let mut updates = Vec::with_capacity(outcomes.len());
        for (feature, outcome) in grid.features().iter().zip(outcomes) {
            report.processed += 1;
            match outcome {
                Ok(FeatureOutcome::Updated(update)) => {
                    report.updated += 1;
                    updates.push(update);
                }
                Ok(FeatureOutcome::Missing(fallback)) => {
                    report.missing += 1;
                    updates.extend(fallback);
                }
                Err(e) if e.is_feature_local() || e.is_validation() => {
                    warn!("{}: skipping feature {}: {}", step, feature.id, e);
                    report.errors += 1;
                }
                Err(e) => return Err(e),
            }
        }

        for field in outputs {
            grid.add_field(field);
        }
        grid.commit(updates);
        info!("{}", report);
        Ok(report)
    }

    fn map_features<F>(
        &self,
        features: &[PolygonFeature],
        step: &str,
        compute: &F,
    ) -> Vec<Result<FeatureOutcome>>
    where
        F: Fn(&PolygonFeature) -> Result<FeatureOutcome> + Sync + Send,
    {
        #[cfg(feature = "indicatif")]
        let pb = if self.progress {
            let pb = ProgressBar::new(features.len() as u64);
            pb.set_style(progress_style());
            pb.set_message(step.to_string());
            Some(pb)
        } else {
            None
        };
        #[cfg(not(feature = "indicatif"))]
        let _ = step;

        let run = |feature: &PolygonFeature| {
            let outcome = compute(feature);
            #[cfg(feature = "indicatif")]
            if let Some(ref pb) = pb {
                pb.inc(1);
            }
            outcome
        };

        #[cfg(feature = "rayon")]
        let outcomes: Vec<Result<FeatureOutcome>> = if self.parallel {
            features.par_iter().map(run).collect()
        } else {
            features.iter().map(run).collect()
        };

        #[cfg(not(feature = "rayon"))]
        let outcomes: Vec<Result<FeatureOutcome>> = features.iter().map(run).collect();

        #[cfg(feature = "indicatif")]
        if let Some(pb) = pb {
            pb.finish_with_message(format!("{} done", step));
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LczError;
    use geo::{polygon, MultiPolygon};

    fn grid() -> PolygonGrid {
        let features = (1..=4)
            .map(|id| {
                let x = id as f64;
                let square = polygon![
                    (x: x, y: 0.0),
                    (x: x + 1.0, y: 0.0),
                    (x: x + 1.0, y: 1.0),
                    (x: x, y: 1.0),
                ];
                PolygonFeature::new(id, MultiPolygon(vec![square]))
            })
            .collect();
        PolygonGrid::from_features(features).unwrap()
    }

    #[test]
    fn test_run_pass_counts_outcomes() {
        let mut grid = grid();
        let report = ZonalAggregator::new()
            .run_pass(&mut grid, "test", &["value"], |feature| match feature.id {
                1 => Ok(FeatureOutcome::Updated(
                    AttributeUpdate::new(1).with("value", 1.0),
                )),
                2 => Ok(FeatureOutcome::Missing(None)),
                3 => Ok(FeatureOutcome::Missing(Some(
                    AttributeUpdate::new(3).with("value", 0.5),
                ))),
                id => Err(LczError::InvalidGeometry {
                    feature_id: id,
                    reason: "empty geometry".to_string(),
                }),
            })
            .unwrap();

        assert_eq!(report.processed, 4);
        assert_eq!(report.updated, 1);
        assert_eq!(report.missing, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(grid.get(1).unwrap().number("value").unwrap(), Some(1.0));
        assert_eq!(grid.get(2).unwrap().number("value").unwrap(), None);
        assert_eq!(grid.get(3).unwrap().number("value").unwrap(), Some(0.5));
        assert_eq!(
            report.to_string(),
            "test: 4 processed, 1 updated, 2 missing, 1 errors"
        );
    }

    #[test]
    fn test_fatal_error_aborts_before_commit() {
        let mut grid = grid();
        let result = ZonalAggregator::new().with_parallel(false).run_pass(
            &mut grid,
            "test",
            &["value"],
            |feature| {
                if feature.id == 4 {
                    Err(LczError::RasterRead("disk gone".to_string()))
                } else {
                    Ok(FeatureOutcome::Updated(
                        AttributeUpdate::new(feature.id).with("value", 1.0),
                    ))
                }
            },
        );
        assert!(matches!(result, Err(LczError::RasterRead(_))));
        assert!(!grid.has_field("value"));
    }

    #[test]
    fn test_outputs_registered_without_values() {
        let mut grid = grid();
        let report = ZonalAggregator::new()
            .run_pass(&mut grid, "test", &["value"], |_| Ok(FeatureOutcome::Missing(None)))
            .unwrap();
        assert_eq!(report.missing, 4);
        assert!(grid.has_field("value"));
        assert_eq!(grid.get(1).unwrap().get("value"), None);
    }
}
