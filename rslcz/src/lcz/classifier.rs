use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use super::parameters::{MorphologyParameter, MorphologyParameterSet};
use super::reference::{LczClass, LczClassDefinition, LczReferenceTable};
use super::summary::ClassificationSummary;
use crate::error::{LczError, Result};

/// Allowed deviation of the surface-fraction sum from 100
pub const FRACTION_SUM_TOLERANCE: f64 = 1e-6;

/// Score of one class against a parameter set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub class: LczClass,
    /// False when the building-fraction gate rules the class out
    pub eligible: bool,
    /// Root mean square percentage error; `0` for a perfect fit, `inf` when disqualified
    pub rmsep: f64,
    pub perfect_matches: usize,
    /// Squared relative error per scored parameter (`0` for in-range values)
    pub contributions: BTreeMap<MorphologyParameter, f64>,
}

impl ClassScore {
    fn disqualified(class: LczClass, eligible: bool) -> Self {
        ClassScore {
            class,
            eligible,
            rmsep: f64::INFINITY,
            perfect_matches: 0,
            contributions: BTreeMap::new(),
        }
    }

    pub fn is_disqualified(&self) -> bool {
        self.rmsep.is_infinite()
    }
}

/// Outcome of classifying one parameter set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub class: LczClass,
    pub rmsep: f64,
    pub perfect_matches: usize,
    /// Non-null input parameters
    pub available_params: usize,
    /// Per-parameter contributions of the winning class
    pub contributions: BTreeMap<MorphologyParameter, f64>,
    /// Scores of every class, in class order
    pub scores: Vec<ClassScore>,
    pub parameters: MorphologyParameterSet,
}

impl ClassificationResult {
    pub fn score(&self, class: LczClass) -> Option<&ClassScore> {
        self.scores.iter().find(|s| s.class == class)
    }

    /// Highest perfect-match count over the eligible classes
    pub fn max_perfect_matches(&self) -> usize {
        max_perfect_matches(&self.scores)
    }

    /// Eligible classes reaching the highest perfect-match count, best RMSEP first
    pub fn tied_scores(&self) -> Vec<&ClassScore> {
        let max = self.max_perfect_matches();
        let mut tied: Vec<&ClassScore> = self
            .scores
            .iter()
            .filter(|s| s.eligible && s.perfect_matches == max)
            .collect();
        tied.sort_by(|a, b| a.rmsep.total_cmp(&b.rmsep).then(a.class.cmp(&b.class)));
        tied
    }
}

fn max_perfect_matches(scores: &[ClassScore]) -> usize {
    scores
        .iter()
        .filter(|s| s.eligible)
        .map(|s| s.perfect_matches)
        .max()
        .unwrap_or(0)
}

/// Scores parameter sets against an LCZ reference table and picks the best fit.
///
/// Selection keeps the classes with the most in-range parameters, then the
/// lowest RMSEP, then the first class in `1..10, A..G` order.
#[derive(Debug, Clone, Copy)]
pub struct RmsepClassifier<'a> {
    table: &'a LczReferenceTable,
}

impl Default for RmsepClassifier<'static> {
    fn default() -> Self {
        RmsepClassifier::new(LczReferenceTable::standard())
    }
}

impl<'a> RmsepClassifier<'a> {
    pub fn new(table: &'a LczReferenceTable) -> Self {
        RmsepClassifier { table }
    }

    pub fn table(&self) -> &'a LczReferenceTable {
        self.table
    }

    /// Check the classification preconditions.
    ///
    /// The building fraction must be present and the three surface fractions
    /// (absent impervious/pervious counting as 0) must sum to 100.
    pub fn validate(&self, parameters: &MorphologyParameterSet) -> Result<()> {
        let building = parameters
            .get(MorphologyParameter::BuildingSurfaceFraction)
            .ok_or(LczError::MissingBuildingFraction)?;
        let impervious = parameters
            .get(MorphologyParameter::ImperviousSurfaceFraction)
            .unwrap_or(0.0);
        let pervious = parameters
            .get(MorphologyParameter::PerviousSurfaceFraction)
            .unwrap_or(0.0);

        let sum = building + impervious + pervious;
        if !((sum - 100.0).abs() <= FRACTION_SUM_TOLERANCE) {
            return Err(LczError::FractionSum {
                building,
                impervious,
                pervious,
                sum,
            });
        }
        Ok(())
    }

    /// Score a single class.
    ///
    /// Built classes need a positive building fraction, land-cover classes
    /// none at all; a class failing that gate is disqualified.
    pub fn score_class(
        &self,
        parameters: &MorphologyParameterSet,
        definition: &LczClassDefinition,
    ) -> ClassScore {
        let class = definition.class;
        let gate_open = match parameters.get(MorphologyParameter::BuildingSurfaceFraction) {
            Some(building) if class.is_built() => building > 0.0,
            Some(building) => building <= 0.0,
            None => false,
        };
        if !gate_open {
            return ClassScore::disqualified(class, false);
        }

        let mut available = 0;
        let mut perfect_matches = 0;
        let mut errors = Vec::new();
        let mut contributions = BTreeMap::new();

        for (parameter, range) in definition.ranges() {
            let Some(value) = parameters.get(parameter) else {
                continue;
            };
            available += 1;

            if range.contains(value) {
                perfect_matches += 1;
                contributions.insert(parameter, 0.0);
                continue;
            }

            let target = range.target();
            let error = if target == 0.0 {
                // no relative error against a zero target
                f64::INFINITY
            } else {
                ((value - target) / target).powi(2)
            };
            contributions.insert(parameter, error);
            errors.push(error);
        }

        if available == 0 {
            return ClassScore::disqualified(class, true);
        }

        let rmsep = if errors.is_empty() {
            0.0
        } else {
            (errors.iter().sum::<f64>() / errors.len() as f64).sqrt()
        };

        ClassScore {
            class,
            eligible: true,
            rmsep,
            perfect_matches,
            contributions,
        }
    }

    /// Classify a parameter set. Validation failures return no partial result.
    pub fn classify(&self, parameters: &MorphologyParameterSet) -> Result<ClassificationResult> {
        self.validate(parameters)?;

        let scores: Vec<ClassScore> = self
            .table
            .definitions()
            .map(|definition| self.score_class(parameters, definition))
            .collect();

        for score in &scores {
            debug!(
                "LCZ {}: rmsep={:.4}, perfect matches={}",
                score.class, score.rmsep, score.perfect_matches
            );
        }

        let max_perfect = max_perfect_matches(&scores);
        let best = scores
            .iter()
            .filter(|s| s.eligible && s.perfect_matches == max_perfect)
            .min_by(|a, b| a.rmsep.total_cmp(&b.rmsep).then(a.class.cmp(&b.class)))
            .ok_or_else(|| LczError::MissingInput("eligible LCZ class".to_string()))?;

        let (class, rmsep, perfect_matches) = (best.class, best.rmsep, best.perfect_matches);
        let contributions = best.contributions.clone();
        let result = ClassificationResult {
            class,
            rmsep,
            perfect_matches,
            available_params: parameters.available_count(),
            contributions,
            scores,
            parameters: *parameters,
        };

        debug!(
            "Assigned LCZ {} (rmsep={:.4}, {}/{} perfect)",
            result.class, result.rmsep, result.perfect_matches, result.available_params
        );
        Ok(result)
    }

    /// Human-readable report of a result against this classifier's table
    pub fn summary<'r>(&'r self, result: &'r ClassificationResult) -> ClassificationSummary<'r> {
        ClassificationSummary::new(result, self.table)
    }
}
