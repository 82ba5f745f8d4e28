use std::fmt;

use super::classifier::ClassificationResult;
use super::parameters::MorphologyParameter;
use super::reference::LczReferenceTable;

/// Text report of a classification: the assigned class, then every class
/// tied on perfect matches (best RMSEP first) with its ranges next to the
/// supplied values. Disqualified classes are left out.
pub struct ClassificationSummary<'a> {
    result: &'a ClassificationResult,
    table: &'a LczReferenceTable,
}

impl<'a> ClassificationSummary<'a> {
    pub fn new(result: &'a ClassificationResult, table: &'a LczReferenceTable) -> Self {
        ClassificationSummary { result, table }
    }
}

impl fmt::Display for ClassificationSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;
        let total = MorphologyParameter::ALL.len();

        writeln!(
            f,
            "Assigned LCZ class: {} ({})",
            result.class,
            result.class.description()
        )?;
        writeln!(f, "RMSEP: {:.4}", result.rmsep)?;
        writeln!(
            f,
            "Parameters in range: {}/{}",
            result.perfect_matches, result.available_params
        )?;
        writeln!(f, "Available parameters: {}/{}", result.available_params, total)?;

        for score in result.tied_scores() {
            if score.is_disqualified() {
                continue;
            }
            writeln!(f)?;
            writeln!(
                f,
                "LCZ {}: RMSEP={:.4}, perfect matches={}/{}",
                score.class, score.rmsep, score.perfect_matches, result.available_params
            )?;
            let definition = self.table.get(score.class);
            for (&parameter, &error) in &score.contributions {
                if error == 0.0 {
                    writeln!(f, "  {}: perfect match", parameter)?;
                    continue;
                }
                let value = result
                    .parameters
                    .get(parameter)
                    .map_or_else(|| "-".to_string(), |v| v.to_string());
                writeln!(
                    f,
                    "  {}: {} ---> value: {}",
                    parameter,
                    definition.range(parameter),
                    value
                )?;
            }
        }
        Ok(())
    }
}
