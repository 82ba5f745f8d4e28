//! Local Climate Zone reference table and RMSEP classification

pub mod classifier;
pub mod parameters;
pub mod reference;
pub mod summary;

pub use classifier::{ClassScore, ClassificationResult, RmsepClassifier, FRACTION_SUM_TOLERANCE};
pub use parameters::{MorphologyParameter, MorphologyParameterSet, ParameterFields};
pub use reference::{LczClass, LczClassDefinition, LczReferenceTable, ParameterRange};
pub use summary::ClassificationSummary;
