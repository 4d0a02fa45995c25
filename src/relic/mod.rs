//! Relic records: vocabulary, field validation, building and export.

pub mod builder;
pub mod export;
pub mod model;
pub mod similarity;
pub mod validator;
pub mod vocabulary;

pub use builder::{RelicBuilder, build_relic};
pub use export::{ExportedRelic, export, export_to_json, numeric_core};
pub use model::{BuiltRelic, RawRelic, Relic, Stat, SubStatsInput};
pub use validator::{Correction, CorrectionKind, FieldValidator, Thresholds, Validated, validate_field};
pub use vocabulary::Vocabulary;
