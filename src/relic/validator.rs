//! Fuzzy vocabulary validation for single fields.

use serde::{Deserialize, Serialize};

use super::similarity::close_matches;
use crate::errors::ValidationError;

/// Similarity cutoffs used when matching a raw value against a vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum similarity for a silent (or logged) auto-correction
    pub accept: f64,
    /// Minimum similarity for a candidate to be suggested
    pub suggest: f64,
    pub max_suggestions: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            accept: 0.8,
            suggest: 0.5,
            max_suggestions: 3,
        }
    }
}

/// How a corrected value was chosen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CorrectionKind {
    /// Scored at or above the acceptance threshold
    CloseMatch { similarity: f64 },
    /// Nothing was close enough; the first of these was taken
    Suggested { suggestions: Vec<String> },
}

/// A raw value that was replaced by a vocabulary entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correction {
    pub field: String,
    pub raw: String,
    pub corrected: String,
    pub kind: CorrectionKind,
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub value: String,
    pub correction: Option<Correction>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FieldValidator {
    thresholds: Thresholds,
}

impl FieldValidator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Up to `max_suggestions` candidates above the suggestion cutoff, best first.
    pub fn suggest_similar(&self, value: &str, candidates: &[String]) -> Vec<String> {
        close_matches(value, candidates, self.thresholds.max_suggestions, self.thresholds.suggest)
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Resolves `value` to an entry of `candidates`.
    ///
    /// A close match (at or above `accept`) is taken as is. Failing that the
    /// best suggestion is taken. With no suggestion at all the value is
    /// rejected.
    pub fn validate(
        &self,
        field: &str,
        value: &str,
        candidates: &[String],
    ) -> Result<Validated, ValidationError> {
        if let Some((best, score)) = close_matches(value, candidates, 1, self.thresholds.accept)
            .into_iter()
            .next()
        {
            let correction = (best != value).then(|| {
                tracing::warn!(field, raw = value, corrected = best, score, "value auto-corrected");
                Correction {
                    field: field.to_string(),
                    raw: value.to_string(),
                    corrected: best.to_string(),
                    kind: CorrectionKind::CloseMatch { similarity: score },
                }
            });
            return Ok(Validated {
                value: best.to_string(),
                correction,
            });
        }

        let suggestions = self.suggest_similar(value, candidates);
        let Some(first) = suggestions.first().cloned() else {
            return Err(ValidationError::new(field, value, candidates.to_vec(), Vec::new()));
        };

        tracing::warn!(
            field,
            raw = value,
            suggestions = %suggestions.join(", "),
            corrected = %first,
            "no close match, using best suggestion"
        );
        Ok(Validated {
            value: first.clone(),
            correction: Some(Correction {
                field: field.to_string(),
                raw: value.to_string(),
                corrected: first,
                kind: CorrectionKind::Suggested { suggestions },
            }),
        })
    }
}

/// Validates one field with the default thresholds.
pub fn validate_field(
    field: &str,
    value: &str,
    candidates: &[String],
) -> Result<Validated, ValidationError> {
    FieldValidator::default().validate(field, value, candidates)
}
