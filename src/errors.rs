//! Error types for the merge/validate/build core.
//!
//! Build failures come in two flavours that callers must be able to tell
//! apart: the raw bundle had the wrong shape ([`StructuralError`]), or one of
//! its values could not be matched against the vocabulary
//! ([`ValidationError`]). Both are wrapped by [`RelicError`].

use thiserror::Error;

fn describe_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        "no suggestions".to_string()
    } else {
        format!("did you mean: {}", suggestions.join(", "))
    }
}

fn describe_hint(hint: &Option<String>) -> String {
    hint.as_ref().map(|h| format!(" ({})", h)).unwrap_or_default()
}

/// A field value with no acceptable vocabulary match, or a set/name pair
/// that cannot be resolved.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "field '{field}' value '{value}' is not in the allowed list; {}{}",
    describe_suggestions(.suggestions),
    describe_hint(.hint)
)]
pub struct ValidationError {
    /// Field path, e.g. `location` or `item_detail.sub.name`
    pub field: String,
    /// The raw value as recognized
    pub value: String,
    /// The full vocabulary the value was checked against
    pub candidates: Vec<String>,
    /// Up to three ranked near matches, best first
    pub suggestions: Vec<String>,
    /// Extra context for set inference failures
    pub hint: Option<String>,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        value: impl Into<String>,
        candidates: Vec<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            candidates,
            suggestions,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// The caller handed over a bundle with the wrong shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralError {
    #[error("item_detail.main must contain exactly one stat, got {0}")]
    MainStatArity(usize),

    #[error("item_detail.main must be a list of [name, value] pairs or a mapping")]
    MainStatShape,

    #[error("item_detail.sub must be a list of [name, value] pairs or a mapping")]
    SubStatsShape,

    #[error("field '{0}' must be an object")]
    NotAnObject(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("field '{0}' must be a string")]
    NotAString(String),

    #[error("stat value for '{0}' must be a string or a number")]
    StatValue(String),
}

/// Outcome of a failed relic build.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelicError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Structural(#[from] StructuralError),
}

pub type RelicResult<T> = Result<T, RelicError>;

/// Errors raised while turning a screen (or a detection dump) into a relic.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("region '{0}' is not defined in the layout")]
    UnknownRegion(String),

    #[error("text recognition failed for region '{region}': {message}")]
    Recognition { region: String, message: String },

    #[error(transparent)]
    Relic(#[from] RelicError),
}

pub type ScanResult<T> = Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_message_lists_suggestions() {
        let err = ValidationError::new(
            "location",
            "脚",
            vec!["脚部".into(), "头部".into()],
            vec!["脚部".into()],
        );
        assert_eq!(
            err.to_string(),
            "field 'location' value '脚' is not in the allowed list; did you mean: 脚部"
        );
    }

    #[test]
    fn test_validation_error_message_without_suggestions() {
        let err = ValidationError::new("name", "zzz", vec![], vec![])
            .with_hint("name not recognized under any set");
        assert_eq!(
            err.to_string(),
            "field 'name' value 'zzz' is not in the allowed list; no suggestions (name not recognized under any set)"
        );
    }

    #[test]
    fn test_relic_error_kinds_are_distinguishable() {
        let err: RelicError = StructuralError::MainStatArity(2).into();
        assert!(matches!(err, RelicError::Structural(StructuralError::MainStatArity(2))));

        let err: RelicError = ValidationError::new("set", "x", vec![], vec![]).into();
        assert!(matches!(err, RelicError::Validation(_)));
    }
}
