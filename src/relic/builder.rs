//! Turns a raw field bundle into a validated [`Relic`].

use std::collections::HashMap;

use super::model::{BuiltRelic, RawRelic, Relic, Stat, SubStatsInput};
use super::validator::{Correction, FieldValidator, Thresholds};
use super::vocabulary::Vocabulary;
use crate::errors::{RelicResult, StructuralError, ValidationError};

pub const HINT_UNKNOWN_SET: &str = "name not recognized under any set";
pub const HINT_AMBIGUOUS_SET: &str = "ambiguous set - caller must disambiguate";

/// Validates every field of a relic against one vocabulary.
///
/// Holds no state besides the borrowed vocabulary, so one builder can be
/// shared across threads.
#[derive(Debug, Clone, Copy)]
pub struct RelicBuilder<'a> {
    vocab: &'a Vocabulary,
    validator: FieldValidator,
}

impl<'a> RelicBuilder<'a> {
    pub fn new(vocab: &'a Vocabulary) -> Self {
        Self::with_thresholds(vocab, Thresholds::default())
    }

    pub fn with_thresholds(vocab: &'a Vocabulary, thresholds: Thresholds) -> Self {
        Self {
            vocab,
            validator: FieldValidator::new(thresholds),
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        self.vocab
    }

    pub fn validator(&self) -> &FieldValidator {
        &self.validator
    }

    fn validate(
        &self,
        field: &str,
        value: &str,
        candidates: &[String],
        corrections: &mut Vec<Correction>,
    ) -> Result<String, ValidationError> {
        let validated = self.validator.validate(field, value, candidates)?;
        corrections.extend(validated.correction);
        Ok(validated.value)
    }

    /// Resolves `(set, name)`, inferring the set from the name when none was read.
    fn resolve_set_and_name(
        &self,
        raw: &RawRelic,
        corrections: &mut Vec<Correction>,
    ) -> Result<(String, String), ValidationError> {
        if let Some(set) = raw.from_set.as_deref().filter(|s| !s.is_empty()) {
            let set = self.validate("from_set", set, &self.vocab.valid_sets, corrections)?;
            let name = self.validate("name", &raw.name, self.vocab.names_in_set(&set), corrections)?;
            return Ok((set, name));
        }

        let all_names = self.vocab.all_names();
        let name = self.validate("name", &raw.name, &all_names, corrections)?;
        let set = self.owning_set(&raw.name, &name, &all_names)?;
        Ok((set, name))
    }

    /// The single set listing `name`.
    fn owning_set(&self, raw_name: &str, name: &str, all_names: &[String]) -> Result<String, ValidationError> {
        let owners = self.vocab.sets_containing(name);
        let hint = match owners.as_slice() {
            [set] => {
                tracing::debug!(name, set, "set inferred from name");
                return Ok(set.to_string());
            }
            // Only reachable when the name came from outside `set_to_names`.
            [] => HINT_UNKNOWN_SET,
            _ => HINT_AMBIGUOUS_SET,
        };
        let suggestions = self.validator.suggest_similar(raw_name, all_names);
        Err(ValidationError::new("name", raw_name, all_names.to_vec(), suggestions).with_hint(hint))
    }

    /// Picks the percentage variant of a stat name when the value reads as a percentage.
    pub fn normalize_stat_name(&self, name: &str, value: &str) -> String {
        if value.contains('%') {
            let percent_name = format!("{}{}", name, self.vocab.percent_suffix);
            if self.vocab.valid_items.contains(&percent_name) {
                return percent_name;
            }
        }
        name.to_string()
    }

    fn validate_stat(
        &self,
        field: &str,
        name: &str,
        value: &str,
        corrections: &mut Vec<Correction>,
    ) -> Result<String, ValidationError> {
        let normalized = self.normalize_stat_name(name, value);
        self.validate(field, &normalized, &self.vocab.valid_items, corrections)
    }

    fn build_sub_stats(
        &self,
        sub: &SubStatsInput,
        corrections: &mut Vec<Correction>,
    ) -> Result<Vec<(String, String)>, ValidationError> {
        let mut stats: Vec<(String, String)> = Vec::with_capacity(sub.len());

        match sub {
            SubStatsInput::OrderedPairs(pairs) => {
                let mut seen: HashMap<String, usize> = HashMap::new();
                for (name, value) in pairs {
                    let valid = self.validate_stat("item_detail.sub.name", name, value, corrections)?;
                    let count = seen.entry(valid.clone()).or_insert(0);
                    *count += 1;
                    let key = if *count == 1 {
                        valid
                    } else {
                        format!("{}#{}", valid, count)
                    };
                    stats.push((key, value.clone()));
                }
            }
            SubStatsInput::NamedMap(map) => {
                for (name, value) in map {
                    let valid = self.validate_stat("item_detail.sub.name", name, value, corrections)?;
                    match stats.iter_mut().find(|(key, _)| *key == valid) {
                        Some(existing) => existing.1 = value.clone(),
                        None => stats.push((valid, value.clone())),
                    }
                }
            }
        }

        Ok(stats)
    }

    /// Validates all fields of `raw`.
    ///
    /// Either every field resolves and the relic is returned with the
    /// corrections that were applied, or the first failure is returned.
    pub fn build(&self, raw: &RawRelic) -> RelicResult<BuiltRelic> {
        let mut corrections = Vec::new();

        let (from_set, name) = self.resolve_set_and_name(raw, &mut corrections)?;
        let location = self.validate("location", &raw.location, &self.vocab.valid_locations, &mut corrections)?;

        let [(main_name, main_value)] = raw.main.as_slice() else {
            return Err(StructuralError::MainStatArity(raw.main.len()).into());
        };
        let main_name = self.validate_stat("item_detail.main.name", main_name, main_value, &mut corrections)?;

        let sub_stats = self.build_sub_stats(&raw.sub, &mut corrections)?;

        let relic = Relic {
            name,
            location,
            level: raw.level.clone(),
            main_stat: Stat {
                name: main_name,
                value: main_value.clone(),
            },
            item_number: 1 + sub_stats.len(),
            sub_stats,
            from_set,
        };

        tracing::info!(relic = %relic, corrections = corrections.len(), "relic built");
        Ok(BuiltRelic { relic, corrections })
    }
}

/// Builds a relic with the default thresholds.
pub fn build_relic(raw: &RawRelic, vocab: &Vocabulary) -> RelicResult<BuiltRelic> {
    RelicBuilder::new(vocab).build(raw)
}
