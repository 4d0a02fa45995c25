//! The closed vocabularies relic fields are validated against.
//!
//! Stored as `relic_config.json` next to the executable:
//!
//! ```json
//! {
//!   "Relic": {
//!     "valid_sets": ["..."],
//!     "set_to_names": { "set": ["item name", "..."] },
//!     "valid_locations": ["..."],
//!     "valid_items": ["..."]
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn default_percent_suffix() -> String {
    "百分比".to_string()
}

/// Allowed values for every relic field. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub valid_sets: Vec<String>,
    /// Set name to the item names belonging to it
    pub set_to_names: BTreeMap<String, Vec<String>>,
    pub valid_locations: Vec<String>,
    /// Stat names, main and sub alike
    pub valid_items: Vec<String>,
    /// Appended to a stat name when its value is a percentage
    #[serde(default = "default_percent_suffix")]
    pub percent_suffix: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            valid_sets: Vec::new(),
            set_to_names: BTreeMap::new(),
            valid_locations: Vec::new(),
            valid_items: Vec::new(),
            percent_suffix: default_percent_suffix(),
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
struct VocabularyFile {
    #[serde(rename = "Relic", default)]
    relic: Vocabulary,
}

impl Vocabulary {
    pub fn load_from_json(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read vocabulary: {}", path.display()))?;
        let file: VocabularyFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse vocabulary: {}", path.display()))?;

        let vocab = file.relic;
        tracing::info!(
            path = %path.display(),
            sets = vocab.valid_sets.len(),
            locations = vocab.valid_locations.len(),
            items = vocab.valid_items.len(),
            "vocabulary loaded"
        );
        vocab.check();
        Ok(vocab)
    }

    pub fn save_to_json(&self, path: &Path) -> Result<()> {
        let file = VocabularyFile { relic: self.clone() };
        let json = serde_json::to_string_pretty(&file).context("Failed to serialize vocabulary")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write vocabulary: {}", path.display()))?;
        Ok(())
    }

    /// Item names of one set; empty for an unknown set.
    pub fn names_in_set(&self, set: &str) -> &[String] {
        self.set_to_names.get(set).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Item names across all sets, first occurrence kept.
    pub fn all_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.set_to_names.values().flatten() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Sets listing `name` as a member.
    pub fn sets_containing(&self, name: &str) -> Vec<&str> {
        self.set_to_names
            .iter()
            .filter(|(_, names)| names.iter().any(|n| n == name))
            .map(|(set, _)| set.as_str())
            .collect()
    }

    /// Reports inconsistencies that make set inference unreliable.
    ///
    /// Issues are logged and returned, never fatal.
    pub fn check(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for set in self.set_to_names.keys() {
            if !self.valid_sets.contains(set) {
                issues.push(format!("set '{}' has members but is not in valid_sets", set));
            }
        }

        for name in self.all_names() {
            let sets = self.sets_containing(&name);
            if sets.len() > 1 {
                issues.push(format!("name '{}' is listed under several sets: {}", name, sets.join(", ")));
            }
        }

        for issue in &issues {
            tracing::warn!("vocabulary: {}", issue);
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Vocabulary {
        let mut set_to_names = BTreeMap::new();
        set_to_names.insert("A".to_string(), vec!["x".to_string()]);
        set_to_names.insert("B".to_string(), vec!["x".to_string(), "y".to_string()]);
        Vocabulary {
            valid_sets: vec!["A".into(), "B".into()],
            set_to_names,
            valid_locations: vec!["头部".into()],
            valid_items: vec!["攻击力".into(), "攻击力百分比".into()],
            ..Vocabulary::default()
        }
    }

    #[test]
    fn test_all_names_dedups() {
        assert_eq!(sample().all_names(), vec!["x", "y"]);
    }

    #[test]
    fn test_sets_containing() {
        let vocab = sample();
        assert_eq!(vocab.sets_containing("x"), vec!["A", "B"]);
        assert_eq!(vocab.sets_containing("y"), vec!["B"]);
        assert!(vocab.sets_containing("z").is_empty());
    }

    #[test]
    fn test_names_in_unknown_set() {
        assert!(sample().names_in_set("C").is_empty());
        assert_eq!(sample().names_in_set("B").len(), 2);
    }

    #[test]
    fn test_check_reports_issues() {
        let mut vocab = sample();
        vocab.set_to_names.insert("C".into(), vec!["z".into()]);

        let issues = vocab.check();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.contains("'C'")));
        assert!(issues.iter().any(|i| i.contains("'x'")));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relic_config.json");

        let vocab = sample();
        vocab.save_to_json(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"Relic\""));
        assert!(content.contains("攻击力百分比"));

        let loaded = Vocabulary::load_from_json(&path).unwrap();
        assert_eq!(loaded, vocab);
    }

    #[test]
    fn test_load_fills_missing_lists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relic_config.json");
        fs::write(&path, r#"{"Relic": {"valid_locations": ["脚部"]}}"#).unwrap();

        let loaded = Vocabulary::load_from_json(&path).unwrap();
        assert_eq!(loaded.valid_locations, vec!["脚部"]);
        assert!(loaded.valid_sets.is_empty());
        assert_eq!(loaded.percent_suffix, "百分比");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(Vocabulary::load_from_json(&dir.path().join("nope.json")).is_err());
    }
}
