//! Plain export of validated relics and JSON result files.

use anyhow::{Context, Result};
use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

use super::model::Relic;

static NUMERIC_CORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d.]+").expect("static numeric regex must compile"));

/// First run of digits and dots in `value`, or an empty string.
///
/// Signs, `%` and `+` prefixes are dropped: `"-12.5%"` becomes `"12.5"`.
pub fn numeric_core(value: &str) -> String {
    NUMERIC_CORE
        .find(value)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Ordered `name: value` pairs serialized as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatMap(pub Vec<(String, String)>);

impl Serialize for StatMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl StatMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDetail {
    pub main: StatMap,
    pub sub: StatMap,
}

/// Export shape of a relic, with every numeric field reduced to its digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedRelic {
    pub name: String,
    pub location: String,
    pub level: String,
    pub item_number: usize,
    pub item_detail: ItemDetail,
    pub from_set: String,
}

pub fn export(relic: &Relic) -> ExportedRelic {
    ExportedRelic {
        name: relic.name.clone(),
        location: relic.location.clone(),
        level: numeric_core(&relic.level),
        item_number: relic.item_number,
        item_detail: ItemDetail {
            main: StatMap(vec![(
                relic.main_stat.name.clone(),
                numeric_core(&relic.main_stat.value),
            )]),
            sub: StatMap(
                relic
                    .sub_stats
                    .iter()
                    .map(|(name, value)| (name.clone(), numeric_core(value)))
                    .collect(),
            ),
        },
        from_set: relic.from_set.clone(),
    }
}

/// Writes exported relics as a pretty-printed JSON array.
pub fn export_to_json(relics: &[ExportedRelic], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(relics).context("Failed to serialize relics to JSON")?;

    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON data")?;

    tracing::info!(path = %output_path.display(), count = relics.len(), "relics exported");
    Ok(())
}
