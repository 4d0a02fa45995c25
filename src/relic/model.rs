use serde::Serialize;
use serde_json::Value;

use super::validator::Correction;
use crate::errors::StructuralError;

/// Sub stats as handed over by a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubStatsInput {
    /// Rows in screen order; a repeated stat name is kept under `name#2`, `name#3`...
    OrderedPairs(Vec<(String, String)>),
    /// Keyed entries in the order they were written; a stat that resolves to
    /// an earlier key replaces that value in place
    NamedMap(Vec<(String, String)>),
}

impl Default for SubStatsInput {
    fn default() -> Self {
        SubStatsInput::OrderedPairs(Vec::new())
    }
}

impl SubStatsInput {
    pub fn len(&self) -> usize {
        match self {
            SubStatsInput::OrderedPairs(pairs) => pairs.len(),
            SubStatsInput::NamedMap(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unvalidated relic fields, straight from recognition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRelic {
    pub name: String,
    pub location: String,
    pub level: String,
    /// Must hold exactly one pair to build
    pub main: Vec<(String, String)>,
    pub sub: SubStatsInput,
    /// Inferred from the name when absent
    pub from_set: Option<String>,
}

fn string_field(obj: &serde_json::Map<String, Value>, key: &str) -> Result<String, StructuralError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) if key == "level" => Ok(n.to_string()),
        Some(_) => Err(StructuralError::NotAString(key.to_string())),
        None => Err(StructuralError::MissingField(key.to_string())),
    }
}

fn stat_value(name: &str, value: &Value) -> Result<String, StructuralError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(StructuralError::StatValue(name.to_string())),
    }
}

fn stat_pairs(value: &Value, field: &str) -> Result<Vec<(String, String)>, StructuralError> {
    let shape_error = || {
        if field == "sub" {
            StructuralError::SubStatsShape
        } else {
            StructuralError::MainStatShape
        }
    };

    match value {
        Value::Object(map) => map
            .iter()
            .map(|(name, v)| Ok((name.clone(), stat_value(name, v)?)))
            .collect(),
        Value::Array(rows) => rows
            .iter()
            .map(|row| match row.as_array().map(Vec::as_slice) {
                Some([Value::String(name), v]) => Ok((name.clone(), stat_value(name, v)?)),
                _ => Err(shape_error()),
            })
            .collect(),
        _ => Err(shape_error()),
    }
}

impl RawRelic {
    /// Reads a raw bundle from its JSON form.
    ///
    /// `item_detail.main` and `item_detail.sub` may be objects or lists of
    /// `[name, value]` pairs. A list of sub stats keeps its order and
    /// duplicates; an object is taken as a keyed mapping.
    pub fn from_json(value: &Value) -> Result<Self, StructuralError> {
        let obj = value
            .as_object()
            .ok_or_else(|| StructuralError::NotAnObject("relic".to_string()))?;

        let from_set = match obj.get("from_set") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(StructuralError::NotAString("from_set".to_string())),
        };

        let detail = match obj.get("item_detail") {
            Some(Value::Object(detail)) => detail,
            Some(_) => return Err(StructuralError::NotAnObject("item_detail".to_string())),
            None => return Err(StructuralError::MissingField("item_detail".to_string())),
        };

        let main = match detail.get("main") {
            Some(main) => stat_pairs(main, "main")?,
            None => Vec::new(),
        };

        let sub = match detail.get("sub") {
            None | Some(Value::Null) => SubStatsInput::default(),
            Some(list @ Value::Array(_)) => SubStatsInput::OrderedPairs(stat_pairs(list, "sub")?),
            Some(map @ Value::Object(_)) => SubStatsInput::NamedMap(stat_pairs(map, "sub")?),
            Some(_) => return Err(StructuralError::SubStatsShape),
        };

        Ok(Self {
            name: string_field(obj, "name")?,
            location: string_field(obj, "location")?,
            level: string_field(obj, "level")?,
            main,
            sub,
            from_set,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stat {
    pub name: String,
    pub value: String,
}

/// A fully validated relic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relic {
    pub name: String,
    pub location: String,
    pub level: String,
    pub main_stat: Stat,
    /// Keyed sub stats in insertion order
    pub sub_stats: Vec<(String, String)>,
    /// Main stat plus sub stats
    pub item_number: usize,
    pub from_set: String,
}

impl Relic {
    pub fn sub_stat(&self, key: &str) -> Option<&str> {
        self.sub_stats
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Display for Relic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<Relic {} ({}) Lv.{} #{}>",
            self.name, self.location, self.level, self.item_number
        )
    }
}

/// A built relic plus the corrections applied on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltRelic {
    pub relic: Relic,
    pub corrections: Vec<Correction>,
}
