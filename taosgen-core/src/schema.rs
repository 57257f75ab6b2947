//! Column/tag schema configuration, deserialized from the YAML configuration
//! surface (`spec.md` §6) and consumed by the row generators and the memory
//! pool alike.

use crate::cell::ColumnTypeTag;
use serde::{Deserialize, Serialize};

/// How a column's values are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Random,
    Order,
    Expression,
}

/// Generator parameters; which fields are meaningful depends on
/// `GeneratorKind`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorParams {
    /// Inclusive lower bound for `random`/`order`.
    #[serde(default)]
    pub min: Option<f64>,
    /// Exclusive upper bound for `random`/`order`.
    #[serde(default)]
    pub max: Option<f64>,
    /// Literal values to sample uniformly from (random generator).
    #[serde(default)]
    pub values: Option<Vec<String>>,
    /// Corpus of bytes/chars to sample from for string/binary types.
    #[serde(default)]
    pub corpus: Option<String>,
    /// Scripted formula text for the expression generator.
    #[serde(default)]
    pub formula: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: ColumnTypeTag,
    /// Declared length for var-length types (`nchar`, `varchar`, `binary`, …).
    #[serde(default)]
    pub length: Option<usize>,
    pub generator: GeneratorKind,
    #[serde(default)]
    pub params: GeneratorParams,
    /// Fraction of rows for which this column is null, in `[0, 1]`.
    #[serde(default)]
    pub null_ratio: f64,
    #[serde(default)]
    pub is_primary_key: bool,
}

impl ColumnConfig {
    /// Max byte/char width the column needs in its `TableBlock` arena.
    pub fn declared_length(&self) -> usize {
        self.length.unwrap_or(16)
    }
}

/// Precision for timestamps throughout the generator and formatters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPrecision {
    Ms,
    Us,
    Ns,
}

impl TimestampPrecision {
    pub fn to_millis(self, ts: i64) -> i64 {
        match self {
            TimestampPrecision::Ms => ts,
            TimestampPrecision::Us => ts / 1_000,
            TimestampPrecision::Ns => ts / 1_000_000,
        }
    }

    pub fn to_micros(self, ts: i64) -> i64 {
        match self {
            TimestampPrecision::Ms => ts * 1_000,
            TimestampPrecision::Us => ts,
            TimestampPrecision::Ns => ts / 1_000,
        }
    }
}

impl std::str::FromStr for TimestampPrecision {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ms" => Ok(TimestampPrecision::Ms),
            "us" => Ok(TimestampPrecision::Us),
            "ns" => Ok(TimestampPrecision::Ns),
            other => Err(format!("unknown timestamp precision '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampConfig {
    /// Either an integer epoch or a `"YYYY-MM-DD HH:MM:SS"` string; parsed by
    /// [`crate::generators::timestamp::parse_timestamp_literal`].
    pub start_timestamp: String,
    pub precision: TimestampPrecision,
    /// Either an integer count of `precision` units, or a string like
    /// `"1s"`/`"500ms"`.
    pub step: String,
}

/// A column schema plus tag schema plus timestamp configuration for one
/// super table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperTableSchema {
    pub name: String,
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub tags: Vec<ColumnConfig>,
    pub timestamp: TimestampConfig,
}

impl SuperTableSchema {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_conversion_is_total() {
        assert_eq!(TimestampPrecision::Ms.to_micros(5), 5_000);
        assert_eq!(TimestampPrecision::Us.to_micros(5), 5);
        assert_eq!(TimestampPrecision::Ns.to_micros(5_000), 5);
    }

    #[test]
    fn deserializes_minimal_schema() {
        let yaml = r#"
name: readings
columns:
  - name: temp
    type: float
    generator: random
    params:
      min: 0
      max: 100
tags:
  - name: region
    type: varchar
    length: 10
    generator: random
    params:
      values: ["us-west", "us-east"]
timestamp:
  start_timestamp: "1620000000000"
  precision: ms
  step: "1000"
"#;
        let schema: SuperTableSchema = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(schema.name, "readings");
        assert_eq!(schema.column_count(), 1);
        assert_eq!(schema.tag_count(), 1);
    }
}
