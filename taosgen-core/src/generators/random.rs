//! The random column generator.

use super::ColumnGenerator;
use crate::cell::{ColumnType, ColumnTypeTag};
use crate::error::GeneratorError;
use crate::schema::ColumnConfig;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const DEFAULT_STRING_CORPUS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
/// CJK ideograph range sampled for `nchar` columns without an explicit
/// values list, per `spec.md` §4.2.
const CJK_RANGE: std::ops::RangeInclusive<u32> = 0x4E00..=0x9FA5;

pub struct RandomGenerator {
    tag: ColumnTypeTag,
    length: usize,
    min: f64,
    max: f64,
    /// Pre-converted literal values, sampled uniformly when present.
    literal_values: Option<Vec<ColumnType>>,
    corpus: Vec<u8>,
    rng: SmallRng,
}

impl RandomGenerator {
    pub fn new(config: &ColumnConfig) -> Self {
        let literal_values = config.params.values.as_ref().map(|values| {
            values
                .iter()
                .map(|v| convert_literal(config.type_tag, v))
                .collect()
        });
        let corpus = config
            .params
            .corpus
            .as_ref()
            .map(|c| c.as_bytes().to_vec())
            .unwrap_or_else(|| DEFAULT_STRING_CORPUS.to_vec());
        Self {
            tag: config.type_tag,
            length: config.declared_length(),
            min: config.params.min.unwrap_or(0.0),
            max: config.params.max.unwrap_or(100.0),
            literal_values,
            corpus,
            rng: SmallRng::from_entropy(),
        }
    }
}

impl ColumnGenerator for RandomGenerator {
    fn generate_one(&mut self) -> Result<ColumnType, GeneratorError> {
        if let Some(values) = &self.literal_values {
            let idx = self.rng.gen_range(0..values.len());
            return Ok(values[idx].clone());
        }
        Ok(match self.tag {
            ColumnTypeTag::Bool => ColumnType::Bool(self.rng.gen_bool(0.5)),
            ColumnTypeTag::TinyInt => ColumnType::TinyInt(self.rng.gen_range(self.min as i64..self.max as i64) as i8),
            ColumnTypeTag::SmallInt => {
                ColumnType::SmallInt(self.rng.gen_range(self.min as i64..self.max as i64) as i16)
            }
            ColumnTypeTag::Int => ColumnType::Int(self.rng.gen_range(self.min as i64..self.max as i64) as i32),
            ColumnTypeTag::BigInt => ColumnType::BigInt(self.rng.gen_range(self.min as i64..self.max as i64)),
            ColumnTypeTag::UTinyInt => {
                ColumnType::UTinyInt(self.rng.gen_range(self.min as u64..self.max as u64) as u8)
            }
            ColumnTypeTag::USmallInt => {
                ColumnType::USmallInt(self.rng.gen_range(self.min as u64..self.max as u64) as u16)
            }
            ColumnTypeTag::UInt => ColumnType::UInt(self.rng.gen_range(self.min as u64..self.max as u64) as u32),
            ColumnTypeTag::UBigInt => ColumnType::UBigInt(self.rng.gen_range(self.min as u64..self.max as u64)),
            ColumnTypeTag::Float => ColumnType::Float(self.rng.gen_range(self.min as f32..self.max as f32)),
            ColumnTypeTag::Double => ColumnType::Double(self.rng.gen_range(self.min..self.max)),
            ColumnTypeTag::Decimal => ColumnType::Decimal(format!("{:.4}", self.rng.gen_range(self.min..self.max))),
            ColumnTypeTag::NChar => {
                let units: Vec<u16> = (0..self.length)
                    .map(|_| self.rng.gen_range(CJK_RANGE) as u16)
                    .collect();
                ColumnType::NChar(units)
            }
            ColumnTypeTag::Varchar | ColumnTypeTag::Binary | ColumnTypeTag::VarBinary => {
                let bytes: Vec<u8> = (0..self.length)
                    .map(|_| self.corpus[self.rng.gen_range(0..self.corpus.len())])
                    .collect();
                match self.tag {
                    ColumnTypeTag::Varchar => ColumnType::Varchar(String::from_utf8_lossy(&bytes).into_owned()),
                    ColumnTypeTag::Binary => ColumnType::Binary(bytes),
                    _ => ColumnType::VarBinary(bytes),
                }
            }
            ColumnTypeTag::Json => ColumnType::Json("{}".to_string()),
            ColumnTypeTag::Geometry => {
                let x: f64 = self.rng.gen_range(-180.0..180.0);
                let y: f64 = self.rng.gen_range(-90.0..90.0);
                ColumnType::Geometry(format!("POINT({x:.6} {y:.6})"))
            }
        })
    }
}

fn convert_literal(tag: ColumnTypeTag, literal: &str) -> ColumnType {
    match tag {
        ColumnTypeTag::Bool => ColumnType::Bool(literal.parse().unwrap_or(false)),
        ColumnTypeTag::TinyInt => ColumnType::TinyInt(literal.parse().unwrap_or(0)),
        ColumnTypeTag::SmallInt => ColumnType::SmallInt(literal.parse().unwrap_or(0)),
        ColumnTypeTag::Int => ColumnType::Int(literal.parse().unwrap_or(0)),
        ColumnTypeTag::BigInt => ColumnType::BigInt(literal.parse().unwrap_or(0)),
        ColumnTypeTag::UTinyInt => ColumnType::UTinyInt(literal.parse().unwrap_or(0)),
        ColumnTypeTag::USmallInt => ColumnType::USmallInt(literal.parse().unwrap_or(0)),
        ColumnTypeTag::UInt => ColumnType::UInt(literal.parse().unwrap_or(0)),
        ColumnTypeTag::UBigInt => ColumnType::UBigInt(literal.parse().unwrap_or(0)),
        ColumnTypeTag::Float => ColumnType::Float(literal.parse().unwrap_or(0.0)),
        ColumnTypeTag::Double => ColumnType::Double(literal.parse().unwrap_or(0.0)),
        ColumnTypeTag::Decimal => ColumnType::Decimal(literal.to_string()),
        ColumnTypeTag::NChar => ColumnType::NChar(literal.encode_utf16().collect()),
        ColumnTypeTag::Varchar => ColumnType::Varchar(literal.to_string()),
        ColumnTypeTag::Binary => ColumnType::Binary(literal.as_bytes().to_vec()),
        ColumnTypeTag::Json => ColumnType::Json(literal.to_string()),
        ColumnTypeTag::VarBinary => ColumnType::VarBinary(literal.as_bytes().to_vec()),
        ColumnTypeTag::Geometry => ColumnType::Geometry(literal.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GeneratorKind, GeneratorParams};

    fn config_with_values(tag: ColumnTypeTag, values: Vec<&str>) -> ColumnConfig {
        ColumnConfig {
            name: "c".into(),
            type_tag: tag,
            length: None,
            generator: GeneratorKind::Random,
            params: GeneratorParams {
                values: Some(values.into_iter().map(String::from).collect()),
                ..Default::default()
            },
            null_ratio: 0.0,
            is_primary_key: false,
        }
    }

    #[test]
    fn samples_only_from_literal_values() {
        let cfg = config_with_values(ColumnTypeTag::Varchar, vec!["a", "b"]);
        let mut gen = RandomGenerator::new(&cfg);
        for _ in 0..20 {
            let v = gen.generate_one().unwrap();
            match v {
                ColumnType::Varchar(s) => assert!(s == "a" || s == "b"),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn numeric_range_is_respected() {
        let cfg = ColumnConfig {
            name: "n".into(),
            type_tag: ColumnTypeTag::Int,
            length: None,
            generator: GeneratorKind::Random,
            params: GeneratorParams {
                min: Some(10.0),
                max: Some(20.0),
                ..Default::default()
            },
            null_ratio: 0.0,
            is_primary_key: false,
        };
        let mut gen = RandomGenerator::new(&cfg);
        for _ in 0..50 {
            if let ColumnType::Int(v) = gen.generate_one().unwrap() {
                assert!((10..20).contains(&v));
            } else {
                panic!("expected int");
            }
        }
    }
}
