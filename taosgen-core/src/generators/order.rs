//! The monotonic order generator: a wrapping counter over `[min, max)`.

use super::ColumnGenerator;
use crate::cell::{ColumnType, ColumnTypeTag};
use crate::error::GeneratorError;
use crate::schema::ColumnConfig;

pub struct OrderGenerator {
    tag: ColumnTypeTag,
    min: i64,
    max: i64,
    current: i64,
}

impl OrderGenerator {
    pub fn new(config: &ColumnConfig) -> Result<Self, GeneratorError> {
        if !is_integer_tag(config.type_tag) {
            return Err(GeneratorError::NonIntegerOrderTarget(config.type_tag));
        }
        let min = config.params.min.unwrap_or(0.0) as i64;
        let max = config.params.max.unwrap_or(i64::MAX as f64) as i64;
        Ok(Self {
            tag: config.type_tag,
            min,
            max,
            current: min,
        })
    }

    fn next_value(&mut self) -> i64 {
        let v = self.current;
        self.current += 1;
        if self.current >= self.max {
            self.current = self.min;
        }
        v
    }

    fn to_cell(&self, v: i64) -> ColumnType {
        match self.tag {
            ColumnTypeTag::TinyInt => ColumnType::TinyInt(v as i8),
            ColumnTypeTag::SmallInt => ColumnType::SmallInt(v as i16),
            ColumnTypeTag::Int => ColumnType::Int(v as i32),
            ColumnTypeTag::BigInt => ColumnType::BigInt(v),
            ColumnTypeTag::UTinyInt => ColumnType::UTinyInt(v as u8),
            ColumnTypeTag::USmallInt => ColumnType::USmallInt(v as u16),
            ColumnTypeTag::UInt => ColumnType::UInt(v as u32),
            ColumnTypeTag::UBigInt => ColumnType::UBigInt(v as u64),
            _ => unreachable!("validated as integer at construction"),
        }
    }
}

fn is_integer_tag(tag: ColumnTypeTag) -> bool {
    matches!(
        tag,
        ColumnTypeTag::TinyInt
            | ColumnTypeTag::SmallInt
            | ColumnTypeTag::Int
            | ColumnTypeTag::BigInt
            | ColumnTypeTag::UTinyInt
            | ColumnTypeTag::USmallInt
            | ColumnTypeTag::UInt
            | ColumnTypeTag::UBigInt
    )
}

impl ColumnGenerator for OrderGenerator {
    fn generate_one(&mut self) -> Result<ColumnType, GeneratorError> {
        let v = self.next_value();
        Ok(self.to_cell(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GeneratorKind, GeneratorParams};

    fn config(min: f64, max: f64) -> ColumnConfig {
        ColumnConfig {
            name: "o".into(),
            type_tag: ColumnTypeTag::Int,
            length: None,
            generator: GeneratorKind::Order,
            params: GeneratorParams {
                min: Some(min),
                max: Some(max),
                ..Default::default()
            },
            null_ratio: 0.0,
            is_primary_key: false,
        }
    }

    #[test]
    fn cycles_with_period_b_minus_a() {
        let mut gen = OrderGenerator::new(&config(5.0, 8.0)).unwrap();
        let values: Vec<i32> = (0..9)
            .map(|_| match gen.generate_one().unwrap() {
                ColumnType::Int(v) => v,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(values, vec![5, 6, 7, 5, 6, 7, 5, 6, 7]);
    }

    #[test]
    fn values_stay_within_range() {
        let mut gen = OrderGenerator::new(&config(0.0, 3.0)).unwrap();
        for _ in 0..100 {
            match gen.generate_one().unwrap() {
                ColumnType::Int(v) => assert!((0..3).contains(&v)),
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn rejects_non_integer_target() {
        let mut cfg = config(0.0, 1.0);
        cfg.type_tag = ColumnTypeTag::Varchar;
        assert!(OrderGenerator::new(&cfg).is_err());
    }
}
