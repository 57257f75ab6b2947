//! `RowGenerator`: one timestamp generator plus N column generators.

use super::{AnyColumnGenerator, ColumnGenerator, ExpressionGenerator, OrderGenerator, RandomGenerator, TimestampGenerator};
use crate::cell::ColumnType;
use crate::error::GeneratorError;
use crate::row::Row;
use crate::schema::{ColumnConfig, GeneratorKind, SuperTableSchema};

pub struct RowGenerator {
    timestamp: TimestampGenerator,
    columns: Vec<AnyColumnGenerator>,
}

/// Builds the concrete generator for one column or tag config. Shared by
/// `RowGenerator::new` and callers that need to materialize tag values
/// outside of a row stream (`orchestrator::run_super_table`).
pub fn build_column_generator(config: &ColumnConfig) -> Result<AnyColumnGenerator, GeneratorError> {
    Ok(match config.generator {
        GeneratorKind::Random => AnyColumnGenerator::Random(RandomGenerator::new(config)),
        GeneratorKind::Order => AnyColumnGenerator::Order(OrderGenerator::new(config)?),
        GeneratorKind::Expression => AnyColumnGenerator::Expression(ExpressionGenerator::new(config)),
    })
}

impl RowGenerator {
    pub fn new(schema: &SuperTableSchema) -> Result<Self, GeneratorError> {
        let timestamp = TimestampGenerator::new(&schema.timestamp)?;
        let columns = schema
            .columns
            .iter()
            .map(build_column_generator)
            .collect::<Result<_, _>>()?;
        Ok(Self { timestamp, columns })
    }

    pub fn from_parts(timestamp: TimestampGenerator, columns: Vec<AnyColumnGenerator>) -> Self {
        Self { timestamp, columns }
    }

    pub fn generate_row(&mut self) -> Result<Row, GeneratorError> {
        let ts = self.timestamp.next();
        let mut cells = Vec::with_capacity(self.columns.len());
        for gen in &mut self.columns {
            cells.push(gen.generate_one()?);
        }
        Ok(Row::new(ts, cells))
    }

    /// Fill `n` rows column by column to maximize cache reuse, per
    /// `spec.md` §4.2.
    pub fn generate_batch(&mut self, n: usize) -> Result<Vec<Row>, GeneratorError> {
        let mut timestamps = Vec::with_capacity(n);
        for _ in 0..n {
            timestamps.push(self.timestamp.next());
        }
        let mut columns: Vec<Vec<ColumnType>> = Vec::with_capacity(self.columns.len());
        for gen in &mut self.columns {
            columns.push(gen.generate_many(n)?);
        }
        let mut rows = Vec::with_capacity(n);
        for i in 0..n {
            let cells = columns.iter().map(|c| c[i].clone()).collect();
            rows.push(Row::new(timestamps[i], cells));
        }
        Ok(rows)
    }

    pub fn reset_timestamp(&mut self) {
        self.timestamp.reset();
    }

    pub fn set_start_timestamp(&mut self, start: i64) {
        self.timestamp.set_start(start);
    }

    pub fn step(&self) -> i64 {
        self.timestamp.step()
    }

    pub fn start(&self) -> i64 {
        self.timestamp.start()
    }
}
