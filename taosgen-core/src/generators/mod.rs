//! Per-column value generation: random, monotonic-order and scripted
//! expression generators, plus the timestamp generator and the composite
//! `RowGenerator` that ties a column generator set to a timestamp stream.

pub mod expression;
pub mod order;
pub mod random;
pub mod row_generator;
pub mod timestamp;

pub use expression::ExpressionGenerator;
pub use order::OrderGenerator;
pub use random::RandomGenerator;
pub use row_generator::RowGenerator;
pub use timestamp::TimestampGenerator;

use crate::cell::ColumnType;
use crate::error::GeneratorError;

/// A single column's value generator.
pub trait ColumnGenerator: Send {
    fn generate_one(&mut self) -> Result<ColumnType, GeneratorError>;

    fn generate_many(&mut self, n: usize) -> Result<Vec<ColumnType>, GeneratorError> {
        (0..n).map(|_| self.generate_one()).collect()
    }
}

/// Dispatches to one of the three concrete generator kinds without virtual
/// call overhead on the hot path (design note §9: fixed sum type instead of
/// an inheritance hierarchy).
pub enum AnyColumnGenerator {
    Random(RandomGenerator),
    Order(OrderGenerator),
    Expression(ExpressionGenerator),
}

impl ColumnGenerator for AnyColumnGenerator {
    fn generate_one(&mut self) -> Result<ColumnType, GeneratorError> {
        match self {
            AnyColumnGenerator::Random(g) => g.generate_one(),
            AnyColumnGenerator::Order(g) => g.generate_one(),
            AnyColumnGenerator::Expression(g) => g.generate_one(),
        }
    }
}
