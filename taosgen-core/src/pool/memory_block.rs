//! `MemoryBlock`: a pool-owned collection of `TableBlock`s plus the
//! aggregate fields and bind descriptors described in `spec.md` §3.

use super::bind::BindDescriptor;
use super::table_block::TableBlock;
use crate::schema::ColumnConfig;

#[derive(Debug)]
pub struct MemoryBlock {
    pub tables: Vec<TableBlock>,
    pub start_time: i64,
    pub end_time: i64,
    pub total_rows: usize,
    pub used_tables: usize,
    pub bindings: Vec<BindDescriptor>,
    pub in_use: bool,
    /// Index of this block inside the owning pool's `blocks` vector; used by
    /// `release_block` instead of a raw back-pointer (see DESIGN.md for why
    /// this replaces the C++ `owning_pool` pointer).
    pub slot: usize,
}

impl MemoryBlock {
    pub fn new(slot: usize, max_tables: usize, max_rows_per_table: usize, columns_cfg: &[ColumnConfig]) -> Self {
        let tags: Vec<_> = columns_cfg.iter().map(|c| c.type_tag).collect();
        let tables = (0..max_tables)
            .map(|_| TableBlock::new(max_rows_per_table, columns_cfg))
            .collect();
        let bindings = (0..max_tables)
            .map(|_| BindDescriptor::zero_width(String::new(), &tags))
            .collect();
        Self {
            tables,
            start_time: i64::MAX,
            end_time: i64::MIN,
            total_rows: 0,
            used_tables: 0,
            bindings,
            in_use: false,
            slot,
        }
    }

    /// Reset every invariant-bearing field to the state a fresh acquire
    /// should observe.
    pub fn reset(&mut self) {
        self.start_time = i64::MAX;
        self.end_time = i64::MIN;
        self.total_rows = 0;
        self.used_tables = 0;
        self.in_use = false;
        for t in &mut self.tables {
            t.reset();
        }
        for b in &mut self.bindings {
            b.reset();
        }
    }

    pub fn active_tables(&self) -> &[TableBlock] {
        &self.tables[..self.used_tables]
    }

    /// Recompute bind descriptors' row counts and table names from the
    /// currently populated `TableBlock`s. Called once per format, mirroring
    /// `MemoryBlock::build_bindv` in the original.
    pub fn build_bindings(&mut self) {
        for (i, table) in self.tables[..self.used_tables].iter().enumerate() {
            let b = &mut self.bindings[i];
            b.table_name = table.table_name.clone();
            b.row_count = table.used_rows;
            for col in &mut b.columns {
                col.row_count = table.used_rows;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{ColumnType, ColumnTypeTag};
    use crate::row::Row;
    use crate::schema::{GeneratorKind, GeneratorParams};

    fn schema() -> Vec<ColumnConfig> {
        vec![
            ColumnConfig {
                name: "f".into(),
                type_tag: ColumnTypeTag::Float,
                length: None,
                generator: GeneratorKind::Random,
                params: GeneratorParams::default(),
                null_ratio: 0.0,
                is_primary_key: false,
            },
            ColumnConfig {
                name: "i".into(),
                type_tag: ColumnTypeTag::Int,
                length: None,
                generator: GeneratorKind::Random,
                params: GeneratorParams::default(),
                null_ratio: 0.0,
                is_primary_key: false,
            },
        ]
    }

    #[test]
    fn reset_then_reuse_is_clean() {
        let cfgs = schema();
        let mut block = MemoryBlock::new(0, 1, 2, &cfgs);
        block.used_tables = 1;
        block.tables[0].table_name = "t1".to_string();
        block.tables[0].add_row(&Row::new(1, vec![ColumnType::Float(1.0), ColumnType::Int(1)]));
        block.total_rows = 1;
        block.start_time = 1;
        block.end_time = 1;
        block.reset();
        assert_eq!(block.total_rows, 0);
        assert_eq!(block.used_tables, 0);
        assert_eq!(block.start_time, i64::MAX);
        assert_eq!(block.end_time, i64::MIN);
        assert_eq!(block.tables[0].used_rows, 0);
    }
}
