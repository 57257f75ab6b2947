//! The SQL text formatter (`spec.md` §4.5, scenario 2).

use taosgen_core::pool::MemoryBlock;

pub struct SqlFormatter {
    pub database: String,
}

impl SqlFormatter {
    pub fn new(database: impl Into<String>) -> Self {
        Self { database: database.into() }
    }

    /// Builds `INSERT INTO \`db\`.\`t1\` VALUES (...)(...) \`db\`.\`t2\` VALUES (...)…;`
    /// across every active table in the block. Returns an empty string for
    /// an empty block so writers can skip it (`spec.md` §8 boundary case).
    ///
    /// `is_recovery` marks the first batch formatted after a checkpoint
    /// resume: its leading row reproduces the last checkpointed timestamp
    /// (`spec.md` §4.10 scenario 5), so it is dropped here rather than
    /// written a second time.
    pub fn format(&self, block: &MemoryBlock, is_recovery: bool) -> String {
        if block.total_rows == 0 {
            return String::new();
        }
        let mut out = String::from("INSERT INTO ");
        let mut dropped_prefix_row = !is_recovery;
        let mut wrote_any_table = false;
        for table in block.active_tables() {
            let skip_first_row = !dropped_prefix_row && table.used_rows > 0;
            let first_row = if skip_first_row { 1 } else { 0 };
            dropped_prefix_row = dropped_prefix_row || table.used_rows > 0;
            if first_row >= table.used_rows {
                continue;
            }
            if wrote_any_table {
                out.push(' ');
            }
            wrote_any_table = true;
            out.push('`');
            out.push_str(&self.database);
            out.push_str("`.`");
            out.push_str(&table.table_name);
            out.push_str("` VALUES ");
            for row in first_row..table.used_rows {
                out.push('(');
                out.push_str(&table.timestamps[row].to_string());
                for col in 0..table.columns.len() {
                    out.push(',');
                    out.push_str(&table.cell_at(col, row).to_sql_literal());
                }
                out.push(')');
            }
        }
        if !wrote_any_table {
            return String::new();
        }
        out.push(';');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taosgen_core::cell::{ColumnType, ColumnTypeTag};
    use taosgen_core::row::Row;
    use taosgen_core::schema::{ColumnConfig, GeneratorKind, GeneratorParams};

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
    fn formats_two_tables_matching_scenario_two() {
        let cfgs = schema();
        let mut block = MemoryBlock::new(0, 2, 2, &cfgs);
        block.used_tables = 2;
        block.tables[0].table_name = "t1".into();
        block.tables[0].add_rows(&[
            Row::new(1500000000000, vec![ColumnType::Float(3.14), ColumnType::Int(42)]),
            Row::new(1500000000001, vec![ColumnType::Float(2.71), ColumnType::Int(43)]),
        ]);
        block.tables[1].table_name = "t2".into();
        block.tables[1].add_rows(&[
            Row::new(1500000000002, vec![ColumnType::Float(1.23), ColumnType::Int(44)]),
            Row::new(1500000000003, vec![ColumnType::Float(4.56), ColumnType::Int(45)]),
        ]);
        block.total_rows = 4;

        let formatter = SqlFormatter::new("test_db");
        let sql = formatter.format(&block, false);
        assert_eq!(
            sql,
            "INSERT INTO `test_db`.`t1` VALUES (1500000000000,3.14,42)(1500000000001,2.71,43) `test_db`.`t2` VALUES (1500000000002,1.23,44)(1500000000003,4.56,45);"
        );
    }

    #[test]
    fn empty_block_returns_empty_string() {
        let cfgs = schema();
        let block = MemoryBlock::new(0, 1, 1, &cfgs);
        let formatter = SqlFormatter::new("test_db");
        assert_eq!(formatter.format(&block, false), "");
    }

    #[test]
    fn recovery_drops_leading_row_to_avoid_duplicate_write() {
        let cfgs = schema();
        let mut block = MemoryBlock::new(0, 1, 2, &cfgs);
        block.used_tables = 1;
        block.tables[0].table_name = "t1".into();
        block.tables[0].add_rows(&[
            Row::new(1620000005000, vec![ColumnType::Float(3.14), ColumnType::Int(42)]),
            Row::new(1620000006000, vec![ColumnType::Float(2.71), ColumnType::Int(43)]),
        ]);
        block.total_rows = 2;

        let formatter = SqlFormatter::new("test_db");
        let sql = formatter.format(&block, true);
        assert_eq!(
            sql,
            "INSERT INTO `test_db`.`t1` VALUES (1620000006000,2.71,43);"
        );
    }

    #[test]
    fn recovery_with_all_tables_empty_still_returns_empty_string() {
        let cfgs = schema();
        let block = MemoryBlock::new(0, 1, 1, &cfgs);
        let formatter = SqlFormatter::new("test_db");
        assert_eq!(formatter.format(&block, true), "");
    }
}
