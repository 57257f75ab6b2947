//! The statement (bulk-bind) formatter, v2 only (`spec.md` §4.5).

use taosgen_core::pool::{BindDescriptor, MemoryBlock};

/// Which of the three prepare-SQL shapes a statement sink is using.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StmtMode {
    /// `INSERT INTO ? VALUES(?,?,…)` — sub-table mode, table bound per call.
    SubTable,
    /// `INSERT INTO \`stb\`(tbname,ts,col…) VALUES(?,?,?,…)` — super-table mode.
    SuperTable,
    /// `INSERT INTO ? USING \`stb\` TAGS(?,…) VALUES(?,…)` — auto-create-table mode.
    AutoCreateTable,
}

pub struct StmtFormatter {
    pub mode: StmtMode,
    pub super_table: String,
}

impl StmtFormatter {
    pub fn new(mode: StmtMode, super_table: impl Into<String>) -> Self {
        Self {
            mode,
            super_table: super_table.into(),
        }
    }

    /// Prepare-SQL text for this mode; sent once per consumer at connect
    /// time, not per block. `tags` is only consulted in `AutoCreateTable`
    /// mode, where it sizes the `TAGS(?,…)` placeholder list.
    pub fn prepare_sql(
        &self,
        columns: &[taosgen_core::schema::ColumnConfig],
        tags: &[taosgen_core::schema::ColumnConfig],
    ) -> String {
        let placeholders = |n: usize| (0..n).map(|_| "?").collect::<Vec<_>>().join(",");
        match self.mode {
            StmtMode::SubTable => format!("INSERT INTO ? VALUES({})", placeholders(columns.len() + 1)),
            StmtMode::SuperTable => {
                let col_names = columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(",");
                format!(
                    "INSERT INTO `{}`(tbname,ts,{}) VALUES({})",
                    self.super_table,
                    col_names,
                    placeholders(columns.len() + 2)
                )
            }
            StmtMode::AutoCreateTable => format!(
                "INSERT INTO ? USING `{}` TAGS({}) VALUES({})",
                self.super_table,
                placeholders(tags.len()),
                placeholders(columns.len() + 1)
            ),
        }
    }

    /// Rebuilds and returns a clone of the block's precomputed bind
    /// descriptors for every active table — cheap, since they're already
    /// rebuilt by `MemoryBlock::build_bindings` at pack time.
    ///
    /// `is_recovery` marks the first batch formatted after a checkpoint
    /// resume (`spec.md` §4.10 scenario 5): its leading row reproduces the
    /// last checkpointed timestamp, so the first non-empty binding has its
    /// row count trimmed by one row rather than bound a second time. The
    /// bind descriptor carries no row offset (`pool::bind`), so the trim is
    /// expressed purely as a row-count decrement, not a skipped index.
    pub fn format(&self, block: &MemoryBlock, is_recovery: bool) -> Vec<BindDescriptor> {
        let mut bindings = block.bindings[..block.used_tables].to_vec();
        if is_recovery {
            if let Some(b) = bindings.iter_mut().find(|b| b.row_count > 0) {
                b.row_count -= 1;
                for col in &mut b.columns {
                    col.row_count = col.row_count.saturating_sub(1);
                }
            }
        }
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taosgen_core::cell::ColumnTypeTag;
    use taosgen_core::schema::{ColumnConfig, GeneratorKind, GeneratorParams};

    fn columns() -> Vec<ColumnConfig> {
        vec![ColumnConfig {
            name: "f".into(),
            type_tag: ColumnTypeTag::Float,
            length: None,
            generator: GeneratorKind::Random,
            params: GeneratorParams::default(),
            null_ratio: 0.0,
            is_primary_key: false,
        }]
    }

    fn tags(n: usize) -> Vec<ColumnConfig> {
        (0..n)
            .map(|i| ColumnConfig {
                name: format!("tag{i}"),
                type_tag: ColumnTypeTag::Int,
                length: None,
                generator: GeneratorKind::Random,
                params: GeneratorParams::default(),
                null_ratio: 0.0,
                is_primary_key: false,
            })
            .collect()
    }

    #[test]
    fn sub_table_prepare_sql() {
        let formatter = StmtFormatter::new(StmtMode::SubTable, "stb");
        assert_eq!(formatter.prepare_sql(&columns(), &[]), "INSERT INTO ? VALUES(?,?)");
    }

    #[test]
    fn super_table_prepare_sql_lists_columns() {
        let formatter = StmtFormatter::new(StmtMode::SuperTable, "stb");
        assert_eq!(
            formatter.prepare_sql(&columns(), &[]),
            "INSERT INTO `stb`(tbname,ts,f) VALUES(?,?,?)"
        );
    }

    #[test]
    fn auto_create_table_prepare_sql_single_tag() {
        let formatter = StmtFormatter::new(StmtMode::AutoCreateTable, "stb");
        assert_eq!(
            formatter.prepare_sql(&columns(), &tags(1)),
            "INSERT INTO ? USING `stb` TAGS(?) VALUES(?,?)"
        );
    }

    #[test]
    fn auto_create_table_prepare_sql_scales_tags_placeholder_count() {
        let formatter = StmtFormatter::new(StmtMode::AutoCreateTable, "stb");
        assert_eq!(
            formatter.prepare_sql(&columns(), &tags(3)),
            "INSERT INTO ? USING `stb` TAGS(?,?,?) VALUES(?,?)"
        );
    }

    #[test]
    fn format_clones_active_bindings() {
        let cfgs = columns();
        let mut block = MemoryBlock::new(0, 1, 1, &cfgs);
        block.used_tables = 1;
        block.tables[0].table_name = "t1".into();
        block.build_bindings();
        let formatter = StmtFormatter::new(StmtMode::SubTable, "stb");
        let bindings = formatter.format(&block, false);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].table_name, "t1");
    }

    #[test]
    fn recovery_trims_one_row_from_first_non_empty_binding() {
        let cfgs = columns();
        let mut block = MemoryBlock::new(0, 1, 2, &cfgs);
        block.used_tables = 1;
        block.tables[0].table_name = "t1".into();
        block.tables[0].used_rows = 2;
        block.build_bindings();
        let formatter = StmtFormatter::new(StmtMode::SubTable, "stb");
        let bindings = formatter.format(&block, true);
        assert_eq!(bindings[0].row_count, 1);
        assert!(bindings[0].columns.iter().all(|c| c.row_count == 1));
    }
}
