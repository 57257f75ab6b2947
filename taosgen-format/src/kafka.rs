//! The Kafka formatter: produces `(key, value)` pairs, unaware of the
//! network protocol (`spec.md` §4.5).

use crate::json_influx::{to_influx_inplace, to_json_inplace};
use crate::pattern::{PatternCompiler, RowContext};
use std::collections::HashMap;
use taosgen_core::cell::ColumnType;
use taosgen_core::pool::MemoryBlock;
use taosgen_core::schema::ColumnConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSerializer {
    Json,
    Influx,
}

pub struct KafkaFormatter {
    key_pattern: PatternCompiler,
    value_serializer: ValueSerializer,
    measurement: String,
    records_per_message: usize,
    tbname_key: String,
}

impl KafkaFormatter {
    pub fn new(
        key_pattern: &str,
        value_serializer: ValueSerializer,
        measurement: impl Into<String>,
        records_per_message: usize,
        tbname_key: impl Into<String>,
    ) -> Self {
        Self {
            key_pattern: PatternCompiler::compile(key_pattern),
            value_serializer,
            measurement: measurement.into(),
            // `records_per_message > rows` collapses into one partial message (spec.md §8).
            records_per_message: records_per_message.max(1),
            tbname_key: tbname_key.into(),
        }
    }

    /// `table_tags` maps table name to its tag cell values, in `tags_cfg`
    /// order; tables with no registered tags are treated as tagless.
    ///
    /// `is_recovery` is accepted for signature parity with the other
    /// formatters but is not acted on: a Kafka sink has no prepared
    /// statement to dedup against, so recovery-driven duplicate avoidance
    /// is left to the consumer side of the topic, same as upstream.
    pub fn format(
        &self,
        block: &MemoryBlock,
        columns_cfg: &[ColumnConfig],
        tags_cfg: &[ColumnConfig],
        table_tags: &HashMap<String, Vec<ColumnType>>,
        _is_recovery: bool,
    ) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let empty_tags_vec = Vec::new();
        for table in block.active_tables() {
            let tag_values = table_tags.get(&table.table_name).unwrap_or(&empty_tags_vec);
            let tags_map: HashMap<String, ColumnType> = tags_cfg
                .iter()
                .zip(tag_values.iter())
                .map(|(c, v)| (c.name.clone(), v.clone()))
                .collect();
            let mut row = 0;
            while row < table.used_rows {
                let group_end = (row + self.records_per_message).min(table.used_rows);
                let mut values_by_group = Vec::new();
                for r in row..group_end {
                    let cells: Vec<ColumnType> = (0..table.columns.len()).map(|c| table.cell_at(c, r)).collect();
                    values_by_group.push((table.timestamps[r], cells));
                }
                let (first_ts, first_cells) = &values_by_group[0];
                let columns_map: HashMap<String, ColumnType> = columns_cfg
                    .iter()
                    .zip(first_cells)
                    .map(|(c, v)| (c.name.clone(), v.clone()))
                    .collect();
                let key = self.key_pattern.resolve(&RowContext {
                    table_name: Some(&table.table_name),
                    timestamp: Some(*first_ts),
                    columns: &columns_map,
                    tags: &tags_map,
                });

                let value = match self.value_serializer {
                    ValueSerializer::Json => {
                        let array: Vec<serde_json::Value> = values_by_group
                            .iter()
                            .map(|(ts, cells)| {
                                to_json_inplace(
                                    columns_cfg,
                                    tags_cfg,
                                    *ts,
                                    cells,
                                    tag_values,
                                    Some(&table.table_name),
                                    &self.tbname_key,
                                )
                            })
                            .collect();
                        if array.len() == 1 {
                            array.into_iter().next().unwrap().to_string()
                        } else {
                            serde_json::Value::Array(array).to_string()
                        }
                    }
                    ValueSerializer::Influx => values_by_group
                        .iter()
                        .map(|(ts, cells)| to_influx_inplace(&self.measurement, columns_cfg, tags_cfg, *ts, cells, tag_values))
                        .collect::<Vec<_>>()
                        .join("\n"),
                };
                out.push((key, value));
                row = group_end;
            }
        }
        out
    }
}
