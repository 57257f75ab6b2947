//! The MQTT formatter: produces `(topic, payload)` pairs (`spec.md` §4.5).

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

pub struct MqttFormatter {
    topic_pattern: PatternCompiler,
    value_serializer: ValueSerializer,
    measurement: String,
    records_per_message: usize,
}

impl MqttFormatter {
    pub fn new(
        topic_pattern: &str,
        value_serializer: ValueSerializer,
        measurement: impl Into<String>,
        records_per_message: usize,
    ) -> Self {
        Self {
            topic_pattern: PatternCompiler::compile(topic_pattern),
            value_serializer,
            measurement: measurement.into(),
            records_per_message: records_per_message.max(1),
        }
    }

    /// `table_tags` maps table name to its tag cell values, in `tags_cfg`
    /// order; tables with no registered tags are treated as tagless.
    ///
    /// `is_recovery` is accepted for signature parity with the other
    /// formatters but is not acted on, same rationale as the Kafka
    /// formatter: there is no prepared statement here to dedup against.
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
                let topic = self.topic_pattern.resolve(&RowContext {
                    table_name: Some(&table.table_name),
                    timestamp: Some(*first_ts),
                    columns: &columns_map,
                    tags: &tags_map,
                });

                let payload = match self.value_serializer {
                    ValueSerializer::Json => {
                        let array: Vec<serde_json::Value> = values_by_group
                            .iter()
                            .map(|(ts, cells)| {
                                to_json_inplace(columns_cfg, tags_cfg, *ts, cells, tag_values, Some(&table.table_name), "")
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
                        .map(|(ts, cells)| {
                            to_influx_inplace(&self.measurement, columns_cfg, tags_cfg, *ts, cells, tag_values)
                        })
                        .collect::<Vec<_>>()
                        .join("\n"),
                };
                out.push((topic, payload));
                row = group_end;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taosgen_core::cell::ColumnTypeTag;
    use taosgen_core::row::Row;
    use taosgen_core::schema::{GeneratorKind, GeneratorParams};

    fn col(name: &str, tag: ColumnTypeTag) -> ColumnConfig {
        ColumnConfig {
            name: name.to_string(),
            type_tag: tag,
            length: None,
            generator: GeneratorKind::Random,
            params: GeneratorParams::default(),
            null_ratio: 0.0,
            is_primary_key: false,
        }
    }

    #[test]
    fn mqtt_influx_with_tags_scenario_four() {
        let columns_cfg = vec![col("f1", ColumnTypeTag::Float)];
        let tags_cfg = vec![col("region", ColumnTypeTag::Varchar), col("sensor_id", ColumnTypeTag::Int)];
        let mut block = MemoryBlock::new(0, 1, 1, &columns_cfg);
        block.used_tables = 1;
        block.tables[0].table_name = "table1".into();
        block.tables[0].add_row(&Row::new(1500000000000, vec![ColumnType::Float(3.14)]));
        block.total_rows = 1;

        let mut table_tags = HashMap::new();
        table_tags.insert(
            "table1".to_string(),
            vec![ColumnType::Varchar("us-west".to_string()), ColumnType::Int(1001)],
        );

        let formatter = MqttFormatter::new("telemetry/{region}/{table}", ValueSerializer::Influx, "table1", 1);
        let messages = formatter.format(&block, &columns_cfg, &tags_cfg, &table_tags, false);
        assert_eq!(messages[0].0, "telemetry/us-west/table1");
        assert_eq!(messages[0].1, r#"table1,region="us-west",sensor_id="1001" f1=3.14 1500000000000"#);
    }
}
