//! Shared JSON and Influx line-protocol serializers, used by both the Kafka
//! and MQTT formatters (`spec.md` §4.5).

use taosgen_core::cell::ColumnType;
use taosgen_core::schema::ColumnConfig;

/// Fills an ordered JSON object `{ts, col…, tag…, tbname_key?}` for one row.
pub fn to_json_inplace(
    columns_cfg: &[ColumnConfig],
    tags_cfg: &[ColumnConfig],
    timestamp: i64,
    column_values: &[ColumnType],
    tag_values: &[ColumnType],
    table_name: Option<&str>,
    tbname_key: &str,
) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("ts".to_string(), serde_json::Value::from(timestamp));
    for (cfg, value) in columns_cfg.iter().zip(column_values) {
        map.insert(cfg.name.clone(), cell_to_json(value));
    }
    for (cfg, value) in tags_cfg.iter().zip(tag_values) {
        map.insert(cfg.name.clone(), cell_to_json(value));
    }
    if let Some(name) = table_name {
        if !tbname_key.is_empty() {
            map.insert(tbname_key.to_string(), serde_json::Value::String(name.to_string()));
        }
    }
    serde_json::Value::Object(map)
}

fn cell_to_json(cell: &ColumnType) -> serde_json::Value {
    match cell {
        ColumnType::Null(_) => serde_json::Value::Null,
        ColumnType::Bool(b) => serde_json::Value::Bool(*b),
        ColumnType::TinyInt(v) => serde_json::Value::from(*v),
        ColumnType::SmallInt(v) => serde_json::Value::from(*v),
        ColumnType::Int(v) => serde_json::Value::from(*v),
        ColumnType::BigInt(v) => serde_json::Value::from(*v),
        ColumnType::UTinyInt(v) => serde_json::Value::from(*v),
        ColumnType::USmallInt(v) => serde_json::Value::from(*v),
        ColumnType::UInt(v) => serde_json::Value::from(*v),
        ColumnType::UBigInt(v) => serde_json::Value::from(*v),
        ColumnType::Float(v) => serde_json::Number::from_f64(*v as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ColumnType::Double(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        other => serde_json::Value::String(other.to_display_string()),
    }
}

/// Emits `measurement,tag=val[,…] col=val[,…] ts`: tags are always quoted
/// (they carry through as textual identifiers regardless of declared type),
/// field values quote strings, suffix integers with `i`, and never quote
/// floats.
pub fn to_influx_inplace(
    measurement: &str,
    columns_cfg: &[ColumnConfig],
    tags_cfg: &[ColumnConfig],
    timestamp: i64,
    column_values: &[ColumnType],
    tag_values: &[ColumnType],
) -> String {
    let mut out = String::new();
    out.push_str(measurement);
    for (cfg, value) in tags_cfg.iter().zip(tag_values) {
        out.push(',');
        out.push_str(&cfg.name);
        out.push_str("=\"");
        out.push_str(&value.to_display_string());
        out.push('"');
    }
    out.push(' ');
    let mut first = true;
    for (cfg, value) in columns_cfg.iter().zip(column_values) {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&cfg.name);
        out.push('=');
        out.push_str(&field_literal(value));
    }
    out.push(' ');
    out.push_str(&timestamp.to_string());
    out
}

fn field_literal(value: &ColumnType) -> String {
    if value.is_textual() {
        format!("\"{}\"", value.to_display_string())
    } else if value.is_integer() {
        format!("{}i", value.to_display_string())
    } else {
        value.to_display_string()
    }
}
