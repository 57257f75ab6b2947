//! Explicit formatter registry, replacing the global `FormatterFactory`
//! singleton (design note §9): callers construct one `Registry` value and
//! thread it through the orchestrator, so tests can build independent
//! instances without sharing process-wide mutable state.

use crate::envelope::Payload;
use crate::error::FormatError;
use crate::kafka::KafkaFormatter;
use crate::mqtt::MqttFormatter;
use crate::sql::SqlFormatter;
use crate::stmt::StmtFormatter;
use std::collections::HashMap;
use taosgen_core::cell::ColumnType;
use taosgen_core::pool::MemoryBlock;
use taosgen_core::schema::ColumnConfig;

/// A fixed sum type of formatter variants (design note §9: no virtual
/// dispatch on the hot path — one match per envelope per write).
pub enum Formatter {
    Sql(SqlFormatter),
    Stmt(StmtFormatter),
    Kafka(KafkaFormatter),
    Mqtt(MqttFormatter),
}

impl Formatter {
    pub fn format_type(&self) -> &'static str {
        match self {
            Formatter::Sql(_) => "sql",
            Formatter::Stmt(_) => "stmt",
            Formatter::Kafka(_) => "kafka",
            Formatter::Mqtt(_) => "mqtt",
        }
    }

    /// `is_recovery` marks the first block formatted after a checkpoint
    /// resume (`spec.md` §4.10 scenario 5, §8 testable property): `Sql` and
    /// `Stmt` drop the duplicate leading row this produces, `Kafka`/`Mqtt`
    /// accept but ignore it (`spec.md` §9 open question).
    pub fn format(
        &self,
        block: &MemoryBlock,
        columns_cfg: &[ColumnConfig],
        tags_cfg: &[ColumnConfig],
        table_tags: &HashMap<String, Vec<ColumnType>>,
        is_recovery: bool,
    ) -> Payload {
        match self {
            Formatter::Sql(f) => Payload::Sql(f.format(block, is_recovery)),
            Formatter::Stmt(f) => Payload::Stmt(f.format(block, is_recovery)),
            Formatter::Kafka(f) => Payload::Kafka(f.format(block, columns_cfg, tags_cfg, table_tags, is_recovery)),
            Formatter::Mqtt(f) => Payload::Mqtt(f.format(block, columns_cfg, tags_cfg, table_tags, is_recovery)),
        }
    }
}

/// Keyed lookup by `format_type ∈ {sql, stmt, mqtt, kafka}`, built once at
/// startup from configuration.
#[derive(Default)]
pub struct Registry {
    formatters: HashMap<String, Formatter>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, formatter: Formatter) {
        self.formatters.insert(name.into(), formatter);
    }

    pub fn get(&self, name: &str) -> Result<&Formatter, FormatError> {
        self.formatters
            .get(name)
            .ok_or_else(|| FormatError::UnknownFormatType(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_type_is_an_error() {
        let registry = Registry::new();
        assert!(registry.get("sql").is_err());
    }

    #[test]
    fn registered_formatter_is_retrievable_by_name() {
        let mut registry = Registry::new();
        registry.register("sql", Formatter::Sql(SqlFormatter::new("db")));
        assert_eq!(registry.get("sql").unwrap().format_type(), "sql");
    }
}
