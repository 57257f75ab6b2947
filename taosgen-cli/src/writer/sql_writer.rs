//! SQL-text and bulk-bind statement writer. The real TDengine wire driver
//! is out of scope (`spec.md` §4.9 Non-goals); `Connector` is the seam a
//! production build would plug a native client into, and `RecordingConnector`
//! is the in-memory stub this crate tests against.

use super::metrics::LatencyHistogram;
use super::{Writer, WriterState};
use taosgen_format::envelope::{FormatResult, Payload};

/// The boundary a real TDengine client would implement. Kept minimal: one
/// call per SQL statement, one call per bulk-bind descriptor set.
pub trait Connector: Send {
    fn connect(&mut self, host: &str, port: u16, user: Option<&str>, password: Option<&str>) -> anyhow::Result<()>;
    fn exec_sql(&mut self, sql: &str) -> anyhow::Result<()>;
    fn prepare(&mut self, sql: &str) -> anyhow::Result<()>;
    fn bind_and_execute(&mut self, bindings: &[taosgen_core::pool::BindDescriptor]) -> anyhow::Result<()>;
}

/// Records every call it receives instead of talking to a server; used by
/// tests and by `--dry-run`-style smoke checks.
#[derive(Default)]
pub struct RecordingConnector {
    pub executed_sql: Vec<String>,
    pub prepared_sql: Vec<String>,
    pub bound_batches: usize,
}

impl Connector for RecordingConnector {
    fn connect(&mut self, _host: &str, _port: u16, _user: Option<&str>, _password: Option<&str>) -> anyhow::Result<()> {
        Ok(())
    }

    fn exec_sql(&mut self, sql: &str) -> anyhow::Result<()> {
        self.executed_sql.push(sql.to_string());
        Ok(())
    }

    fn prepare(&mut self, sql: &str) -> anyhow::Result<()> {
        self.prepared_sql.push(sql.to_string());
        Ok(())
    }

    fn bind_and_execute(&mut self, _bindings: &[taosgen_core::pool::BindDescriptor]) -> anyhow::Result<()> {
        self.bound_batches += 1;
        Ok(())
    }
}

pub struct SqlWriter<C: Connector> {
    connector: C,
    host: String,
    port: u16,
    user: Option<String>,
    password: Option<String>,
    prepare_sql: Option<String>,
    state: WriterState,
    metrics: LatencyHistogram,
}

impl<C: Connector> SqlWriter<C> {
    pub fn new(connector: C, host: impl Into<String>, port: u16, user: Option<String>, password: Option<String>) -> Self {
        Self {
            connector,
            host: host.into(),
            port,
            user,
            password,
            prepare_sql: None,
            state: WriterState::New,
            metrics: LatencyHistogram::new(),
        }
    }

    pub fn with_prepare_sql(mut self, sql: impl Into<String>) -> Self {
        self.prepare_sql = Some(sql.into());
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}

impl<C: Connector> Writer for SqlWriter<C> {
    fn connect(&mut self) -> anyhow::Result<()> {
        self.connector
            .connect(&self.host, self.port, self.user.as_deref(), self.password.as_deref())?;
        self.state = WriterState::Connected;
        Ok(())
    }

    fn prepare(&mut self) -> anyhow::Result<()> {
        if let Some(sql) = &self.prepare_sql {
            self.connector.prepare(sql)?;
        }
        self.state = WriterState::Prepared;
        Ok(())
    }

    fn write(&mut self, result: &FormatResult) -> anyhow::Result<()> {
        self.state = WriterState::Writing;
        match &result.payload {
            Payload::Sql(text) => {
                if !text.is_empty() {
                    self.connector.exec_sql(text)?;
                }
            }
            Payload::Stmt(bindings) => {
                if !bindings.is_empty() {
                    self.connector.bind_and_execute(bindings)?;
                }
            }
            other => anyhow::bail!("SqlWriter cannot write a {} payload", payload_kind(other)),
        }
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.state = WriterState::Closed;
        Ok(())
    }

    fn state(&self) -> WriterState {
        self.state
    }

    fn metrics(&self) -> &LatencyHistogram {
        &self.metrics
    }
}

fn payload_kind(payload: &Payload) -> &'static str {
    match payload {
        Payload::Sql(_) => "sql",
        Payload::Stmt(_) => "stmt",
        Payload::Kafka(_) => "kafka",
        Payload::Mqtt(_) => "mqtt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taosgen_core::pool::BlockHandle;

    #[test]
    fn writes_sql_text_through_the_connector() {
        let mut writer = SqlWriter::new(RecordingConnector::default(), "localhost", 6030, None, None);
        writer.connect().unwrap();
        writer.prepare().unwrap();
        let result = FormatResult::new(
            0,
            1,
            1,
            BlockHandle { index: 0 },
            Payload::Sql("INSERT INTO t1 VALUES(1,2.0)".to_string()),
        );
        writer.write(&result).unwrap();
        assert_eq!(writer.connector().executed_sql, vec!["INSERT INTO t1 VALUES(1,2.0)"]);
        assert_eq!(writer.state(), WriterState::Writing);
    }

    #[test]
    fn rejects_mismatched_payload_kind() {
        let mut writer = SqlWriter::new(RecordingConnector::default(), "localhost", 6030, None, None);
        writer.connect().unwrap();
        writer.prepare().unwrap();
        let result = FormatResult::new(
            0,
            1,
            1,
            BlockHandle { index: 0 },
            Payload::Kafka(vec![("t".into(), "p".into())]),
        );
        assert!(writer.write(&result).is_err());
    }
}
