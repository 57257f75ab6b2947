//! Sink writers: one state machine shape (`New → Connected → Prepared →
//! Writing → Closed`) shared by every transport, per `spec.md` §4.9.

pub mod filesystem_writer;
pub mod kafka_writer;
pub mod metrics;
pub mod mqtt_writer;
pub mod retry;
pub mod sql_writer;

use taosgen_format::envelope::FormatResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    New,
    Connected,
    Prepared,
    Writing,
    Closed,
}

/// A sink-plugin writer. Every writer owns its own connection/session and
/// walks the same lifecycle; `write` is only valid once `prepare` has run.
pub trait Writer: Send {
    fn connect(&mut self) -> anyhow::Result<()>;
    fn prepare(&mut self) -> anyhow::Result<()>;
    fn write(&mut self, result: &FormatResult) -> anyhow::Result<()>;
    fn close(&mut self) -> anyhow::Result<()>;
    fn state(&self) -> WriterState;
    fn metrics(&self) -> &metrics::LatencyHistogram;
}

/// Drives a writer through its full lifecycle for one block and records
/// the write's latency, regardless of which transport it is.
pub fn write_timed(writer: &mut dyn Writer, result: &FormatResult) -> anyhow::Result<()> {
    let policy = retry::RetryPolicy::default();
    let start = std::time::Instant::now();
    retry::execute_with_retry(&policy, || writer.write(result))?;
    writer.metrics().record(start.elapsed());
    Ok(())
}
