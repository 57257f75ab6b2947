//! The `FormatResult`/`InsertData` envelope (`spec.md` §3): a common
//! wrapper around whatever payload a formatter produced, still carrying the
//! `BlockHandle` that must eventually be released back to the pool.

use taosgen_core::pool::{BindDescriptor, BlockHandle};

/// One payload variant per registered format type.
pub enum Payload {
    Sql(String),
    /// Per-table bind descriptors plus the prepare-SQL shape they were
    /// built against.
    Stmt(Vec<BindDescriptor>),
    Kafka(Vec<(String, String)>),
    Mqtt(Vec<(String, String)>),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Sql(s) => s.is_empty(),
            Payload::Stmt(v) => v.iter().all(|d| d.row_count == 0),
            Payload::Kafka(v) | Payload::Mqtt(v) => v.is_empty(),
        }
    }
}

/// Carries a formatted payload plus the block it was built from. Consumers
/// write the payload, then hand the envelope to the garbage collector, which
/// is the single path that releases `block_handle` back to the pool
/// (resolves the double-release design note in `spec.md` §9 — the envelope
/// itself never calls `release_block`).
pub struct FormatResult {
    pub start_time: i64,
    pub end_time: i64,
    pub total_rows: usize,
    pub block_handle: BlockHandle,
    pub payload: Payload,
}

impl FormatResult {
    pub fn new(start_time: i64, end_time: i64, total_rows: usize, block_handle: BlockHandle, payload: Payload) -> Self {
        Self {
            start_time,
            end_time,
            total_rows,
            block_handle,
            payload,
        }
    }
}
