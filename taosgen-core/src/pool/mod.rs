//! The memory pool and its columnar staging blocks ("the CORE" per
//! `spec.md` §1.1).

mod bind;
mod memory_block;
mod table_block;

pub use bind::{BindColumn, BindDescriptor};
pub use memory_block::MemoryBlock;
pub use table_block::{ColumnStorage, TableBlock};

use crate::cell::ColumnType;
use crate::error::PoolError;
use crate::row::MultiBatch;
use crate::schema::ColumnConfig;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// How long `acquire_block` waits for a free block before giving up with
/// [`PoolError::AcquireTimeout`].
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// A handle to a block currently owned by a producer or consumer. Dropping
/// it without releasing is a logic error the pool cannot detect (ownership
/// transitions are tracked explicitly per `spec.md` §5), so callers must
/// call `release` exactly once per acquire.
pub struct BlockHandle {
    pub index: usize,
}

/// Fixed-size pool of pre-allocated `MemoryBlock`s, with a bounded lock-free
/// free-list (a `crossbeam_channel` bounded channel, the idiomatic Rust
/// stand-in for `moodycamel::BlockingConcurrentQueue`).
pub struct MemoryPool {
    blocks: Vec<Mutex<MemoryBlock>>,
    free_tx: Sender<usize>,
    free_rx: Receiver<usize>,
    terminated: std::sync::atomic::AtomicBool,
    columns_cfg: Vec<ColumnConfig>,
    tags_cfg: Vec<ColumnConfig>,
    table_tags: Mutex<HashMap<String, Vec<ColumnType>>>,
    /// Pre-materialized synthetic batches per table, filled by the
    /// orchestrator at startup when `cache_units > 0`.
    cache_units: Mutex<HashMap<String, Vec<Vec<crate::row::Row>>>>,
}

impl MemoryPool {
    pub fn new(
        block_count: usize,
        max_tables_per_block: usize,
        max_rows_per_table: usize,
        columns_cfg: Vec<ColumnConfig>,
        tags_cfg: Vec<ColumnConfig>,
    ) -> Self {
        let (free_tx, free_rx) = bounded(block_count);
        let blocks: Vec<Mutex<MemoryBlock>> = (0..block_count)
            .map(|slot| {
                Mutex::new(MemoryBlock::new(
                    slot,
                    max_tables_per_block,
                    max_rows_per_table,
                    &columns_cfg,
                ))
            })
            .collect();
        for slot in 0..block_count {
            free_tx.send(slot).expect("free-list has room for every block at startup");
        }
        Self {
            blocks,
            free_tx,
            free_rx,
            terminated: std::sync::atomic::AtomicBool::new(false),
            columns_cfg,
            tags_cfg,
            table_tags: Mutex::new(HashMap::new()),
            cache_units: Mutex::new(HashMap::new()),
        }
    }

    pub fn columns(&self) -> &[ColumnConfig] {
        &self.columns_cfg
    }

    pub fn tags(&self) -> &[ColumnConfig] {
        &self.tags_cfg
    }

    /// Dequeue one free block, blocking up to `ACQUIRE_TIMEOUT`.
    pub fn acquire_block(&self) -> Result<BlockHandle, PoolError> {
        if self.terminated.load(std::sync::atomic::Ordering::Acquire) {
            return Err(PoolError::Terminated);
        }
        match self.free_rx.recv_timeout(ACQUIRE_TIMEOUT) {
            Ok(slot) => {
                self.blocks[slot].lock().unwrap().in_use = true;
                Ok(BlockHandle { index: slot })
            }
            Err(RecvTimeoutError::Timeout) => Err(PoolError::AcquireTimeout),
            Err(RecvTimeoutError::Disconnected) => Err(PoolError::Terminated),
        }
    }

    /// Reset and re-enqueue a block. Idempotent: releasing a block whose
    /// `in_use` flag is already `false` is a silent no-op, so a double
    /// release (the bug called out in design note §9) cannot corrupt the
    /// free-list or double-enqueue a slot.
    pub fn release_block(&self, handle: &BlockHandle) {
        let mut block = self.blocks[handle.index].lock().unwrap();
        if !block.in_use {
            return;
        }
        block.reset();
        drop(block);
        let _ = self.free_tx.send(handle.index);
    }

    pub fn with_block<R>(&self, handle: &BlockHandle, f: impl FnOnce(&MemoryBlock) -> R) -> R {
        let block = self.blocks[handle.index].lock().unwrap();
        f(&block)
    }

    pub fn with_block_mut<R>(&self, handle: &BlockHandle, f: impl FnOnce(&mut MemoryBlock) -> R) -> R {
        let mut block = self.blocks[handle.index].lock().unwrap();
        f(&mut block)
    }

    /// Pack a `MultiBatch` into a freshly acquired block, column by column
    /// per table. Returns `None` if the batch carries no rows.
    pub fn convert_to_memory_block(&self, batch: MultiBatch) -> Result<Option<BlockHandle>, PoolError> {
        if batch.is_empty() {
            return Ok(None);
        }
        let handle = self.acquire_block()?;
        self.with_block_mut(&handle, |block| {
            block.used_tables = batch.tables.len().min(block.tables.len());
            for (i, table_rows) in batch.tables.iter().take(block.used_tables).enumerate() {
                let tb = &mut block.tables[i];
                tb.table_name = table_rows.table_name.clone();
                tb.add_rows(&table_rows.rows);
                for row in &table_rows.rows {
                    block.start_time = block.start_time.min(row.timestamp);
                    block.end_time = block.end_time.max(row.timestamp);
                }
            }
            block.total_rows = batch.total_rows();
            block.build_bindings();
        });
        Ok(Some(handle))
    }

    pub fn register_table_tags(&self, table_name: impl Into<String>, tag_cells: Vec<ColumnType>) {
        self.table_tags.lock().unwrap().insert(table_name.into(), tag_cells);
    }

    pub fn table_tags(&self, table_name: &str) -> Option<Vec<ColumnType>> {
        self.table_tags.lock().unwrap().get(table_name).cloned()
    }

    pub fn store_cache_units(&self, table_name: impl Into<String>, batches: Vec<Vec<crate::row::Row>>) {
        self.cache_units.lock().unwrap().insert(table_name.into(), batches);
    }

    pub fn cache_units_for(&self, table_name: &str) -> Option<Vec<Vec<crate::row::Row>>> {
        self.cache_units.lock().unwrap().get(table_name).cloned()
    }

    pub fn terminate(&self) {
        self.terminated.store(true, std::sync::atomic::Ordering::Release);
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::ColumnTypeTag;
    use crate::row::{MultiBatch, Row, TableRows};
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
    fn pool_round_trip_scenario_one() {
        // Scenario 1 from spec.md §8.
        let pool = MemoryPool::new(1, 1, 2, schema(), vec![]);
        let batch = MultiBatch {
            tables: vec![TableRows {
                table_name: "t1".to_string(),
                rows: vec![
                    Row::new(
                        1500000000000,
                        vec![ColumnType::Float(3.14), ColumnType::Int(42)],
                    ),
                    Row::new(
                        1500000000001,
                        vec![ColumnType::Float(2.71), ColumnType::Int(43)],
                    ),
                ],
            }],
        };
        let handle = pool.convert_to_memory_block(batch).unwrap().unwrap();
        pool.with_block(&handle, |block| {
            assert_eq!(block.used_tables, 1);
            assert_eq!(block.tables[0].used_rows, 2);
            assert_eq!(block.total_rows, 2);
            assert_eq!(block.start_time, 1500000000000);
            assert_eq!(block.end_time, 1500000000001);
            assert_eq!(block.tables[0].cell_at(0, 0), ColumnType::Float(3.14));
            assert_eq!(block.tables[0].cell_at(0, 1), ColumnType::Float(2.71));
            assert_eq!(block.tables[0].cell_at(1, 0), ColumnType::Int(42));
            assert_eq!(block.tables[0].cell_at(1, 1), ColumnType::Int(43));
        });
    }

    #[test]
    fn empty_batch_returns_none() {
        let pool = MemoryPool::new(1, 1, 2, schema(), vec![]);
        let handle = pool.convert_to_memory_block(MultiBatch::default()).unwrap();
        assert!(handle.is_none());
    }

    #[test]
    fn acquire_release_acquire_yields_reset_block() {
        let pool = MemoryPool::new(1, 1, 2, schema(), vec![]);
        let h1 = pool.acquire_block().unwrap();
        pool.with_block_mut(&h1, |b| {
            b.used_tables = 1;
            b.tables[0].table_name = "t1".into();
            b.tables[0].add_row(&Row::new(1, vec![ColumnType::Float(1.0), ColumnType::Int(1)]));
            b.total_rows = 1;
        });
        pool.release_block(&h1);
        let h2 = pool.acquire_block().unwrap();
        pool.with_block(&h2, |b| {
            assert_eq!(b.used_tables, 0);
            assert_eq!(b.total_rows, 0);
            assert_eq!(b.tables[0].used_rows, 0);
        });
    }

    #[test]
    fn double_release_is_a_no_op() {
        let pool = MemoryPool::new(1, 1, 2, schema(), vec![]);
        let h1 = pool.acquire_block().unwrap();
        pool.release_block(&h1);
        // Second release of the same index must not double-enqueue it.
        pool.release_block(&h1);
        assert_eq!(pool.free_rx.len(), 1);
    }
}
