//! Row production for a single table, including the disorder injector
//! (`spec.md` §4.3) and a CSV-backed fallback source.

use crate::error::GeneratorError;
use crate::generators::RowGenerator;
use crate::row::Row;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::path::Path;

/// One configured disorder interval: rows whose own timestamp falls in
/// `[time_start, time_end)` are, with probability `ratio`, delayed by up to
/// `latency_range` time units before being released.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisorderInterval {
    pub time_start: i64,
    pub time_end: i64,
    pub ratio: f64,
    pub latency_range: i64,
}

struct DelayedRow {
    deliver_at: i64,
    row: Row,
}

impl PartialEq for DelayedRow {
    fn eq(&self, other: &Self) -> bool {
        self.deliver_at == other.deliver_at
    }
}
impl Eq for DelayedRow {}
impl PartialOrd for DelayedRow {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DelayedRow {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest deliver time
        // pops first.
        other.deliver_at.cmp(&self.deliver_at)
    }
}

/// Source of rows for one table: either the generator chain or a CSV
/// reader, grounded in `original_source`'s `RowDataGenerator.cpp`/
/// `CsvWriter.hpp` lineage.
enum RowSource {
    Generated(RowGenerator),
    Csv(CsvRowSource),
}

/// Minimal CSV row source: reads pre-generated rows from a file once at
/// construction and replays them, looping if the batch runs out before
/// `rows_per_table` is satisfied.
pub struct CsvRowSource {
    rows: Vec<Row>,
    cursor: usize,
}

impl CsvRowSource {
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut rows = Vec::new();
        for line in content.lines().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.split(',');
            let Some(ts_str) = parts.next() else { continue };
            let Ok(ts) = ts_str.trim().parse::<i64>() else { continue };
            let columns = parts
                .map(|p| crate::cell::ColumnType::Varchar(p.trim().to_string()))
                .collect();
            rows.push(Row::new(ts, columns));
        }
        Ok(Self { rows, cursor: 0 })
    }

    fn next(&mut self) -> Option<Row> {
        if self.rows.is_empty() {
            return None;
        }
        let row = self.rows[self.cursor % self.rows.len()].clone();
        self.cursor += 1;
        Some(row)
    }
}

/// Drives production of rows for a single table: prefers a private row
/// cache when enabled, otherwise the generator chain or CSV source, with
/// the disorder policy intercepting after each produced row.
pub struct RowDataGenerator {
    source: RowSource,
    intervals: Vec<DisorderInterval>,
    pending: BinaryHeap<DelayedRow>,
    /// Rows released from the disorder queue, returned before generating
    /// anything fresh.
    output_cache: Vec<Row>,
    cache: Option<Vec<Row>>,
    cache_cursor: usize,
    rng: SmallRng,
    last_timestamp: i64,
}

impl RowDataGenerator {
    pub fn new(generator: RowGenerator, intervals: Vec<DisorderInterval>) -> Self {
        Self {
            source: RowSource::Generated(generator),
            intervals,
            pending: BinaryHeap::new(),
            output_cache: Vec::new(),
            cache: None,
            cache_cursor: 0,
            rng: SmallRng::from_entropy(),
            last_timestamp: i64::MIN,
        }
    }

    pub fn from_csv(source: CsvRowSource) -> Self {
        Self {
            source: RowSource::Csv(source),
            intervals: Vec::new(),
            pending: BinaryHeap::new(),
            output_cache: Vec::new(),
            cache: None,
            cache_cursor: 0,
            rng: SmallRng::from_entropy(),
            last_timestamp: i64::MIN,
        }
    }

    /// Install a pre-generated private cache; once set, `next_row` replays
    /// it instead of calling the generator chain.
    pub fn set_cache(&mut self, rows: Vec<Row>) {
        self.cache = Some(rows);
        self.cache_cursor = 0;
    }

    fn fetch_fresh(&mut self) -> Result<Option<Row>, GeneratorError> {
        if let Some(cache) = &mut self.cache {
            if cache.is_empty() {
                return Ok(None);
            }
            let row = cache[self.cache_cursor % cache.len()].clone();
            self.cache_cursor += 1;
            return Ok(Some(row));
        }
        match &mut self.source {
            RowSource::Generated(gen) => Ok(Some(gen.generate_row()?)),
            RowSource::Csv(csv) => Ok(csv.next()),
        }
    }

    /// Release any queued rows whose deliver-timestamp has come due,
    /// relative to `current_ts`.
    fn drain_due(&mut self, current_ts: i64) {
        while let Some(top) = self.pending.peek() {
            if top.deliver_at <= current_ts {
                let delayed = self.pending.pop().unwrap();
                self.output_cache.push(delayed.row);
            } else {
                break;
            }
        }
    }

    fn matching_interval(&self, ts: i64) -> Option<&DisorderInterval> {
        self.intervals
            .iter()
            .find(|iv| ts >= iv.time_start && ts < iv.time_end)
    }

    /// Produce the next row for this table, applying the disorder policy.
    /// May return `None` if the underlying source is exhausted (CSV source
    /// only; generated sources never end on their own).
    pub fn next_row(&mut self) -> Result<Option<Row>, GeneratorError> {
        if let Some(row) = pop_output_cache(&mut self.output_cache) {
            return Ok(Some(row));
        }
        loop {
            let Some(row) = self.fetch_fresh()? else {
                return Ok(None);
            };
            self.last_timestamp = row.timestamp;
            self.drain_due(row.timestamp);

            if let Some(interval) = self.matching_interval(row.timestamp) {
                if self.rng.gen_bool(interval.ratio.clamp(0.0, 1.0)) {
                    let delay = if interval.latency_range > 0 {
                        self.rng.gen_range(0..interval.latency_range)
                    } else {
                        0
                    };
                    self.pending.push(DelayedRow {
                        deliver_at: row.timestamp + delay,
                        row,
                    });
                    // The caller gets no row this tick; either a queued row
                    // is already due, or we loop to fetch a fresh one.
                    if let Some(due) = pop_output_cache(&mut self.output_cache) {
                        return Ok(Some(due));
                    }
                    continue;
                }
            }
            return Ok(Some(row));
        }
    }

    /// Flush any rows still sitting in the disorder queue past the final
    /// generated timestamp (resolves the open question in `spec.md` §9:
    /// this implementation flushes rather than silently discards).
    pub fn flush_pending(&mut self) -> Vec<Row> {
        let mut out: Vec<Row> = self.pending.drain().map(|d| d.row).collect();
        out.append(&mut self.output_cache);
        out.sort_by_key(|r| r.timestamp);
        out
    }
}

fn pop_output_cache(cache: &mut Vec<Row>) -> Option<Row> {
    if cache.is_empty() {
        None
    } else {
        Some(cache.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::TimestampGenerator;
    use crate::generators::{AnyColumnGenerator, OrderGenerator};
    use crate::schema::{ColumnConfig, GeneratorKind, GeneratorParams};

    fn simple_row_generator() -> RowGenerator {
        let ts = TimestampGenerator::from_parts(0, 1);
        let cfg = ColumnConfig {
            name: "v".into(),
            type_tag: crate::cell::ColumnTypeTag::Int,
            length: None,
            generator: GeneratorKind::Order,
            params: GeneratorParams {
                min: Some(0.0),
                max: Some(1_000_000.0),
                ..Default::default()
            },
            null_ratio: 0.0,
            is_primary_key: false,
        };
        let col = AnyColumnGenerator::Order(OrderGenerator::new(&cfg).unwrap());
        RowGenerator::from_parts(ts, vec![col])
    }

    #[test]
    fn no_disorder_configured_is_strictly_increasing() {
        let mut gen = RowDataGenerator::new(simple_row_generator(), vec![]);
        let mut last = i64::MIN;
        for _ in 0..20 {
            let row = gen.next_row().unwrap().unwrap();
            assert!(row.timestamp > last);
            last = row.timestamp;
        }
    }

    #[test]
    fn disorder_with_ratio_one_always_delays_and_eventually_releases() {
        let intervals = vec![DisorderInterval {
            time_start: 0,
            time_end: 1_000_000,
            ratio: 1.0,
            latency_range: 5,
        }];
        let mut gen = RowDataGenerator::new(simple_row_generator(), intervals);
        let mut seen = 0;
        for _ in 0..200 {
            if gen.next_row().unwrap().is_some() {
                seen += 1;
            }
        }
        // Every row eventually gets released even though all are delayed.
        assert!(seen > 0);
        let flushed = gen.flush_pending();
        assert!(flushed.len() + seen >= 190);
    }
}
