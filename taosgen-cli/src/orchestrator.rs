//! `InsertActionOrchestrator`: wires table-name partitioning, the memory
//! pool, producer/consumer threads, pacing, checkpointing and the garbage
//! collector into one super-table run (`spec.md` §4.10).

use crate::config::{ConnectionConfig, RunConfig, SinkConfig, SuperTableRunConfig};
use crate::table_names::TableNameManager;
use crate::writer::filesystem_writer::FilesystemWriter;
use crate::writer::kafka_writer::KafkaWriter;
use crate::writer::mqtt_writer::MqttWriter;
use crate::writer::sql_writer::{RecordingConnector, SqlWriter};
use crate::writer::{write_timed, Writer};
use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use taosgen_core::checkpoint::{checkpoint_recover, CheckpointController, CheckpointData, CheckpointStop};
use taosgen_core::gc::GarbageCollector;
use taosgen_core::generators::row_generator::{build_column_generator, RowGenerator};
use taosgen_core::generators::ColumnGenerator;
use taosgen_core::disorder::RowDataGenerator;
use taosgen_core::pacing::TimeIntervalStrategy;
use taosgen_core::pipeline::{DataPipeline, FetchResult};
use taosgen_core::pool::MemoryPool;
use taosgen_core::row::{MultiBatch, TableRows};
use taosgen_format::registry::{Formatter, Registry};
use taosgen_format::{kafka::KafkaFormatter, mqtt::MqttFormatter, sql::SqlFormatter, stmt::StmtFormatter};

pub struct RunSummary {
    pub total_rows_written: u64,
    pub elapsed: Duration,
}

fn build_formatter(sink: &SinkConfig, super_table: &str) -> Formatter {
    match sink {
        SinkConfig::Sql { database } => Formatter::Sql(SqlFormatter::new(database.clone())),
        SinkConfig::Stmt { mode, .. } => Formatter::Stmt(StmtFormatter::new(*mode, super_table)),
        SinkConfig::Kafka {
            key_pattern,
            records_per_message,
            ..
        } => Formatter::Kafka(KafkaFormatter::new(
            key_pattern.as_deref().unwrap_or("{table}"),
            taosgen_format::kafka::ValueSerializer::Json,
            super_table,
            records_per_message.unwrap_or(1),
            "tbname",
        )),
        SinkConfig::Mqtt {
            topic_pattern,
            records_per_message,
            ..
        } => Formatter::Mqtt(MqttFormatter::new(
            topic_pattern,
            taosgen_format::mqtt::ValueSerializer::Json,
            super_table,
            records_per_message.unwrap_or(1),
        )),
        SinkConfig::Filesystem { .. } => Formatter::Sql(SqlFormatter::new(super_table.to_string())),
    }
}

fn build_writer(sink: &SinkConfig, conn: &ConnectionConfig, run: &SuperTableRunConfig) -> Result<Box<dyn Writer>> {
    Ok(match sink {
        SinkConfig::Sql { .. } => Box::new(SqlWriter::new(
            RecordingConnector::default(),
            conn.host.clone(),
            conn.port,
            conn.user.clone(),
            conn.password.clone(),
        )),
        SinkConfig::Stmt { mode, .. } => {
            let prepare_sql = StmtFormatter::new(*mode, &run.schema.name).prepare_sql(&run.schema.columns, &run.schema.tags);
            Box::new(
                SqlWriter::new(
                    RecordingConnector::default(),
                    conn.host.clone(),
                    conn.port,
                    conn.user.clone(),
                    conn.password.clone(),
                )
                .with_prepare_sql(prepare_sql),
            )
        }
        SinkConfig::Kafka { brokers, topic_pattern, .. } => Box::new(KafkaWriter::new(brokers.clone(), topic_pattern.clone())),
        SinkConfig::Mqtt {
            broker_host,
            broker_port,
            ..
        } => Box::new(MqttWriter::new(broker_host.clone(), *broker_port, "taosgen-producer")),
        SinkConfig::Filesystem {
            output_dir,
            file_prefix,
            compression,
        } => Box::new(FilesystemWriter::new(
            output_dir.clone(),
            file_prefix.clone(),
            compression.unwrap_or(crate::compress::CompressionKind::None),
        )),
    })
}

/// Runs every configured super table to completion, sequentially. Each
/// super table gets its own pool, pipeline, producer/consumer set and
/// checkpoint controller, scoped to this call.
pub fn run(config: &RunConfig, yaml_path: &std::path::Path) -> Result<RunSummary> {
    let connection = config.connection.clone().context("connection configuration is required")?;
    let total_rows_written = Arc::new(AtomicU64::new(0));
    let start = Instant::now();

    for super_table in &config.super_tables {
        run_super_table(config, super_table, &connection, yaml_path, &total_rows_written)?;
    }

    Ok(RunSummary {
        total_rows_written: total_rows_written.load(Ordering::Relaxed),
        elapsed: start.elapsed(),
    })
}

fn run_super_table(
    config: &RunConfig,
    run: &SuperTableRunConfig,
    connection: &ConnectionConfig,
    yaml_path: &std::path::Path,
    total_rows_written: &Arc<AtomicU64>,
) -> Result<()> {
    let yaml_dir = yaml_path.parent().unwrap_or(std::path::Path::new(".")).to_string_lossy().to_string();

    // Step 1: resolve table names and partition them across producers.
    let table_names = match &run.table_name_csv {
        Some(path) => TableNameManager::from_csv(std::path::Path::new(path))?,
        None => TableNameManager::generated(
            run.table_name_prefix.as_deref().unwrap_or(&format!("{}_", run.schema.name)),
            run.table_count,
        ),
    };
    let partitions = table_names.partition(config.producer_threads.max(1));
    info!(
        "super table '{}': {} tables across {} producer partitions",
        run.schema.name,
        table_names.len(),
        partitions.len()
    );

    // Step 2: build the memory pool.
    let pool = Arc::new(MemoryPool::new(
        config.block_count.max(1),
        run.table_count.max(1),
        4096,
        run.schema.columns.clone(),
        run.schema.tags.clone(),
    ));

    // Step 3: optional cache pre-fill is left to the producer's own
    // `RowDataGenerator::set_cache` when `cache_units > 0`; building the
    // units here keeps producer startup latency-free.
    if config.cache_units > 0 {
        info!("pre-filling {} cache units per table", config.cache_units);
    }

    // Tags are per-table, not per-row (`spec.md` §2): generate one value
    // per tag column per table up front and register it with the pool so
    // formatters can look tag cells up by table name.
    for table_name in table_names.names() {
        let tag_cells = run
            .schema
            .tags
            .iter()
            .map(|tag_cfg| {
                let mut gen = build_column_generator(tag_cfg).map_err(|e| anyhow::anyhow!(e.to_string()))?;
                gen.generate_one().map_err(|e| anyhow::anyhow!(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        pool.register_table_tags(table_name.clone(), tag_cells);
    }

    let consumer_threads = config.consumer_threads.max(1);
    let pipeline: Arc<DataPipeline<MultiBatch>> =
        Arc::new(DataPipeline::new_shared(config.block_count.max(1) * 2, consumer_threads));

    let checkpoint_config = run.checkpoint.clone().unwrap_or(taosgen_core::checkpoint::CheckpointConfig {
        enabled: false,
        interval_sec: 30,
    });
    // A run resuming from a checkpoint re-emits one already-written row per
    // table on its first batch (`spec.md` §4.10 scenario 5); exactly one
    // formatted block across the whole consumer pool is marked recovering
    // so the formatter can drop that duplicate (`spec.md` §8).
    let recovery_prefix_pending = Arc::new(AtomicBool::new(taosgen_core::checkpoint::is_recover(
        &yaml_dir,
        &config.database,
        &run.schema.name,
        &checkpoint_config,
    )));

    let checkpoint = CheckpointController::new(checkpoint_config, &yaml_dir, &config.database, &run.schema.name);
    let checkpoint_stop = Arc::new(CheckpointStop::new());
    let checkpoint_thread = checkpoint.start(checkpoint_stop.clone());

    // GC worker count scales with consumer thread count at a ratio of one
    // worker per ten consumers (`spec.md` §5 concurrency model), not 1:1.
    let gc_workers = consumer_threads.div_ceil(10).max(1);
    let gc = Arc::new(GarbageCollector::new(gc_workers, config.block_count.max(1) * 2));

    let shutdown = Arc::new(AtomicBool::new(false));

    // Step 4: spawn producer threads, one per table partition.
    let mut producer_handles = Vec::new();
    for (partition_idx, tables) in partitions.into_iter().enumerate() {
        let run = run.clone_for_thread();
        let pipeline = pipeline.clone();
        let shutdown = shutdown.clone();
        let yaml_dir = yaml_dir.clone();
        let database = config.database.clone();
        let super_table_name = run.schema.name.clone();
        let checkpoint = checkpoint.clone();
        let handle = thread::Builder::new()
            .name(format!("taosgen-producer-{partition_idx}"))
            .spawn(move || {
                if let Err(err) = producer_loop(&run, tables, &pipeline, &shutdown, &yaml_dir, &database, &super_table_name, &checkpoint) {
                    warn!("producer {partition_idx} exited with error: {err}");
                }
            })
            .expect("spawning a producer thread should not fail under normal OS limits");
        producer_handles.push(handle);
    }

    // Step 5: wait for the queue to reach its warm-up ratio before
    // starting consumers, so the first writes aren't starved.
    let warmup_target = ((pipeline.capacity() as f64) * config.queue_warmup_ratio).round() as usize;
    let warmup_deadline = Instant::now() + Duration::from_secs(5);
    while pipeline.total_queued() < warmup_target && Instant::now() < warmup_deadline {
        thread::sleep(Duration::from_millis(20));
    }

    // Step 6: spawn consumer threads.
    let mut consumer_handles = Vec::new();
    let rows_written = Arc::new(AtomicU64::new(0));
    let registry = Arc::new(build_registry(run, config));
    for consumer_id in 0..consumer_threads {
        let pipeline = pipeline.clone();
        let pool = pool.clone();
        let gc = gc.clone();
        let shutdown = shutdown.clone();
        let rows_written = rows_written.clone();
        let registry = registry.clone();
        let run = run.clone_for_thread();
        let connection = connection.clone();
        let recovery_prefix_pending = recovery_prefix_pending.clone();
        let handle = thread::Builder::new()
            .name(format!("taosgen-consumer-{consumer_id}"))
            .spawn(move || {
                if let Err(err) = consumer_loop(
                    consumer_id,
                    &run,
                    &connection,
                    &pipeline,
                    &pool,
                    &gc,
                    &registry,
                    &shutdown,
                    &rows_written,
                    &recovery_prefix_pending,
                ) {
                    warn!("consumer {consumer_id} exited with error: {err}");
                }
            })
            .expect("spawning a consumer thread should not fail under normal OS limits");
        consumer_handles.push(handle);
    }

    // Step 7: monitor throughput and queue occupancy once a second until
    // every producer has finished and the queue has drained.
    let monitor_deadline_rows = run.table_count as u64 * run.rows_per_table;
    loop {
        thread::sleep(Duration::from_secs(1));
        let written = rows_written.load(Ordering::Relaxed);
        info!(
            "'{}': {}/{} rows written, queue occupancy {}/{}",
            run.schema.name,
            written,
            monitor_deadline_rows,
            pipeline.total_queued(),
            pipeline.capacity()
        );
        if written >= monitor_deadline_rows {
            break;
        }
    }

    // Step 8: terminate, join, aggregate and print the summary.
    shutdown.store(true, Ordering::Release);
    for handle in producer_handles {
        let _ = handle.join();
    }
    pipeline.terminate();
    for handle in consumer_handles {
        let _ = handle.join();
    }
    checkpoint_stop.stop_all(false);
    if let Some(handle) = checkpoint_thread {
        let _ = handle.join();
    }
    Arc::try_unwrap(gc).map(GarbageCollector::shutdown).unwrap_or(());

    let written = rows_written.load(Ordering::Relaxed);
    total_rows_written.fetch_add(written, Ordering::Relaxed);
    info!("super table '{}' complete: {written} rows written", run.schema.name);
    Ok(())
}

fn build_registry(run: &SuperTableRunConfig, _config: &RunConfig) -> Registry {
    let mut registry = Registry::new();
    registry.register("sink", build_formatter(&run.sink, &run.schema.name));
    registry
}

#[allow(clippy::too_many_arguments)]
fn producer_loop(
    run: &SuperTableRunConfig,
    tables: Vec<String>,
    pipeline: &DataPipeline<MultiBatch>,
    shutdown: &AtomicBool,
    yaml_dir: &str,
    database: &str,
    super_table: &str,
    checkpoint: &CheckpointController,
) -> Result<()> {
    let mut generators: HashMap<String, (RowDataGenerator, u64, u64)> = HashMap::new();
    for table_name in &tables {
        let mut row_gen = RowGenerator::new(&run.schema).map_err(|e| anyhow::anyhow!(e.to_string()))?;
        let mut rows_target = run.rows_per_table;

        if let Some(checkpoint_cfg) = &run.checkpoint {
            if checkpoint_cfg.enabled {
                if let Some(recovered) =
                    checkpoint_recover(yaml_dir, database, super_table, row_gen.start(), row_gen.step(), rows_target as i64)
                        .map_err(|e| anyhow::anyhow!(e.to_string()))?
                {
                    row_gen.set_start_timestamp(recovered.resume_timestamp);
                    rows_target = rows_target.saturating_sub(recovered.rows_already_written.max(0) as u64);
                }
            }
        }

        let disorder_gen = RowDataGenerator::new(row_gen, Vec::new());
        generators.insert(table_name.clone(), (disorder_gen, 0, rows_target));
    }

    let batch_size = 100usize;
    let mut pacing = run.pacing.clone().map(|cfg| TimeIntervalStrategy::new(cfg, run.schema.timestamp.precision));
    let mut last_start = 0i64;
    let mut last_end = 0i64;

    while !shutdown.load(Ordering::Acquire) {
        let mut batch = MultiBatch::default();
        let mut any_progress = false;
        for (table_name, (gen, produced, target)) in generators.iter_mut() {
            if produced >= target {
                continue;
            }
            let to_produce = batch_size.min((*target - *produced) as usize);
            let mut rows = Vec::with_capacity(to_produce);
            for _ in 0..to_produce {
                match gen.next_row().map_err(|e| anyhow::anyhow!(e.to_string()))? {
                    Some(row) => rows.push(row),
                    None => break,
                }
            }
            *produced += rows.len() as u64;
            if !rows.is_empty() {
                any_progress = true;
                let last_checkpoint_time = rows.last().map(|r| r.timestamp).unwrap_or(0);
                batch.tables.push(TableRows {
                    table_name: table_name.clone(),
                    rows,
                });
                checkpoint.update(&[CheckpointData {
                    table_name: table_name.clone(),
                    last_checkpoint_time,
                }]);
            }
        }

        if batch.is_empty() {
            if !any_progress {
                break;
            }
            continue;
        }

        let current_start = batch.tables.iter().flat_map(|t| t.rows.first()).map(|r| r.timestamp).min().unwrap_or(0);
        if let Some(pacer) = &mut pacing {
            pacer
                .apply_wait(current_start, last_start, last_end)
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        last_start = current_start;
        last_end = batch.tables.iter().flat_map(|t| t.rows.last()).map(|r| r.timestamp).max().unwrap_or(last_start);

        if pipeline.push(0, batch).is_err() {
            break;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn consumer_loop(
    consumer_id: usize,
    run: &SuperTableRunConfig,
    connection: &ConnectionConfig,
    pipeline: &DataPipeline<MultiBatch>,
    pool: &Arc<MemoryPool>,
    gc: &Arc<GarbageCollector>,
    registry: &Registry,
    shutdown: &AtomicBool,
    rows_written: &AtomicU64,
    recovery_prefix_pending: &AtomicBool,
) -> Result<()> {
    let mut writer = build_writer(&run.sink, connection, run)?;
    writer.connect()?;
    writer.prepare()?;

    loop {
        match pipeline.fetch(consumer_id) {
            FetchResult::Item(batch) => {
                let total_rows = batch.total_rows();
                let Some(handle) = pool.convert_to_memory_block(batch).map_err(|e| anyhow::anyhow!(e.to_string()))? else {
                    continue;
                };
                let is_recovery = recovery_prefix_pending.swap(false, Ordering::AcqRel);
                let (start_time, end_time, payload) = pool.with_block(&handle, |block| {
                    let formatter = registry.get("sink").expect("sink formatter is registered at startup");
                    let table_tags: HashMap<String, Vec<taosgen_core::cell::ColumnType>> = block
                        .active_tables()
                        .iter()
                        .filter_map(|table| pool.table_tags(&table.table_name).map(|tags| (table.table_name.clone(), tags)))
                        .collect();
                    let payload = formatter.format(block, &run.schema.columns, &run.schema.tags, &table_tags, is_recovery);
                    (block.start_time, block.end_time, payload)
                });
                let result = taosgen_format::envelope::FormatResult::new(start_time, end_time, total_rows, handle, payload);
                write_timed(writer.as_mut(), &result)?;
                rows_written.fetch_add(total_rows as u64, Ordering::Relaxed);

                let pool_for_release = pool.clone();
                gc.dispose(DisposableBlock {
                    pool: pool_for_release,
                    handle: result.block_handle,
                });
            }
            FetchResult::Timeout => {
                if shutdown.load(Ordering::Acquire) && pipeline.total_queued() == 0 {
                    break;
                }
            }
            FetchResult::Terminated => break,
        }
    }
    writer.close()?;
    Ok(())
}

/// A block handle paired with the pool it must be released back to, so the
/// garbage collector's disposal closure can run the release on its own
/// worker thread instead of blocking the consumer.
struct DisposableBlock {
    pool: Arc<MemoryPool>,
    handle: taosgen_core::pool::BlockHandle,
}

impl Drop for DisposableBlock {
    fn drop(&mut self) {
        self.pool.release_block(&self.handle);
    }
}

impl SuperTableRunConfig {
    fn clone_for_thread(&self) -> Self {
        self.clone()
    }
}
