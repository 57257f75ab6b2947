//! Checkpoint controller: periodically persists the slowest table's write
//! progress so a run can resume, grounded on
//! `original_source/src/actions/core/checkpoint/src/CheckpointAction.cpp`.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    pub enabled: bool,
    pub interval_sec: u64,
}

/// Progress for a single table, as reported by a producer after each write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointData {
    pub table_name: String,
    pub last_checkpoint_time: i64,
}

/// What's recovered from a checkpoint file: where the next write for the
/// slowest table should resume, and how many rows it already wrote.
#[derive(Debug, Clone)]
pub struct RecoveredProgress {
    pub table_name: String,
    pub resume_timestamp: i64,
    pub rows_already_written: i64,
}

fn checkpoint_file_path(yaml_cfg_dir: &str, database: &str, super_table: &str) -> PathBuf {
    PathBuf::from(format!("{yaml_cfg_dir}_{database}_{super_table}_checkpoints.json"))
}

/// Returns `true` if a checkpoint file already exists for this run, meaning
/// this is a resume rather than a fresh start.
pub fn is_recover(yaml_cfg_dir: &str, database: &str, super_table: &str, config: &CheckpointConfig) -> bool {
    if !config.enabled {
        return false;
    }
    checkpoint_file_path(yaml_cfg_dir, database, super_table).exists()
}

/// Reads a checkpoint file, if present, and computes where generation for the
/// slowest table should resume. Returns `None` when there is no checkpoint,
/// or when the checkpoint already covers the requested `per_table_rows`.
pub fn checkpoint_recover(
    yaml_cfg_dir: &str,
    database: &str,
    super_table: &str,
    start_timestamp: i64,
    timestamp_step: i64,
    per_table_rows: i64,
) -> Result<Option<RecoveredProgress>, CheckpointError> {
    let path = checkpoint_file_path(yaml_cfg_dir, database, super_table);
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Ok(None);
    };
    let json: serde_json::Value = serde_json::from_str(&content)?;
    let table_name = json
        .get("table_name")
        .and_then(|v| v.as_str())
        .ok_or(CheckpointError::MalformedFile)?
        .to_string();
    let last_checkpoint_time = json
        .get("last_checkpoint_time")
        .and_then(|v| v.as_i64())
        .ok_or(CheckpointError::MalformedFile)?;

    let write_count = (last_checkpoint_time - start_timestamp) / timestamp_step;
    if per_table_rows <= write_count {
        return Ok(None);
    }
    Ok(Some(RecoveredProgress {
        table_name,
        resume_timestamp: last_checkpoint_time,
        rows_already_written: write_count,
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("malformed checkpoint file")]
    MalformedFile,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

struct Inner {
    map: Mutex<HashMap<String, CheckpointData>>,
    config: CheckpointConfig,
    file_path: PathBuf,
}

/// Runs a background timer thread that periodically snapshots the
/// least-progressed table's checkpoint to disk, and deletes the file on a
/// clean stop (but keeps it on an interrupted stop, so the next run can
/// recover).
#[derive(Clone)]
pub struct CheckpointController {
    inner: Arc<Inner>,
}

impl CheckpointController {
    pub fn new(config: CheckpointConfig, yaml_cfg_dir: &str, database: &str, super_table: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                map: Mutex::new(HashMap::new()),
                file_path: checkpoint_file_path(yaml_cfg_dir, database, super_table),
                config,
            }),
        }
    }

    /// Spawns the timer thread; a no-op if checkpointing is disabled. The
    /// returned handle's `join` blocks until `stop` is called and the thread
    /// observes it.
    pub fn start(&self, stop: Arc<CheckpointStop>) -> Option<std::thread::JoinHandle<()>> {
        if !self.inner.config.enabled {
            return None;
        }
        let inner = self.inner.clone();
        info!(
            "starting checkpoint timer with an interval of {} seconds",
            inner.config.interval_sec
        );
        Some(std::thread::spawn(move || run_timer(inner, stop)))
    }

    pub fn update(&self, updates: &[CheckpointData]) {
        if updates.is_empty() {
            return;
        }
        let mut map = self.inner.map.lock().expect("checkpoint map mutex poisoned");
        for data in updates {
            map.insert(data.table_name.clone(), data.clone());
        }
    }

    fn save(&self) {
        let map = self.inner.map.lock().expect("checkpoint map mutex poisoned");
        if map.is_empty() {
            info!("no progress data to save");
            return;
        }
        let Some(min_entry) = map.values().min_by_key(|d| d.last_checkpoint_time) else {
            return;
        };
        let payload = serde_json::json!({
            "table_name": min_entry.table_name,
            "last_checkpoint_time": min_entry.last_checkpoint_time,
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                if let Err(e) = std::fs::write(&self.inner.file_path, text) {
                    error!("failed to open file for writing: {e}");
                } else {
                    info!(
                        "saved progress for table '{}' at timestamp {}",
                        min_entry.table_name, min_entry.last_checkpoint_time
                    );
                }
            }
            Err(e) => error!("failed to serialize checkpoint: {e}"),
        }
    }

    fn delete(&self) {
        let mut map = self.inner.map.lock().expect("checkpoint map mutex poisoned");
        let _ = std::fs::remove_file(&self.inner.file_path);
        map.clear();
        info!("deleted checkpoint file and cleared in-memory checkpoint data");
    }
}

/// Shared stop signal: `stop` alone lets the timer finish its loop and clean
/// up the file; `stop_interrupted` additionally preserves the file so the
/// next run can recover from it.
pub struct CheckpointStop {
    stop: std::sync::atomic::AtomicBool,
    interrupt: std::sync::atomic::AtomicBool,
    condvar: std::sync::Condvar,
    mutex: Mutex<()>,
}

impl Default for CheckpointStop {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckpointStop {
    pub fn new() -> Self {
        Self {
            stop: std::sync::atomic::AtomicBool::new(false),
            interrupt: std::sync::atomic::AtomicBool::new(false),
            condvar: std::sync::Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    pub fn stop_all(&self, is_interrupt: bool) {
        if is_interrupt {
            self.interrupt.store(true, std::sync::atomic::Ordering::Release);
            warn!("checkpoint controller received interrupt signal, will not delete checkpoints");
        }
        self.stop.store(true, std::sync::atomic::Ordering::Release);
        self.condvar.notify_all();
    }

    fn is_stopped(&self) -> bool {
        self.stop.load(std::sync::atomic::Ordering::Acquire)
    }

    fn is_interrupted(&self) -> bool {
        self.interrupt.load(std::sync::atomic::Ordering::Acquire)
    }
}

fn run_timer(inner: Arc<Inner>, stop: Arc<CheckpointStop>) {
    let interval = Duration::from_secs(inner.config.interval_sec.max(1));
    let controller = CheckpointController { inner: inner.clone() };
    loop {
        let guard = stop.mutex.lock().expect("checkpoint stop mutex poisoned");
        let (_guard, _timeout) = stop
            .condvar
            .wait_timeout(guard, interval)
            .expect("checkpoint stop mutex poisoned");
        if stop.is_stopped() {
            break;
        }
        controller.save();
    }
    if !stop.is_interrupted() {
        controller.delete();
    }
    info!("checkpoint timer stopped");
}

pub fn checkpoint_file_exists(path: &Path) -> bool {
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn recover_returns_none_when_no_file() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("run").to_string_lossy().to_string();
        let result = checkpoint_recover(&prefix, "db", "st", 0, 1000, 100).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn recover_computes_resume_point() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("run").to_string_lossy().to_string();
        let path = checkpoint_file_path(&prefix, "db", "st");
        std::fs::write(
            &path,
            r#"{"table_name": "t0", "last_checkpoint_time": 5000}"#,
        )
        .unwrap();

        let result = checkpoint_recover(&prefix, "db", "st", 0, 1000, 100)
            .unwrap()
            .unwrap();
        assert_eq!(result.table_name, "t0");
        assert_eq!(result.resume_timestamp, 5000);
        assert_eq!(result.rows_already_written, 5);
    }

    #[test]
    fn recover_returns_none_when_already_complete() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("run").to_string_lossy().to_string();
        let path = checkpoint_file_path(&prefix, "db", "st");
        std::fs::write(
            &path,
            r#"{"table_name": "t0", "last_checkpoint_time": 100000}"#,
        )
        .unwrap();

        let result = checkpoint_recover(&prefix, "db", "st", 0, 1000, 10).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn save_picks_least_progressed_table() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("run").to_string_lossy().to_string();
        let controller = CheckpointController::new(
            CheckpointConfig {
                enabled: true,
                interval_sec: 1,
            },
            &prefix,
            "db",
            "st",
        );
        controller.update(&[
            CheckpointData {
                table_name: "fast".into(),
                last_checkpoint_time: 9000,
            },
            CheckpointData {
                table_name: "slow".into(),
                last_checkpoint_time: 1000,
            },
        ]);
        controller.save();
        let content = std::fs::read_to_string(checkpoint_file_path(&prefix, "db", "st")).unwrap();
        assert!(content.contains("slow"));
    }

    #[test]
    fn stop_all_interrupted_preserves_file() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("run").to_string_lossy().to_string();
        let controller = CheckpointController::new(
            CheckpointConfig {
                enabled: true,
                interval_sec: 3600,
            },
            &prefix,
            "db",
            "st",
        );
        controller.update(&[CheckpointData {
            table_name: "t0".into(),
            last_checkpoint_time: 42,
        }]);
        controller.save();
        let stop = Arc::new(CheckpointStop::new());
        let handle = controller.start(stop.clone()).unwrap();
        stop.stop_all(true);
        handle.join().unwrap();
        assert!(checkpoint_file_path(&prefix, "db", "st").exists());
    }
}
