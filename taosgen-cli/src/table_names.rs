//! Table-name resolution for a super table run (`spec.md` §4.10 step 1):
//! either a deterministic `{prefix}{index}` generator or a fixed list read
//! from a CSV file, one name per line.

use anyhow::{Context, Result};

pub struct TableNameManager {
    names: Vec<String>,
}

impl TableNameManager {
    pub fn generated(prefix: &str, count: usize) -> Self {
        let names = (0..count).map(|i| format!("{prefix}{i}")).collect();
        Self { names }
    }

    pub fn from_csv(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading table name list '{}'", path.display()))?;
        let names = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Splits the table list into `partitions` contiguous, near-equal
    /// shares for assignment to producer threads.
    pub fn partition(&self, partitions: usize) -> Vec<Vec<String>> {
        if partitions == 0 || self.names.is_empty() {
            return vec![];
        }
        let chunk_size = self.names.len().div_ceil(partitions);
        self.names.chunks(chunk_size.max(1)).map(|c| c.to_vec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_follow_prefix_index_convention() {
        let manager = TableNameManager::generated("sensor_", 3);
        assert_eq!(manager.names(), &["sensor_0", "sensor_1", "sensor_2"]);
    }

    #[test]
    fn from_csv_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.csv");
        std::fs::write(&path, "t1\nt2\n\nt3\n").unwrap();
        let manager = TableNameManager::from_csv(&path).unwrap();
        assert_eq!(manager.names(), &["t1", "t2", "t3"]);
    }

    #[test]
    fn partition_covers_every_name_exactly_once() {
        let manager = TableNameManager::generated("t", 10);
        let parts = manager.partition(3);
        let total: usize = parts.iter().map(|p| p.len()).sum();
        assert_eq!(total, 10);
        assert_eq!(parts.len(), 4.min(parts.len())); // chunking may yield fewer than `partitions`
    }
}
