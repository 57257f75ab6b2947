//! Run configuration: the YAML file (`spec.md` §6) merged with environment
//! variables and CLI overrides, precedence CLI > env > YAML > defaults.

use crate::cli::Cli;
use crate::compress::CompressionKind;
use anyhow::{Context, Result};
use serde::Deserialize;
use taosgen_core::checkpoint::CheckpointConfig;
use taosgen_core::pacing::TimeIntervalConfig;
use taosgen_core::schema::SuperTableSchema;

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6030
}

/// The sink a super table is driven against; mirrors `spec.md` §4.9's
/// "sink-plugin abstraction" with one variant per supported writer.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Sql {
        database: String,
    },
    Stmt {
        database: String,
        mode: taosgen_format::stmt::StmtMode,
    },
    Kafka {
        brokers: String,
        topic_pattern: String,
        key_pattern: Option<String>,
        records_per_message: Option<usize>,
    },
    Mqtt {
        broker_host: String,
        broker_port: u16,
        topic_pattern: String,
        records_per_message: Option<usize>,
    },
    Filesystem {
        output_dir: String,
        file_prefix: String,
        compression: Option<CompressionKind>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuperTableRunConfig {
    #[serde(flatten)]
    pub schema: SuperTableSchema,
    pub table_count: usize,
    pub rows_per_table: u64,
    #[serde(default)]
    pub table_name_prefix: Option<String>,
    #[serde(default)]
    pub table_name_csv: Option<String>,
    pub sink: SinkConfig,
    #[serde(default)]
    pub pacing: Option<TimeIntervalConfig>,
    #[serde(default)]
    pub checkpoint: Option<CheckpointConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub database: String,
    #[serde(default)]
    pub connection: Option<ConnectionConfig>,
    pub super_tables: Vec<SuperTableRunConfig>,
    #[serde(default = "default_producer_threads")]
    pub producer_threads: usize,
    #[serde(default = "default_consumer_threads")]
    pub consumer_threads: usize,
    #[serde(default = "default_block_count")]
    pub block_count: usize,
    #[serde(default = "default_warmup_ratio")]
    pub queue_warmup_ratio: f64,
    #[serde(default)]
    pub cache_units: usize,
}

fn default_producer_threads() -> usize {
    num_cpus::get().max(1)
}

fn default_consumer_threads() -> usize {
    num_cpus::get().max(1)
}

fn default_block_count() -> usize {
    64
}

fn default_warmup_ratio() -> f64 {
    0.5
}

impl RunConfig {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration file '{}'", path.display()))?;
        let config: RunConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing configuration file '{}'", path.display()))?;
        Ok(config)
    }

    /// Applies environment and CLI overrides to the connection block,
    /// precedence CLI > env > YAML > built-in default.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        let mut conn = self.connection.take().unwrap_or(ConnectionConfig {
            host: default_host(),
            port: default_port(),
            user: None,
            password: None,
        });

        if let Ok(host) = std::env::var("TAOS_HOST") {
            conn.host = host;
        }
        if let Ok(port) = std::env::var("TAOS_PORT") {
            if let Ok(port) = port.parse() {
                conn.port = port;
            }
        }
        if let Ok(user) = std::env::var("TAOS_USER") {
            conn.user = Some(user);
        }
        if let Ok(password) = std::env::var("TAOS_PASSWORD") {
            conn.password = Some(password);
        }

        if let Some(host) = &cli.host {
            conn.host = host.clone();
        }
        if let Some(port) = cli.port {
            conn.port = port;
        }
        if let Some(user) = &cli.user {
            conn.user = Some(user.clone());
        }
        if let Some(password) = &cli.password {
            conn.password = Some(password.clone());
        }

        self.connection = Some(conn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cli(config: std::path::PathBuf) -> Cli {
        Cli {
            config,
            host: None,
            port: None,
            user: None,
            password: None,
            verbose: false,
        }
    }

    #[test]
    fn cli_override_wins_over_env_and_yaml() {
        std::env::set_var("TAOS_HOST", "env-host");
        let mut config = RunConfig {
            database: "db".into(),
            connection: Some(ConnectionConfig {
                host: "yaml-host".into(),
                port: 6030,
                user: None,
                password: None,
            }),
            super_tables: vec![],
            producer_threads: 1,
            consumer_threads: 1,
            block_count: 1,
            queue_warmup_ratio: 0.5,
            cache_units: 0,
        };
        let mut cli = sample_cli("unused.yaml".into());
        cli.host = Some("cli-host".into());
        config.apply_overrides(&cli);
        assert_eq!(config.connection.unwrap().host, "cli-host");
        std::env::remove_var("TAOS_HOST");
    }

    #[test]
    fn env_wins_over_yaml_when_cli_absent() {
        std::env::set_var("TAOS_PORT", "7000");
        let mut config = RunConfig {
            database: "db".into(),
            connection: Some(ConnectionConfig {
                host: "yaml-host".into(),
                port: 6030,
                user: None,
                password: None,
            }),
            super_tables: vec![],
            producer_threads: 1,
            consumer_threads: 1,
            block_count: 1,
            queue_warmup_ratio: 0.5,
            cache_units: 0,
        };
        config.apply_overrides(&sample_cli("unused.yaml".into()));
        assert_eq!(config.connection.unwrap().port, 7000);
        std::env::remove_var("TAOS_PORT");
    }
}
