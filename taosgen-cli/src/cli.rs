//! Command-line surface (`spec.md` §6): connection overrides, the YAML
//! configuration path, and the verbosity toggle. Values here win over
//! environment variables and the YAML file (see [`crate::config`]).

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "taosgen")]
#[command(version)]
#[command(about = "Synthetic time-series data generator and load driver", long_about = None)]
pub struct Cli {
    /// Path to the run's YAML configuration file.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: std::path::PathBuf,

    /// TDengine/MQTT/Kafka host, overriding `TAOS_HOST` and the YAML value.
    #[arg(long)]
    pub host: Option<String>,

    /// Port, overriding `TAOS_PORT` and the YAML value.
    #[arg(long)]
    pub port: Option<u16>,

    /// Username, overriding `TAOS_USER` and the YAML value.
    #[arg(long)]
    pub user: Option<String>,

    /// Password, overriding `TAOS_PASSWORD` and the YAML value.
    #[arg(long)]
    pub password: Option<String>,

    /// Enable debug-level logging.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
