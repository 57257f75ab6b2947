//! Filesystem writer: appends each formatted block's text to a partitioned
//! output file under `output_dir`, optionally compressed (`spec.md` §4.9).
//! Exists as a sink for local testing and CI fixtures; not a production
//! durability target.

use super::metrics::LatencyHistogram;
use super::{Writer, WriterState};
use crate::compress::{compressor_for, CompressionKind, Compressor};
use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;
use taosgen_format::envelope::{FormatResult, Payload};

pub struct FilesystemWriter {
    output_dir: PathBuf,
    file_prefix: String,
    compression: CompressionKind,
    compressor: Box<dyn Compressor>,
    file: Option<File>,
    state: WriterState,
    metrics: LatencyHistogram,
}

impl FilesystemWriter {
    pub fn new(output_dir: impl Into<PathBuf>, file_prefix: impl Into<String>, compression: CompressionKind) -> Self {
        Self {
            output_dir: output_dir.into(),
            file_prefix: file_prefix.into(),
            compression,
            compressor: compressor_for(compression),
            file: None,
            state: WriterState::New,
            metrics: LatencyHistogram::new(),
        }
    }

    fn extension(&self) -> &'static str {
        match self.compression {
            CompressionKind::None => "txt",
            CompressionKind::Gzip => "gz",
            CompressionKind::Lz4 => "lz4",
            CompressionKind::Zstd => "zst",
        }
    }
}

impl Writer for FilesystemWriter {
    fn connect(&mut self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        self.state = WriterState::Connected;
        Ok(())
    }

    fn prepare(&mut self) -> anyhow::Result<()> {
        let path = self
            .output_dir
            .join(format!("{}.{}", self.file_prefix, self.extension()));
        self.file = Some(File::create(path)?);
        self.state = WriterState::Prepared;
        Ok(())
    }

    fn write(&mut self, result: &FormatResult) -> anyhow::Result<()> {
        self.state = WriterState::Writing;
        let text = match &result.payload {
            Payload::Sql(text) => text.clone(),
            Payload::Kafka(messages) | Payload::Mqtt(messages) => {
                messages.iter().map(|(_, v)| v.as_str()).collect::<Vec<_>>().join("\n")
            }
            Payload::Stmt(_) => anyhow::bail!("FilesystemWriter cannot write a stmt payload"),
        };
        let encoded = self.compressor.compress(text.as_bytes())?;
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("FilesystemWriter::write called before prepare"))?;
        file.write_all(&encoded)?;
        file.write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
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
