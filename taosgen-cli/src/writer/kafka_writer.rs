//! Kafka writer via `rdkafka`'s `FutureProducer`: each formatted block's
//! `(key, value)` pairs are produced and the batch's delivery futures are
//! awaited synchronously, so `write` keeps the same blocking signature as
//! every other writer (`spec.md` §4.9).

use super::metrics::LatencyHistogram;
use super::{Writer, WriterState};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use taosgen_format::envelope::{FormatResult, Payload};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct KafkaWriter {
    brokers: String,
    topic: String,
    producer: Option<FutureProducer>,
    state: WriterState,
    metrics: LatencyHistogram,
}

impl KafkaWriter {
    pub fn new(brokers: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            topic: topic.into(),
            producer: None,
            state: WriterState::New,
            metrics: LatencyHistogram::new(),
        }
    }
}

impl Writer for KafkaWriter {
    fn connect(&mut self) -> anyhow::Result<()> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("message.timeout.ms", "5000")
            .create()?;
        self.producer = Some(producer);
        self.state = WriterState::Connected;
        Ok(())
    }

    fn prepare(&mut self) -> anyhow::Result<()> {
        // Topics are created implicitly (or out-of-band via broker config);
        // there is no client-side prepare step for Kafka.
        self.state = WriterState::Prepared;
        Ok(())
    }

    fn write(&mut self, result: &FormatResult) -> anyhow::Result<()> {
        self.state = WriterState::Writing;
        let messages = match &result.payload {
            Payload::Kafka(messages) => messages,
            other => anyhow::bail!("KafkaWriter cannot write a {} payload", payload_kind(other)),
        };
        let producer = self
            .producer
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("KafkaWriter::write called before connect"))?;

        futures::executor::block_on(async {
            for (key, payload) in messages {
                let record = FutureRecord::to(&self.topic).payload(payload).key(key);
                producer
                    .send(record, Timeout::After(DELIVERY_TIMEOUT))
                    .await
                    .map_err(|(err, _)| anyhow::anyhow!("kafka delivery failed: {err}"))?;
            }
            Ok::<_, anyhow::Error>(())
        })?;
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
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

fn payload_kind(payload: &Payload) -> &'static str {
    match payload {
        Payload::Sql(_) => "sql",
        Payload::Stmt(_) => "stmt",
        Payload::Kafka(_) => "kafka",
        Payload::Mqtt(_) => "mqtt",
    }
}
