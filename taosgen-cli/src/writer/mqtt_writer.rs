//! MQTT writer via `rumqttc`: publishes are fired on the async `Client`
//! handle and the blocking `Connection` event loop is drained on a
//! background thread so `write` itself stays synchronous, matching every
//! other writer's signature (`spec.md` §4.9).

use super::metrics::LatencyHistogram;
use super::{Writer, WriterState};
use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use taosgen_format::envelope::{FormatResult, Payload};

pub struct MqttWriter {
    host: String,
    port: u16,
    client_id: String,
    client: Option<Client>,
    event_loop_handle: Option<std::thread::JoinHandle<()>>,
    state: WriterState,
    metrics: LatencyHistogram,
}

impl MqttWriter {
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
            client: None,
            event_loop_handle: None,
            state: WriterState::New,
            metrics: LatencyHistogram::new(),
        }
    }
}

impl Writer for MqttWriter {
    fn connect(&mut self) -> anyhow::Result<()> {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(30));
        let (client, mut connection) = Client::new(options, 256);

        let handle = std::thread::Builder::new()
            .name(format!("taosgen-mqtt-{}", self.client_id))
            .spawn(move || {
                for notification in connection.iter() {
                    match notification {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            log::debug!("mqtt connection established");
                        }
                        Ok(_) => {}
                        Err(err) => {
                            log::warn!("mqtt connection error: {err}");
                            break;
                        }
                    }
                }
            })?;

        self.client = Some(client);
        self.event_loop_handle = Some(handle);
        self.state = WriterState::Connected;
        Ok(())
    }

    fn prepare(&mut self) -> anyhow::Result<()> {
        // No broker-side prepare step for MQTT; topics are implicit.
        self.state = WriterState::Prepared;
        Ok(())
    }

    fn write(&mut self, result: &FormatResult) -> anyhow::Result<()> {
        self.state = WriterState::Writing;
        let messages = match &result.payload {
            Payload::Mqtt(messages) => messages,
            other => anyhow::bail!("MqttWriter cannot write a {} payload", payload_kind(other)),
        };
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("MqttWriter::write called before connect"))?;
        for (topic, payload) in messages {
            client.publish(topic, QoS::AtLeastOnce, false, payload.as_bytes())?;
        }
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        if let Some(client) = &self.client {
            client.disconnect()?;
        }
        if let Some(handle) = self.event_loop_handle.take() {
            let _ = handle.join();
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

fn payload_kind(payload: &Payload) -> &'static str {
    match payload {
        Payload::Sql(_) => "sql",
        Payload::Stmt(_) => "stmt",
        Payload::Kafka(_) => "kafka",
        Payload::Mqtt(_) => "mqtt",
    }
}
