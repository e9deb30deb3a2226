use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::transform::PayloadTransform;

pub mod packets;
pub mod read_loop;
pub mod topic;

use packets::{
    MAX_FRAME_LEN, build_connect_packet, build_disconnect_packet, build_pingreq_packet,
    build_publish_packet, build_subscribe_packet, frame_len, is_mqtt_packet, parse_connack,
};
use read_loop::{ReadLoopResult, handle_packet};

const CONNACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Subscribes to raw sensor messages and republishes what the transform
/// derives from them.
pub struct MqttClient<T> {
    writer: Mutex<Option<WriteHalf<TcpStream>>>,
    broker_addr: String,
    id: String,
    input_topic: String,
    output_topic: String,
    keep_alive_secs: u16,
    reconnect_delay: Duration,
    transform: T,
    shutdown: watch::Sender<bool>,
    connected_notify: Notify,
}

impl<T> MqttClient<T>
where
    T: PayloadTransform + Send + Sync + 'static,
{
    pub async fn run_forever(config: &RelayConfig, transform: T) -> (Arc<Self>, JoinHandle<()>) {
        let (shutdown, _) = watch::channel(false);
        let client = Arc::new(MqttClient {
            writer: Mutex::new(None),
            broker_addr: config.broker_socket_address(),
            id: config.client_id.clone(),
            input_topic: config.input_topic.clone(),
            output_topic: config.output_topic.clone(),
            keep_alive_secs: config.keep_alive_secs,
            reconnect_delay: config.reconnect_delay,
            transform,
            shutdown,
            connected_notify: Notify::new(),
        });

        let client_clone = client.clone();
        let connection_loop_handle = tokio::spawn(async move {
            client_clone.connection_loop().await;
        });

        (client, connection_loop_handle)
    }

    async fn connection_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            let connected = tokio::select! {
                result = self.connect() => result,
                _ = shutdown.changed() => {
                    info!("Shutdown while connecting.");
                    break;
                }
            };

            match connected {
                Ok(stream) => {
                    let (read_half, write_half) = tokio::io::split(stream);
                    {
                        let mut writer_lock = self.writer.lock().await;
                        *writer_lock = Some(write_half);
                    }

                    if let Err(e) = self.subscribe(&self.input_topic).await {
                        error!(error = %e, "Failed to send SUBSCRIBE");
                    } else {
                        info!(topic = %self.input_topic, "Subscription sent");
                        self.connected_notify.notify_one();

                        tokio::select! {
                            result = self.read_loop(read_half) => match result {
                                Ok(()) => info!("EOF from broker"),
                                Err(e) => error!(error = %e, "Read loop failed"),
                            },
                            result = self.keep_alive_loop() => {
                                if let Err(e) = result {
                                    error!(error = %e, "Keep-alive failed");
                                }
                            }
                            _ = shutdown.changed() => {
                                info!("Shutdown requested. Closing connection.");
                                if let Ok(packet) = build_disconnect_packet() {
                                    let _ = self.write(&packet).await;
                                }
                                self.close_writer().await;
                                break;
                            }
                        }
                    }
                    self.close_writer().await;
                }
                Err(e) => {
                    error!(broker = %self.broker_addr, error = %e, "Connection failed");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {},
                _ = shutdown.changed() => {
                    info!("Shutdown during reconnect delay.");
                    break;
                }
            }
        }
    }

    async fn connect(&self) -> Result<TcpStream, RelayError> {
        let mut stream = TcpStream::connect(&self.broker_addr).await?;
        info!("Connected to {}", self.broker_addr);

        let connect_packet = build_connect_packet(&self.id, self.keep_alive_secs)?;
        stream.write_all(&connect_packet).await?;
        debug!("Connect sent - awaiting ack");

        let mut connack_buf = [0u8; 4];
        tokio::time::timeout(CONNACK_TIMEOUT, stream.read_exact(&mut connack_buf))
            .await
            .map_err(|_| RelayError::Timeout)??;
        parse_connack(&connack_buf)?;
        info!("Connection ACKed");

        Ok(stream)
    }

    async fn read_loop(&self, mut reader: ReadHalf<TcpStream>) -> Result<(), RelayError> {
        let mut buf = [0u8; 1024];
        let mut pending: Vec<u8> = Vec::new();

        debug!("read_loop started");
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            pending.extend_from_slice(&buf[..n]);

            loop {
                let Some(&first) = pending.first() else {
                    break;
                };
                if !is_mqtt_packet(first) {
                    warn!(bytes = pending.len(), "Discarding data that is not MQTT");
                    pending.clear();
                    break;
                }
                let Some(len) = frame_len(&pending)? else {
                    break;
                };
                if len > MAX_FRAME_LEN {
                    return Err(RelayError::Protocol(format!(
                        "frame of {len} bytes exceeds limit"
                    )));
                }
                if pending.len() < len {
                    break;
                }
                let frame: Vec<u8> = pending.drain(..len).collect();
                self.dispatch(&frame).await?;
            }
        }
    }

    async fn dispatch(&self, frame: &[u8]) -> Result<(), RelayError> {
        match handle_packet(&self.transform, &self.output_topic, frame)? {
            ReadLoopResult::Forward { topic, payload } => {
                self.publish(&topic, &payload).await?;
                debug!(%topic, "Forwarded derived message");
            }
            ReadLoopResult::Rejected { topic, error } => {
                warn!(%topic, %error, transform = self.transform.name(), "Dropping message");
            }
            ReadLoopResult::Skipped => {}
            ReadLoopResult::Unknown => {
                warn!("[mqtt] Received packet: {:x?}", frame);
            }
        }
        Ok(())
    }

    async fn keep_alive_loop(&self) -> Result<(), RelayError> {
        let period = Duration::from_secs(u64::from(self.keep_alive_secs.max(2) / 2));
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            debug!("Sending PINGREQ");
            self.write(&build_pingreq_packet()?).await?;
        }
    }

    async fn write(&self, packet: &[u8]) -> Result<(), RelayError> {
        match self.writer.lock().await.as_mut() {
            Some(writer) => Ok(writer.write_all(packet).await?),
            None => Err(RelayError::Protocol("not connected".to_string())),
        }
    }

    async fn close_writer(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }

    pub async fn wait_for_server_setup(&self) {
        self.connected_notify.notified().await;
    }

    pub async fn subscribe(&self, topic: &str) -> Result<(), RelayError> {
        let packet = build_subscribe_packet(topic)?;
        debug!("subscribe packet constructed");
        self.write(&packet).await
    }

    pub async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), RelayError> {
        let packet = build_publish_packet(topic, payload)?;
        self.write(&packet).await
    }

    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
