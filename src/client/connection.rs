//! Broker connection
//!
//! A background task owns the socket. It sends CONNECT, waits for CONNACK,
//! subscribes to the whole device tree and then loops over outgoing commands,
//! incoming packets and the keep-alive timer. Every PUBLISH it receives goes
//! straight into the capture store.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::capture::CaptureStore;
use crate::codec::{Decoder, Encoder};
use crate::config::BrokerConfig;
use crate::error::HarnessError;
use crate::protocol::{Connect, ConnectReturnCode, Incoming, Outgoing, Publish, QoS, Subscribe};

/// How long `disconnect()` waits for the task to flush DISCONNECT
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Packet id of the single SUBSCRIBE sent per session
const SUBSCRIBE_PACKET_ID: u16 = 1;

/// Connection status as seen by the test task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The last session ended with an error
    Failed,
}

/// Message to send to the connection task
#[derive(Debug)]
enum Command {
    Publish { topic: String, payload: Bytes },
    Shutdown,
}

struct SessionTask {
    command_tx: mpsc::Sender<Command>,
    handle: JoinHandle<()>,
}

/// Handle on one broker session at a time
pub struct Connection {
    broker: BrokerConfig,
    /// Device topic root, without trailing slash
    root: String,
    poll_interval: Duration,
    store: Arc<CaptureStore>,
    status: Arc<RwLock<ConnectionStatus>>,
    task: Mutex<Option<SessionTask>>,
}

impl Connection {
    pub fn new(
        broker: BrokerConfig,
        root: impl Into<String>,
        poll_interval: Duration,
        store: Arc<CaptureStore>,
    ) -> Self {
        Self {
            broker,
            root: root.into(),
            poll_interval,
            store,
            status: Arc::new(RwLock::new(ConnectionStatus::Disconnected)),
            task: Mutex::new(None),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Start a session and wait until it is established.
    ///
    /// Returns `false` if the broker is unreachable, rejects the CONNECT, or
    /// the session is not up within `connect_timeout`. A previous session is
    /// torn down first.
    pub async fn connect(&self) -> bool {
        if self.is_connected() {
            return true;
        }
        self.disconnect().await;

        *self.status.write() = ConnectionStatus::Connecting;
        info!("Connecting to {}", self.broker.address());

        let (command_tx, command_rx) = mpsc::channel(self.broker.command_capacity);
        let handle = tokio::spawn(Self::run_session(
            self.broker.clone(),
            self.root.clone(),
            self.store.clone(),
            self.status.clone(),
            command_rx,
        ));
        *self.task.lock() = Some(SessionTask { command_tx, handle });

        let deadline = Instant::now() + self.broker.connect_timeout;
        loop {
            match self.status() {
                ConnectionStatus::Connected => return true,
                ConnectionStatus::Connecting if Instant::now() < deadline => {
                    tokio::time::sleep(self.poll_interval).await;
                }
                ConnectionStatus::Connecting => {
                    error!(
                        "Connection to {} not established within {:?}",
                        self.broker.address(),
                        self.broker.connect_timeout
                    );
                    self.abort();
                    *self.status.write() = ConnectionStatus::Failed;
                    return false;
                }
                ConnectionStatus::Failed | ConnectionStatus::Disconnected => {
                    self.abort();
                    return false;
                }
            }
        }
    }

    /// Stop the session task, sending DISCONNECT if it is still connected.
    /// Safe to call any number of times.
    pub async fn disconnect(&self) {
        let task = self.task.lock().take();
        let Some(SessionTask {
            command_tx,
            mut handle,
        }) = task
        else {
            return;
        };

        let _ = command_tx.try_send(Command::Shutdown);
        drop(command_tx);

        if timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
            warn!("Connection task did not stop in time, aborting");
            handle.abort();
        }

        *self.status.write() = ConnectionStatus::Disconnected;
        info!("Disconnected from {}", self.broker.address());
    }

    /// Queue a QoS 0 PUBLISH to `<root>/<subtopic>`.
    ///
    /// Failures are logged and otherwise ignored.
    pub fn publish(&self, subtopic: &str, payload: impl Into<Bytes>) {
        let topic = format!("{}/{}", self.root, subtopic);

        if !self.is_connected() {
            warn!("Not connected, dropping publish to {}", topic);
            return;
        }

        let Some(command_tx) = self.task.lock().as_ref().map(|t| t.command_tx.clone()) else {
            warn!("No connection task, dropping publish to {}", topic);
            return;
        };

        debug!("Queueing publish to {}", topic);
        if let Err(e) = command_tx.try_send(Command::Publish {
            topic: topic.clone(),
            payload: payload.into(),
        }) {
            warn!("Failed to queue publish to {}: {}", topic, e);
        }
    }

    fn abort(&self) {
        if let Some(task) = self.task.lock().take() {
            task.handle.abort();
        }
    }

    async fn run_session(
        broker: BrokerConfig,
        root: String,
        store: Arc<CaptureStore>,
        status: Arc<RwLock<ConnectionStatus>>,
        mut command_rx: mpsc::Receiver<Command>,
    ) {
        match Self::connect_and_run(&broker, &root, &store, &status, &mut command_rx).await {
            Ok(()) => {
                debug!("Session with {} closed", broker.address());
                *status.write() = ConnectionStatus::Disconnected;
            }
            Err(e) => {
                error!("Session with {} failed: {}", broker.address(), e);
                *status.write() = ConnectionStatus::Failed;
            }
        }
    }

    async fn connect_and_run(
        broker: &BrokerConfig,
        root: &str,
        store: &CaptureStore,
        status: &RwLock<ConnectionStatus>,
        command_rx: &mut mpsc::Receiver<Command>,
    ) -> Result<(), HarnessError> {
        let stream = timeout(broker.connect_timeout, TcpStream::connect(broker.address()))
            .await
            .map_err(|_| HarnessError::Timeout)?
            .map_err(|e| HarnessError::Connection(e.to_string()))?;
        let _ = stream.set_nodelay(true);

        debug!("TCP connected to {}", broker.address());

        let encoder = Encoder::new();
        let decoder = Decoder::new();
        let (mut read_half, mut write_half) = stream.into_split();
        let mut buf = BytesMut::new();
        let mut read_buf = BytesMut::with_capacity(4096);

        let connect = Outgoing::Connect(Connect {
            client_id: broker.client_id.clone(),
            clean_session: true,
            keep_alive: broker.keep_alive,
            username: broker.username.clone(),
            password: broker.password.as_ref().map(|p| Bytes::from(p.clone())),
        });
        send_packet(&mut write_half, &encoder, &mut buf, &connect).await?;

        debug!("CONNECT sent");

        let packet = timeout(
            broker.connect_timeout,
            read_packet(&mut read_half, &decoder, &mut read_buf),
        )
        .await
        .map_err(|_| HarnessError::Timeout)??;

        match packet {
            Incoming::ConnAck(connack) if connack.return_code == ConnectReturnCode::Accepted => {
                info!(
                    "Connected to {} (session_present={})",
                    broker.address(),
                    connack.session_present
                );
            }
            Incoming::ConnAck(connack) => return Err(HarnessError::Rejected(connack.return_code)),
            other => {
                return Err(HarnessError::Connection(format!(
                    "expected CONNACK, got {}",
                    other.packet_type()
                )))
            }
        }

        *status.write() = ConnectionStatus::Connected;

        let filter = format!("{}/#", root);
        let subscribe = Outgoing::Subscribe(Subscribe {
            packet_id: SUBSCRIBE_PACKET_ID,
            filter: filter.clone(),
            qos: QoS::AtMostOnce,
        });
        send_packet(&mut write_half, &encoder, &mut buf, &subscribe).await?;

        debug!("Subscribed to {}", filter);

        let keepalive_enabled = broker.keep_alive > 0;
        let keepalive_interval = Duration::from_secs(u64::from(broker.keep_alive.max(1)));
        let mut keepalive_timer = tokio::time::interval(keepalive_interval);
        keepalive_timer.reset();

        loop {
            tokio::select! {
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(Command::Publish { topic, payload }) => {
                            let publish = Outgoing::Publish(Publish {
                                topic,
                                payload,
                                ..Default::default()
                            });
                            buf.clear();
                            match encoder.encode(&publish, &mut buf) {
                                Ok(()) => write_half.write_all(&buf).await?,
                                Err(e) => warn!("Dropping publish: {}", e),
                            }
                        }
                        Some(Command::Shutdown) | None => {
                            let _ = send_packet(&mut write_half, &encoder, &mut buf, &Outgoing::Disconnect).await;
                            let _ = write_half.shutdown().await;
                            return Ok(());
                        }
                    }
                }

                result = read_half.read_buf(&mut read_buf) => {
                    if result? == 0 {
                        return Err(HarnessError::Connection("connection closed by broker".to_string()));
                    }

                    while let Some((packet, consumed)) = decoder.decode(&read_buf[..])? {
                        read_buf.advance(consumed);
                        match packet {
                            Incoming::Publish(publish) => {
                                store.record(&publish.topic, &publish.payload);

                                if publish.qos == QoS::AtLeastOnce {
                                    if let Some(packet_id) = publish.packet_id {
                                        let puback = Outgoing::PubAck { packet_id };
                                        send_packet(&mut write_half, &encoder, &mut buf, &puback).await?;
                                    }
                                }
                            }
                            Incoming::SubAck(suback) => {
                                if suback.has_failure() {
                                    warn!("Subscription to {} rejected by broker", filter);
                                } else {
                                    debug!("SUBACK received");
                                }
                            }
                            Incoming::ConnAck(_) => {
                                warn!("Ignoring CONNACK on an established session");
                            }
                            Incoming::PingResp => {
                                debug!("PINGRESP received");
                            }
                        }
                    }
                }

                _ = keepalive_timer.tick(), if keepalive_enabled => {
                    send_packet(&mut write_half, &encoder, &mut buf, &Outgoing::PingReq).await?;
                    debug!("PINGREQ sent");
                }
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.handle.abort();
        }
    }
}

async fn send_packet(
    writer: &mut OwnedWriteHalf,
    encoder: &Encoder,
    buf: &mut BytesMut,
    packet: &Outgoing,
) -> Result<(), HarnessError> {
    buf.clear();
    encoder.encode(packet, buf)?;
    writer.write_all(buf).await?;
    Ok(())
}

/// Read until one complete packet is buffered. Leftover bytes stay in `read_buf`.
async fn read_packet(
    reader: &mut OwnedReadHalf,
    decoder: &Decoder,
    read_buf: &mut BytesMut,
) -> Result<Incoming, HarnessError> {
    loop {
        if let Some((packet, consumed)) = decoder.decode(&read_buf[..])? {
            read_buf.advance(consumed);
            return Ok(packet);
        }
        if reader.read_buf(read_buf).await? == 0 {
            return Err(HarnessError::Connection("connection closed".to_string()));
        }
    }
}
