//! In-process MQTT broker for integration tests
//!
//! Speaks just enough v3.1.1 for the harness: CONNECT/CONNACK, SUBSCRIBE
//! with `#` filters, QoS 0 routing, PINGREQ and DISCONNECT. An optional
//! simulated lamp answers commands published under the device root.

#![allow(dead_code)]

pub mod device;
mod wire;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use lampcheck::config::HarnessConfig;
use lampcheck::protocol::{
    ConnAck, ConnectReturnCode, Incoming, Outgoing, Publish, QoS, SubAck, SubAckReturnCode,
};

use device::LampSim;

/// Broker behaviour knobs
#[derive(Debug, Clone)]
pub struct BrokerOptions {
    /// Return code sent in every CONNACK
    pub return_code: ConnectReturnCode,
    /// Reject every subscription
    pub reject_subscriptions: bool,
    /// Attach a simulated lamp under this topic root
    pub device_root: Option<String>,
    /// Delay before the lamp publishes its response
    pub response_delay: Duration,
    /// Whether the lamp answers `config/request`
    pub answer_config_requests: bool,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self {
            return_code: ConnectReturnCode::Accepted,
            reject_subscriptions: false,
            device_root: Some("lamp".to_string()),
            response_delay: Duration::from_millis(5),
            answer_config_requests: true,
        }
    }
}

/// What a client sent in its CONNECT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRecord {
    pub client_id: String,
    pub keep_alive: u16,
    pub username: Option<String>,
    pub password: Option<Bytes>,
}

#[derive(Default)]
struct Observed {
    connects: Vec<ConnectRecord>,
    filters: Vec<String>,
    publishes: Vec<(String, Bytes)>,
    pubacks: Vec<u16>,
    pings: usize,
    disconnects: usize,
}

struct Session {
    filters: Vec<String>,
    tx: mpsc::UnboundedSender<Incoming>,
}

struct Shared {
    options: BrokerOptions,
    sessions: Mutex<Vec<Session>>,
    observed: Mutex<Observed>,
    device: Mutex<LampSim>,
}

pub struct FakeBroker {
    pub addr: SocketAddr,
    shared: Arc<Shared>,
}

impl FakeBroker {
    pub async fn start(options: BrokerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("No local addr");

        let shared = Arc::new(Shared {
            options,
            sessions: Mutex::new(Vec::new()),
            observed: Mutex::new(Observed::default()),
            device: Mutex::new(LampSim::default()),
        });

        let accept_shared = shared.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_connection(stream, accept_shared.clone()));
            }
        });

        Self { addr, shared }
    }

    /// Harness config pointing at this broker with fast timings
    pub fn harness_config(&self) -> HarnessConfig {
        let mut config = HarnessConfig::default();
        config.broker.host = self.addr.ip().to_string();
        config.broker.port = self.addr.port();
        config.broker.connect_timeout = Duration::from_secs(2);
        config.device.topic = self
            .shared
            .options
            .device_root
            .clone()
            .unwrap_or_else(|| "lamp".to_string());
        config.timing.poll_interval = Duration::from_millis(10);
        config.timing.settle_delay = Duration::from_millis(20);
        config.timing.wait_timeout = Duration::from_millis(500);
        config.timing.config_timeout = Duration::from_millis(500);
        config.timing.command_delay = Duration::from_millis(20);
        config
    }

    /// Publish from outside the harness, as another client would
    pub fn inject(&self, topic: &str, payload: &[u8]) {
        route(
            &self.shared,
            topic,
            Bytes::copy_from_slice(payload),
            QoS::AtMostOnce,
            None,
        );
    }

    /// Deliver a QoS 1 PUBLISH to every matching subscriber
    pub fn inject_qos1(&self, topic: &str, payload: &[u8], packet_id: u16) {
        route(
            &self.shared,
            topic,
            Bytes::copy_from_slice(payload),
            QoS::AtLeastOnce,
            Some(packet_id),
        );
    }

    pub fn connects(&self) -> Vec<ConnectRecord> {
        self.shared.observed.lock().connects.clone()
    }

    pub fn filters(&self) -> Vec<String> {
        self.shared.observed.lock().filters.clone()
    }

    pub fn publishes(&self) -> Vec<(String, Bytes)> {
        self.shared.observed.lock().publishes.clone()
    }

    pub fn pubacks(&self) -> Vec<u16> {
        self.shared.observed.lock().pubacks.clone()
    }

    pub fn pings(&self) -> usize {
        self.shared.observed.lock().pings
    }

    pub fn disconnects(&self) -> usize {
        self.shared.observed.lock().disconnects
    }

    /// Live client sessions
    pub fn sessions(&self) -> usize {
        self.shared.sessions.lock().len()
    }

    pub fn device(&self) -> LampSim {
        self.shared.device.lock().clone()
    }

    /// Poll `check` until it holds or `timeout` elapses
    pub async fn eventually(&self, timeout: Duration, check: impl Fn(&Self) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if check(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        check(self)
    }
}

fn filter_matches(filter: &str, topic: &str) -> bool {
    match filter.strip_suffix("/#") {
        Some(prefix) => topic == prefix || topic.starts_with(&format!("{}/", prefix)),
        None => filter == "#" || filter == topic,
    }
}

fn route(shared: &Shared, topic: &str, payload: Bytes, qos: QoS, packet_id: Option<u16>) {
    let mut sessions = shared.sessions.lock();
    sessions.retain(|session| !session.tx.is_closed());
    for session in sessions.iter() {
        if session.filters.iter().any(|f| filter_matches(f, topic)) {
            let _ = session.tx.send(Incoming::Publish(Publish {
                qos,
                topic: topic.to_string(),
                packet_id,
                payload: payload.clone(),
                ..Default::default()
            }));
        }
    }
}

fn on_publish(shared: &Arc<Shared>, publish: Publish) {
    shared
        .observed
        .lock()
        .publishes
        .push((publish.topic.clone(), publish.payload.clone()));

    route(shared, &publish.topic, publish.payload.clone(), QoS::AtMostOnce, None);

    let Some(root) = &shared.options.device_root else {
        return;
    };
    let Some(subtopic) = publish.topic.strip_prefix(&format!("{}/", root)) else {
        return;
    };
    let payload = String::from_utf8_lossy(&publish.payload).to_string();
    let responses = shared
        .device
        .lock()
        .handle(subtopic, &payload, shared.options.answer_config_requests);

    if responses.is_empty() {
        return;
    }
    let shared = shared.clone();
    let root = root.clone();
    tokio::spawn(async move {
        tokio::time::sleep(shared.options.response_delay).await;
        for (subtopic, body) in responses {
            route(
                &shared,
                &format!("{}/{}", root, subtopic),
                Bytes::from(body),
                QoS::AtMostOnce,
                None,
            );
        }
    });
}

async fn handle_connection(stream: TcpStream, shared: Arc<Shared>) {
    // Device replies must not sit in Nagle's buffer past a command delay
    let _ = stream.set_nodelay(true);
    let (reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Incoming>();

    tokio::spawn(async move {
        let mut buf = BytesMut::new();
        while let Some(packet) = rx.recv().await {
            buf.clear();
            if wire::encode(&packet, &mut buf).is_err() {
                continue;
            }
            if writer.write_all(&buf).await.is_err() {
                break;
            }
        }
    });

    serve(reader, &shared, &tx).await;

    // Dropping the last sender closes the socket once queued packets are flushed
    shared.sessions.lock().retain(|s| !s.tx.same_channel(&tx));
}

async fn serve(
    mut reader: OwnedReadHalf,
    shared: &Arc<Shared>,
    tx: &mpsc::UnboundedSender<Incoming>,
) {
    let mut read_buf = BytesMut::with_capacity(4096);

    loop {
        match reader.read_buf(&mut read_buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        loop {
            let (packet, consumed) = match wire::decode(&read_buf[..]) {
                Ok(Some(decoded)) => decoded,
                Ok(None) => break,
                Err(_) => return,
            };
            read_buf.advance(consumed);

            match packet {
                Outgoing::Connect(connect) => {
                    shared.observed.lock().connects.push(ConnectRecord {
                        client_id: connect.client_id.clone(),
                        keep_alive: connect.keep_alive,
                        username: connect.username.clone(),
                        password: connect.password.clone(),
                    });
                    let return_code = shared.options.return_code;
                    let _ = tx.send(Incoming::ConnAck(ConnAck {
                        session_present: false,
                        return_code,
                    }));
                    if return_code != ConnectReturnCode::Accepted {
                        return;
                    }
                    shared.sessions.lock().push(Session {
                        filters: Vec::new(),
                        tx: tx.clone(),
                    });
                }
                Outgoing::Subscribe(subscribe) => {
                    shared.observed.lock().filters.push(subscribe.filter.clone());
                    let code = if shared.options.reject_subscriptions {
                        SubAckReturnCode::Failure
                    } else {
                        let mut sessions = shared.sessions.lock();
                        if let Some(session) = sessions.iter_mut().find(|s| s.tx.same_channel(tx)) {
                            session.filters.push(subscribe.filter);
                        }
                        SubAckReturnCode::Granted(QoS::AtMostOnce)
                    };
                    let _ = tx.send(Incoming::SubAck(SubAck {
                        packet_id: subscribe.packet_id,
                        return_codes: vec![code],
                    }));
                }
                Outgoing::Publish(publish) => on_publish(shared, publish),
                Outgoing::PubAck { packet_id } => shared.observed.lock().pubacks.push(packet_id),
                Outgoing::PingReq => {
                    shared.observed.lock().pings += 1;
                    let _ = tx.send(Incoming::PingResp);
                }
                Outgoing::Disconnect => {
                    shared.observed.lock().disconnects += 1;
                    return;
                }
            }
        }
    }
}
