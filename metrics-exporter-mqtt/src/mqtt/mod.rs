//! A [`Sender`] that publishes records to an MQTT 3.1.1 broker.
//!
//! Every record is published to a single topic, with a payload in the format of `<name> <value> <timestamp>`. The
//! protocol itself is handled by `rumqttc`'s blocking client; each session drives the client's event loop only as far
//! as the current operation needs.
use std::{
    net::{SocketAddr, ToSocketAddrs as _},
    time::{Duration, Instant, SystemTime},
};

use rumqttc::{
    Client, ClientError, ConnectReturnCode, Connection, ConnectionError, Event, MqttOptions,
    Outgoing, Packet, QoS,
};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    builder::BuildError,
    qos::QualityOfService,
    sender::{Sender, SenderError},
};

const DEFAULT_PORT: u16 = 1883;
const DEFAULT_TOPIC: &str = "metrics";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the request queue between the client and its event loop.
///
/// Requests are issued one at a time, so this only needs to hold a publish and a disconnect.
const REQUEST_CAPACITY: usize = 8;

/// Largest packet accepted from, or sent to, the broker.
///
/// Large enough for a record on the longest possible topic.
const MAX_PACKET_SIZE: usize = 128 * 1024;

#[derive(Clone)]
struct SenderConfiguration {
    remote_addrs: Vec<SocketAddr>,
    topic: String,
    client_id: String,
    connect_timeout: Duration,
    io_timeout: Duration,
}

/// Builder for an [`MqttSender`].
pub struct MqttSenderBuilder {
    config: SenderConfiguration,
}

impl MqttSenderBuilder {
    /// Creates a new `MqttSenderBuilder` with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address of the broker.
    ///
    /// The address needs to be in the format of `<host>:<port>`. When the host resolves to more than one address, each
    /// is tried in turn when connecting.
    ///
    /// Defaults to `127.0.0.1:1883`.
    ///
    /// # Errors
    ///
    /// If the address cannot be parsed or resolved, an error will be returned indicating the reason.
    pub fn with_remote_address<A: AsRef<str>>(mut self, addr: A) -> Result<Self, BuildError> {
        let remote_addrs = addr
            .as_ref()
            .to_socket_addrs()
            .map_err(|e| BuildError::InvalidRemoteAddress { reason: e.to_string() })?
            .collect::<Vec<_>>();
        if remote_addrs.is_empty() {
            return Err(BuildError::InvalidRemoteAddress {
                reason: format!("'{}' did not resolve to any address", addr.as_ref()),
            });
        }

        self.config.remote_addrs = remote_addrs;
        Ok(self)
    }

    /// Sets the topic that records are published to.
    ///
    /// Defaults to `metrics`.
    ///
    /// # Errors
    ///
    /// If the topic is empty, contains wildcards or NUL characters, or is longer than 65,535 bytes, an error will be
    /// returned.
    pub fn with_topic<T: Into<String>>(mut self, topic: T) -> Result<Self, BuildError> {
        let topic = topic.into();
        let reason = if topic.is_empty() {
            Some("topic must not be empty")
        } else if topic.contains(|c: char| c == '+' || c == '#') {
            Some("topic must not contain wildcards")
        } else if topic.contains('\0') {
            Some("topic must not contain NUL characters")
        } else if topic.len() > usize::from(u16::MAX) {
            Some("topic must not exceed 65535 bytes")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(BuildError::InvalidTopic { reason: reason.to_string() });
        }

        self.config.topic = topic;
        Ok(self)
    }

    /// Sets the client identifier presented to the broker.
    ///
    /// Defaults to an identifier generated from the process ID and the current time.
    ///
    /// # Errors
    ///
    /// If the identifier is empty, starts with whitespace, or is longer than 65,535 bytes, an error will be returned.
    pub fn with_client_id<C: Into<String>>(mut self, client_id: C) -> Result<Self, BuildError> {
        let client_id = client_id.into();
        if client_id.is_empty() || client_id.len() > usize::from(u16::MAX) {
            return Err(BuildError::InvalidClientId {
                reason: "client identifier must be between 1 and 65535 bytes".to_string(),
            });
        }
        if client_id.starts_with(char::is_whitespace) {
            return Err(BuildError::InvalidClientId {
                reason: "client identifier must not start with whitespace".to_string(),
            });
        }

        self.config.client_id = client_id;
        Ok(self)
    }

    /// Sets the timeout for establishing a session, from opening the connection to receiving the broker's CONNACK.
    ///
    /// Defaults to 5 seconds.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets the timeout for every publish and disconnect on an established session, including waiting for any
    /// acknowledgements the quality of service requires.
    ///
    /// When the timeout is reached, the operation fails and the session is dropped.
    ///
    /// Defaults to 5 seconds.
    #[must_use]
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.config.io_timeout = timeout;
        self
    }

    /// Builds the sender.
    ///
    /// No connection is made until [`Sender::connect`] is called.
    pub fn build(self) -> MqttSender {
        MqttSender { config: self.config, session: None }
    }
}

impl Default for MqttSenderBuilder {
    fn default() -> Self {
        MqttSenderBuilder {
            config: SenderConfiguration {
                remote_addrs: vec![SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))],
                topic: DEFAULT_TOPIC.to_string(),
                client_id: generate_client_id(),
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
                io_timeout: DEFAULT_IO_TIMEOUT,
            },
        }
    }
}

/// Errors raised while driving a session.
#[derive(Debug, Error)]
enum SessionError {
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("broker refused connection: {0:?}")]
    Refused(ConnectReturnCode),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// An established session: the client used to issue requests, and the event loop that carries them out.
struct Session {
    client: Client,
    connection: Connection,
}

impl Session {
    fn open(config: &SenderConfiguration, addr: SocketAddr) -> Result<Self, SessionError> {
        let mut options =
            MqttOptions::new(config.client_id.clone(), addr.ip().to_string(), addr.port());
        options.set_clean_session(true);
        options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

        let (client, connection) = Client::new(options, REQUEST_CAPACITY);
        let mut session = Session { client, connection };

        let code = session.wait_for("CONNACK", config.connect_timeout, |event| match event {
            Event::Incoming(Packet::ConnAck(ack)) => Some(ack.code),
            _ => None,
        })?;
        if code != ConnectReturnCode::Success {
            return Err(SessionError::Refused(code));
        }

        Ok(session)
    }

    /// Publishes a payload, returning once the broker has acknowledged it as `qos` requires.
    fn publish(
        &mut self,
        topic: &str,
        payload: String,
        qos: QualityOfService,
        timeout: Duration,
    ) -> Result<u16, SessionError> {
        self.client.publish(topic, to_qos(qos), false, payload)?;

        let pkid = self.wait_for("PUBLISH to be sent", timeout, |event| match event {
            Event::Outgoing(Outgoing::Publish(pkid)) => Some(*pkid),
            _ => None,
        })?;

        match qos {
            QualityOfService::AtMostOnce => {}
            QualityOfService::AtLeastOnce => self.wait_for("PUBACK", timeout, |event| {
                matches!(event, Event::Incoming(Packet::PubAck(ack)) if ack.pkid == pkid).then_some(())
            })?,
            // The client answers PUBREC with PUBREL on its own; the flow ends with PUBCOMP.
            QualityOfService::ExactlyOnce => self.wait_for("PUBCOMP", timeout, |event| {
                matches!(event, Event::Incoming(Packet::PubComp(ack)) if ack.pkid == pkid).then_some(())
            })?,
        }

        Ok(pkid)
    }

    fn close(mut self, timeout: Duration) -> Result<(), SessionError> {
        self.client.disconnect()?;
        self.wait_for("DISCONNECT to be sent", timeout, |event| {
            matches!(event, Event::Outgoing(Outgoing::Disconnect)).then_some(())
        })
    }

    /// Drives the event loop until `matcher` picks out an event, the connection fails, or `timeout` elapses.
    fn wait_for<T, F>(&mut self, what: &'static str, timeout: Duration, mut matcher: F) -> Result<T, SessionError>
    where
        F: FnMut(&Event) -> Option<T>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.connection.recv_timeout(remaining) {
                Ok(Ok(event)) => {
                    trace!(?event, "Received session event.");
                    if let Some(value) = matcher(&event) {
                        return Ok(value);
                    }
                }
                Ok(Err(e)) => return Err(SessionError::Connection(e)),
                Err(_) => return Err(SessionError::Timeout(what)),
            }
        }
    }
}

/// A sender publishing to an MQTT broker.
///
/// Each session is a clean session. Publishing blocks until the broker has acknowledged the record as required by the
/// requested quality of service. If a publish fails or times out, the session is dropped and must be re-established
/// with [`Sender::connect`].
pub struct MqttSender {
    config: SenderConfiguration,
    session: Option<Session>,
}

impl MqttSender {
    /// Gets the topic that records are published to.
    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// Gets the client identifier presented to the broker.
    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    fn open_session(&self) -> Result<Session, SessionError> {
        let mut last_error = SessionError::Timeout("a broker address to connect to");
        for addr in &self.config.remote_addrs {
            match Session::open(&self.config, *addr) {
                Ok(session) => return Ok(session),
                Err(e) => {
                    trace!(%addr, error = %e, "Failed to connect to broker address.");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

impl Sender for MqttSender {
    fn connect(&mut self) -> Result<(), SenderError> {
        if self.session.is_some() {
            return Err(SenderError::AlreadyConnected);
        }

        let session =
            self.open_session().map_err(|e| SenderError::Connection { reason: e.to_string() })?;

        debug!(client_id = %self.config.client_id, "Connected to broker.");
        self.session = Some(session);
        Ok(())
    }

    fn publish(
        &mut self,
        name: &str,
        value: &str,
        timestamp: u64,
        qos: QualityOfService,
    ) -> Result<(), SenderError> {
        let Some(session) = self.session.as_mut() else {
            return Err(SenderError::Publish {
                name: name.to_string(),
                reason: "not connected".to_string(),
            });
        };

        let payload = format!("{} {} {}", name, value, timestamp);
        match session.publish(&self.config.topic, payload, qos, self.config.io_timeout) {
            Ok(packet_id) => {
                trace!(metric_name = name, packet_id, "Published record.");
                Ok(())
            }
            Err(e) => {
                // The session is in an unknown state, so it can't be reused.
                self.session = None;
                Err(SenderError::Publish { name: name.to_string(), reason: e.to_string() })
            }
        }
    }

    fn disconnect(&mut self) -> Result<(), SenderError> {
        let session = self.session.take().ok_or(SenderError::NotConnected)?;

        session
            .close(self.config.io_timeout)
            .map_err(|e| SenderError::Disconnection { reason: e.to_string() })?;
        debug!(client_id = %self.config.client_id, "Disconnected from broker.");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

const fn to_qos(qos: QualityOfService) -> QoS {
    match qos {
        QualityOfService::AtMostOnce => QoS::AtMostOnce,
        QualityOfService::AtLeastOnce => QoS::AtLeastOnce,
        QualityOfService::ExactlyOnce => QoS::ExactlyOnce,
    }
}

fn generate_client_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("metrics-{}-{:08x}", std::process::id(), nanos)
}
