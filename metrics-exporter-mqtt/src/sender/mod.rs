//! The transport boundary.
//!
//! The reporter only ever talks to a [`Sender`]: it connects, publishes one record at a time, and disconnects. What a
//! session is, and how records travel to the broker, is entirely up to the implementation.
use thiserror::Error;

use crate::qos::QualityOfService;

mod recording;
pub use self::recording::{Call, PublishedRecord, RecordingSender};

/// Errors that could occur while talking to the transport.
#[derive(Debug, Error)]
pub enum SenderError {
    /// A session was requested while one was already established.
    #[error("already connected")]
    AlreadyConnected,

    /// A session was torn down while none was established.
    #[error("not connected")]
    NotConnected,

    /// The transport could not establish a session.
    #[error("failed to connect: {reason}")]
    Connection {
        /// Details about the failure.
        reason: String,
    },

    /// A single record could not be published.
    #[error("failed to publish '{name}': {reason}")]
    Publish {
        /// Name of the record.
        name: String,
        /// Details about the failure.
        reason: String,
    },

    /// The session could not be torn down cleanly.
    #[error("failed to disconnect: {reason}")]
    Disconnection {
        /// Details about the failure.
        reason: String,
    },
}

/// Broad category of a [`SenderError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SenderErrorKind {
    /// Establishing the session failed.
    Connection,
    /// Publishing a record failed.
    Publish,
    /// Tearing down the session failed.
    Disconnection,
}

impl SenderError {
    /// Gets the category of this error.
    pub const fn kind(&self) -> SenderErrorKind {
        match self {
            SenderError::AlreadyConnected | SenderError::Connection { .. } => {
                SenderErrorKind::Connection
            }
            SenderError::Publish { .. } => SenderErrorKind::Publish,
            SenderError::NotConnected | SenderError::Disconnection { .. } => {
                SenderErrorKind::Disconnection
            }
        }
    }
}

/// A publish/subscribe transport that records can be sent over.
///
/// Calls may block on network I/O. The reporter calls them synchronously, from one cycle at a time.
pub trait Sender {
    /// Establishes a session.
    ///
    /// # Errors
    ///
    /// Fails with [`SenderError::AlreadyConnected`] if a session is already established, or with
    /// [`SenderError::Connection`] if the transport cannot establish one.
    fn connect(&mut self) -> Result<(), SenderError>;

    /// Publishes a single record.
    ///
    /// Delivery guarantees are the transport's responsibility, per `qos`.
    ///
    /// # Errors
    ///
    /// Fails with [`SenderError::Publish`] if the record could not be handed to the transport.
    fn publish(
        &mut self,
        name: &str,
        value: &str,
        timestamp: u64,
        qos: QualityOfService,
    ) -> Result<(), SenderError>;

    /// Tears down the session.
    ///
    /// # Errors
    ///
    /// Fails with [`SenderError::NotConnected`] if there is no session, or with [`SenderError::Disconnection`] if
    /// the session could not be torn down cleanly.
    fn disconnect(&mut self) -> Result<(), SenderError>;

    /// Returns `true` if a session is currently established.
    fn is_connected(&self) -> bool;
}

impl<S: Sender + ?Sized> Sender for Box<S> {
    fn connect(&mut self) -> Result<(), SenderError> {
        (**self).connect()
    }

    fn publish(
        &mut self,
        name: &str,
        value: &str,
        timestamp: u64,
        qos: QualityOfService,
    ) -> Result<(), SenderError> {
        (**self).publish(name, value, timestamp, qos)
    }

    fn disconnect(&mut self) -> Result<(), SenderError> {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
