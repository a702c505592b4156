use std::{collections::HashSet, sync::Arc};

use parking_lot::Mutex;

use super::{Sender, SenderError};
use crate::qos::QualityOfService;

/// A record handed to a [`RecordingSender`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedRecord {
    /// Fully-qualified metric name.
    pub name: String,
    /// Formatted value.
    pub value: String,
    /// Timestamp, in seconds since the Unix epoch.
    pub timestamp: u64,
    /// Requested delivery guarantee.
    pub qos: QualityOfService,
}

/// A single call made against a [`RecordingSender`], whether or not it succeeded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    /// `connect` was called.
    Connect,
    /// `publish` was called with the given record.
    Publish(PublishedRecord),
    /// `disconnect` was called.
    Disconnect,
}

#[derive(Default)]
struct State {
    connected: bool,
    calls: Vec<Call>,
    published: Vec<PublishedRecord>,
    publish_attempts: usize,
    fail_connect: bool,
    fail_disconnect: bool,
    failing_publishes: HashSet<usize>,
}

/// An in-memory sender that records every call made against it.
///
/// Clones share the same state, so a handle can be kept to inspect a sender that was moved into a reporter. Failures
/// can be injected for connecting, disconnecting, and for specific publish attempts.
#[derive(Clone, Default)]
pub struct RecordingSender {
    state: Arc<Mutex<State>>,
}

impl RecordingSender {
    /// Creates a new `RecordingSender`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether or not `connect` fails.
    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    /// Sets whether or not `disconnect` fails, even with an established session.
    pub fn fail_disconnect(&self, fail: bool) {
        self.state.lock().fail_disconnect = fail;
    }

    /// Makes the given publish attempt fail.
    ///
    /// Attempts are counted from 1 over the lifetime of the sender.
    pub fn fail_publish(&self, attempt: usize) {
        self.state.lock().failing_publishes.insert(attempt);
    }

    /// Gets every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Gets every record that was published successfully, in order.
    pub fn published(&self) -> Vec<PublishedRecord> {
        self.state.lock().published.clone()
    }

    /// Returns the number of `publish` calls, successful or not.
    pub fn publish_attempts(&self) -> usize {
        self.state.lock().publish_attempts
    }

    /// Returns the number of `connect` calls, successful or not.
    pub fn connect_calls(&self) -> usize {
        self.count_calls(|call| matches!(call, Call::Connect))
    }

    /// Returns the number of `disconnect` calls, successful or not.
    pub fn disconnect_calls(&self) -> usize {
        self.count_calls(|call| matches!(call, Call::Disconnect))
    }

    /// Forgets all recorded calls and records. Injected failures are kept.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.calls.clear();
        state.published.clear();
    }

    fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|call| predicate(call)).count()
    }
}

impl Sender for RecordingSender {
    fn connect(&mut self) -> Result<(), SenderError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Connect);

        if state.connected {
            return Err(SenderError::AlreadyConnected);
        }
        if state.fail_connect {
            return Err(SenderError::Connection { reason: "connection refused".to_string() });
        }

        state.connected = true;
        Ok(())
    }

    fn publish(
        &mut self,
        name: &str,
        value: &str,
        timestamp: u64,
        qos: QualityOfService,
    ) -> Result<(), SenderError> {
        let mut state = self.state.lock();
        let record =
            PublishedRecord { name: name.to_string(), value: value.to_string(), timestamp, qos };
        state.calls.push(Call::Publish(record.clone()));
        state.publish_attempts += 1;

        if !state.connected {
            return Err(SenderError::Publish {
                name: record.name,
                reason: "not connected".to_string(),
            });
        }
        let attempt = state.publish_attempts;
        if state.failing_publishes.contains(&attempt) {
            return Err(SenderError::Publish {
                name: record.name,
                reason: format!("injected failure on attempt {}", attempt),
            });
        }

        state.published.push(record);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SenderError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Disconnect);

        if !state.connected {
            return Err(SenderError::NotConnected);
        }

        state.connected = false;
        if state.fail_disconnect {
            return Err(SenderError::Disconnection { reason: "connection reset".to_string() });
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }
}

#[cfg(test)]
mod tests {
    use super::{Call, RecordingSender};
    use crate::{
        qos::QualityOfService,
        sender::{Sender, SenderErrorKind},
    };

    #[test]
    fn session_lifecycle() {
        let mut sender = RecordingSender::new();
        let handle = sender.clone();

        assert!(!sender.is_connected());
        sender.connect().expect("connect should succeed");
        assert!(handle.is_connected());

        let err = sender.connect().expect_err("second connect should fail");
        assert_eq!(err.kind(), SenderErrorKind::Connection);

        sender.publish("a", "1", 10, QualityOfService::AtMostOnce).expect("publish should succeed");
        sender.disconnect().expect("disconnect should succeed");
        assert!(!sender.is_connected());

        let err = sender.disconnect().expect_err("disconnect without session should fail");
        assert_eq!(err.kind(), SenderErrorKind::Disconnection);

        assert_eq!(handle.connect_calls(), 2);
        assert_eq!(handle.disconnect_calls(), 2);
        assert_eq!(handle.published().len(), 1);
        assert!(matches!(handle.calls()[2], Call::Publish(ref record) if record.name == "a"));
    }

    #[test]
    fn injected_failures() {
        let mut sender = RecordingSender::new();
        sender.fail_publish(2);
        sender.connect().expect("connect should succeed");

        for name in ["a", "b", "c"] {
            let _ = sender.publish(name, "1", 10, QualityOfService::ExactlyOnce);
        }

        assert_eq!(sender.publish_attempts(), 3);
        let names = sender.published().into_iter().map(|r| r.name).collect::<Vec<_>>();
        assert_eq!(names, ["a", "c"]);

        sender.fail_disconnect(true);
        let err = sender.disconnect().expect_err("disconnect should fail");
        assert_eq!(err.kind(), SenderErrorKind::Disconnection);
        assert!(!sender.is_connected());

        sender.fail_connect(true);
        let err = sender.connect().expect_err("connect should fail");
        assert_eq!(err.kind(), SenderErrorKind::Connection);
        assert!(!sender.is_connected());
    }
}
