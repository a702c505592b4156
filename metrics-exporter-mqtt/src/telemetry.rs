use metrics::{counter, Counter};

/// Reporter telemetry.
///
/// `Telemetry` tracks the reporter's own behavior and emits it as ordinary counters through whichever recorder is
/// installed when the first report cycle runs.
pub struct Telemetry {
    cycles: Counter,
    records_published: Counter,
    records_dropped: Counter,
    values_skipped: Counter,
    connect_failures: Counter,
    disconnect_failures: Counter,
}

impl Telemetry {
    /// Creates a `Telemetry` instance.
    pub fn new() -> Self {
        Self {
            cycles: counter!("mqtt_reporter.cycles"),
            records_published: counter!("mqtt_reporter.records_published"),
            records_dropped: counter!("mqtt_reporter.records_dropped"),
            values_skipped: counter!("mqtt_reporter.values_skipped"),
            connect_failures: counter!("mqtt_reporter.connect_failures"),
            disconnect_failures: counter!("mqtt_reporter.disconnect_failures"),
        }
    }

    /// Applies the given telemetry update, updating the internal metrics.
    pub fn apply_update(&mut self, update: &TelemetryUpdate) {
        self.cycles.increment(1);
        self.records_published.increment(update.records_published);
        self.records_dropped.increment(update.records_dropped);
        self.values_skipped.increment(update.values_skipped);
        self.connect_failures.increment(u64::from(update.connect_failed));
        self.disconnect_failures.increment(u64::from(update.disconnect_failed));
    }
}

/// Telemetry collected over a single report cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TelemetryUpdate {
    records_published: u64,
    records_dropped: u64,
    values_skipped: u64,
    connect_failed: bool,
    disconnect_failed: bool,
}

impl TelemetryUpdate {
    /// Clears the update, resetting it back to an empty state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Tracks a record handed to the sender.
    pub fn track_record_published(&mut self) {
        self.records_published += 1;
    }

    /// Tracks records the sender failed to publish.
    pub fn track_records_dropped(&mut self, count: usize) {
        self.records_dropped += count as u64;
    }

    /// Tracks a value that had no reportable form.
    pub fn track_value_skipped(&mut self) {
        self.values_skipped += 1;
    }

    /// Tracks a failure to establish the session.
    pub fn track_connect_failed(&mut self) {
        self.connect_failed = true;
    }

    /// Tracks a failure to tear down the session.
    pub fn track_disconnect_failed(&mut self) {
        self.disconnect_failed = true;
    }

    /// Returns the number of records published.
    pub const fn records_published(&self) -> u64 {
        self.records_published
    }

    /// Returns the number of records dropped.
    pub const fn records_dropped(&self) -> u64 {
        self.records_dropped
    }

    /// Returns the number of values skipped.
    pub const fn values_skipped(&self) -> u64 {
        self.values_skipped
    }
}
