use std::time::Duration;

use thiserror::Error;

use crate::{
    clock::{Clock, SystemClock},
    filter::MetricFilter,
    naming::Prefixer,
    qos::QualityOfService,
    reporter::{Diagnostic, DiagnosticsSink, MqttReporter, ReporterConfiguration},
    scheduler::{ScheduledReporter, SnapshotSource},
    sender::Sender,
    snapshot::MetricRef,
    units::TimeUnit,
};

/// Errors that could occur while building a reporter or sender.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Failed to parse or resolve the remote address.
    #[error("invalid remote address: {reason}")]
    InvalidRemoteAddress {
        /// Details about the failure.
        reason: String,
    },

    /// The topic cannot be published to.
    #[error("invalid topic: {reason}")]
    InvalidTopic {
        /// Details about the failure.
        reason: String,
    },

    /// The client identifier cannot be sent to the broker.
    #[error("invalid client identifier: {reason}")]
    InvalidClientId {
        /// Details about the failure.
        reason: String,
    },

    /// The reporting interval was zero.
    #[error("reporting interval must be greater than zero")]
    InvalidInterval,

    /// Failed to spawn the background thread for a scheduled reporter.
    #[error("failed to spawn background thread for scheduled reporter")]
    Backend,
}

/// Builder for an [`MqttReporter`].
///
/// Defaults to no prefix, the system clock, rates per second, durations in milliseconds, no filtering, and
/// [`QualityOfService::ExactlyOnce`].
pub struct MqttReporterBuilder {
    prefix: Option<String>,
    clock: Box<dyn Clock>,
    rate_unit: TimeUnit,
    duration_unit: TimeUnit,
    filter: Option<Box<dyn MetricFilter>>,
    qos: QualityOfService,
    diagnostics: Option<DiagnosticsSink>,
}

impl MqttReporterBuilder {
    /// Creates a new `MqttReporterBuilder` with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes every metric name with the given string.
    ///
    /// Names are built in the format of `<prefix>.<name>`. An empty prefix is the same as no prefix.
    #[must_use]
    pub fn with_prefix<P: Into<String>>(mut self, prefix: P) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Uses the given clock to timestamp report cycles.
    #[must_use]
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Converts rates to events per the given unit.
    ///
    /// Defaults to [`TimeUnit::Seconds`].
    #[must_use]
    pub fn convert_rates_to(mut self, unit: TimeUnit) -> Self {
        self.rate_unit = unit;
        self
    }

    /// Converts durations to the given unit.
    ///
    /// Defaults to [`TimeUnit::Milliseconds`].
    #[must_use]
    pub fn convert_durations_to(mut self, unit: TimeUnit) -> Self {
        self.duration_unit = unit;
        self
    }

    /// Only reports metrics for which the given predicate returns `true`.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str, MetricRef<'_>) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Only reports metrics matching the given filter.
    #[must_use]
    pub fn with_metric_filter<F: MetricFilter + 'static>(mut self, filter: F) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Requests the given delivery guarantee for every record.
    ///
    /// Defaults to [`QualityOfService::ExactlyOnce`].
    #[must_use]
    pub fn with_quality_of_service(mut self, qos: QualityOfService) -> Self {
        self.qos = qos;
        self
    }

    /// Passes every [`Diagnostic`] raised during a report cycle to the given callback.
    ///
    /// The callback runs synchronously, on the thread running the cycle.
    #[must_use]
    pub fn with_diagnostics<F>(mut self, sink: F) -> Self
    where
        F: Fn(&Diagnostic<'_>) + Send + Sync + 'static,
    {
        self.diagnostics = Some(Box::new(sink));
        self
    }

    /// Builds the reporter, publishing through the given sender.
    ///
    /// The reporter does nothing until [`MqttReporter::report`] is called.
    pub fn build<S: Sender>(self, sender: S) -> MqttReporter<S> {
        let config = ReporterConfiguration {
            prefixer: Prefixer::new(self.prefix),
            rate_unit: self.rate_unit,
            duration_unit: self.duration_unit,
            filter: self.filter,
            clock: self.clock,
            qos: self.qos,
            diagnostics: self.diagnostics,
        };

        MqttReporter::new(sender, config)
    }

    /// Builds the reporter and runs it on a background thread, reporting a snapshot from `source` every `interval`.
    ///
    /// # Errors
    ///
    /// If `interval` is zero, or if the background thread cannot be spawned, an error will be returned.
    pub fn build_scheduled<S, P>(
        self,
        sender: S,
        source: P,
        interval: Duration,
    ) -> Result<ScheduledReporter<S>, BuildError>
    where
        S: Sender + Send + 'static,
        P: SnapshotSource + 'static,
    {
        if interval.is_zero() {
            return Err(BuildError::InvalidInterval);
        }

        let reporter = self.build(sender);
        ScheduledReporter::spawn(reporter, source, interval)
    }
}

impl Default for MqttReporterBuilder {
    fn default() -> Self {
        MqttReporterBuilder {
            prefix: None,
            clock: Box::new(SystemClock),
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Milliseconds,
            filter: None,
            qos: QualityOfService::default(),
            diagnostics: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{BuildError, MqttReporterBuilder};
    use crate::{qos::QualityOfService, sender::RecordingSender, snapshot::Snapshot, units::TimeUnit};

    #[test]
    fn defaults() {
        let reporter = MqttReporterBuilder::new().build(RecordingSender::new());
        assert_eq!(reporter.prefix(), None);
        assert_eq!(reporter.rate_unit(), TimeUnit::Seconds);
        assert_eq!(reporter.duration_unit(), TimeUnit::Milliseconds);
        assert_eq!(reporter.quality_of_service(), QualityOfService::ExactlyOnce);
    }

    #[test]
    fn overrides() {
        let reporter = MqttReporterBuilder::new()
            .with_prefix("device1")
            .convert_rates_to(TimeUnit::Minutes)
            .convert_durations_to(TimeUnit::Microseconds)
            .with_quality_of_service(QualityOfService::AtLeastOnce)
            .build(RecordingSender::new());

        assert_eq!(reporter.prefix(), Some("device1"));
        assert_eq!(reporter.rate_unit(), TimeUnit::Minutes);
        assert_eq!(reporter.duration_unit(), TimeUnit::Microseconds);
        assert_eq!(reporter.quality_of_service(), QualityOfService::AtLeastOnce);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = MqttReporterBuilder::new().build_scheduled(
            RecordingSender::new(),
            Snapshot::new,
            Duration::ZERO,
        );
        assert!(matches!(result, Err(BuildError::InvalidInterval)));
    }
}
