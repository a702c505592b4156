use tracing::{debug, error, trace, warn};

use crate::{
    clock::Clock,
    filter::MetricFilter,
    formatting::ValueFormatter,
    naming::Prefixer,
    qos::QualityOfService,
    sender::{Sender, SenderError},
    series::{DiscreteTimeValue, SeriesSet},
    snapshot::{Histogram, Meter, MetricRef, Rates, Snapshot, Statistics, Timer},
    telemetry::{Telemetry, TelemetryUpdate},
    units::TimeUnit,
};

/// Callback receiving the diagnostics of every report cycle.
pub type DiagnosticsSink = Box<dyn Fn(&Diagnostic<'_>) + Send + Sync>;

/// Something notable that happened during a report cycle.
///
/// No error ever escapes a report cycle, so diagnostics are the only way to observe failures other than logs.
#[derive(Debug)]
pub enum Diagnostic<'a> {
    /// The session could not be established, and nothing was published.
    ConnectFailed {
        /// Error returned by the sender.
        error: &'a SenderError,
    },

    /// A single record could not be published, and was dropped.
    PublishFailed {
        /// Fully-qualified name of the record.
        name: &'a str,
        /// Error returned by the sender.
        error: &'a SenderError,
    },

    /// The session could not be torn down cleanly.
    DisconnectFailed {
        /// Error returned by the sender.
        error: &'a SenderError,
    },

    /// A value had no numeric form or its name was empty, and no record was produced for it.
    ValueSkipped {
        /// Fully-qualified name the record would have had.
        name: &'a str,
    },

    /// The cycle finished.
    CycleCompleted {
        /// Timestamp of every record in the cycle, in seconds since the Unix epoch.
        timestamp: u64,
        /// Number of records handed to the sender.
        records_published: u64,
        /// Number of records the sender failed to publish.
        records_dropped: u64,
        /// Number of values skipped.
        values_skipped: u64,
    },
}

/// Reporter configuration.
pub(crate) struct ReporterConfiguration {
    pub prefixer: Prefixer,
    pub rate_unit: TimeUnit,
    pub duration_unit: TimeUnit,
    pub filter: Option<Box<dyn MetricFilter>>,
    pub clock: Box<dyn Clock>,
    pub qos: QualityOfService,
    pub diagnostics: Option<DiagnosticsSink>,
}

/// Publishes metric snapshots as timestamped records through a [`Sender`].
///
/// Each call to [`report`][MqttReporter::report] runs one report cycle: the sender is connected, every metric in the
/// snapshot is turned into zero or more records, the records are published, and the sender is disconnected.
///
/// Families are visited in a fixed order (gauges, counters, histograms, meters, timers) and metrics within a family in
/// alphabetical order, so records are always published in a stable order within one cycle.
///
/// Cycles cannot overlap: `report` requires exclusive access to the reporter. When driven by a scheduler, cycles run
/// one after another on the scheduler's thread.
pub struct MqttReporter<S> {
    sender: S,
    config: ReporterConfiguration,
    formatter: ValueFormatter,
    series: SeriesSet,
    telemetry: Option<Telemetry>,
    update: TelemetryUpdate,
}

impl<S: Sender> MqttReporter<S> {
    pub(crate) fn new(sender: S, config: ReporterConfiguration) -> Self {
        MqttReporter {
            sender,
            config,
            formatter: ValueFormatter::new(),
            series: SeriesSet::new(),
            telemetry: None,
            update: TelemetryUpdate::default(),
        }
    }

    /// Gets a reference to the sender.
    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Gets a mutable reference to the sender.
    pub fn sender_mut(&mut self) -> &mut S {
        &mut self.sender
    }

    /// Consumes the reporter, returning the sender.
    pub fn into_sender(self) -> S {
        self.sender
    }

    /// Gets the prefix applied to every metric name, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.config.prefixer.prefix()
    }

    /// Gets the unit that rates are reported in.
    pub fn rate_unit(&self) -> TimeUnit {
        self.config.rate_unit
    }

    /// Gets the unit that durations are reported in.
    pub fn duration_unit(&self) -> TimeUnit {
        self.config.duration_unit
    }

    /// Gets the delivery guarantee requested for every record.
    pub fn quality_of_service(&self) -> QualityOfService {
        self.config.qos
    }

    /// Runs one report cycle over the given snapshot.
    ///
    /// Failures never escape the cycle: a failure to connect skips publishing, a failure to publish drops that record
    /// only, and the sender is always asked to disconnect at the end. Failures are logged, counted in the reporter's
    /// telemetry, and passed to the diagnostics sink if one is configured.
    pub fn report(&mut self, snapshot: &Snapshot) {
        let timestamp = self.config.clock.time_millis() / 1000;
        self.update.clear();
        self.series.reset_series();

        match self.connect() {
            Ok(()) => {
                self.collect(snapshot, timestamp);
                self.publish_series();
            }
            Err(e) => {
                error!(error = %e, "Failed to connect, skipping report cycle.");
                self.update.track_connect_failed();
                self.emit(&Diagnostic::ConnectFailed { error: &e });
            }
        }

        self.disconnect();
        self.series.reset_series();

        debug!(
            timestamp,
            records_published = self.update.records_published(),
            records_dropped = self.update.records_dropped(),
            values_skipped = self.update.values_skipped(),
            "Finished report cycle."
        );
        self.emit(&Diagnostic::CycleCompleted {
            timestamp,
            records_published: self.update.records_published(),
            records_dropped: self.update.records_dropped(),
            values_skipped: self.update.values_skipped(),
        });

        // Telemetry is created lazily so that it registers with whichever recorder is installed by the time the
        // reporter actually runs, rather than when it was built.
        let telemetry = self.telemetry.get_or_insert_with(Telemetry::new);
        telemetry.apply_update(&self.update);
    }

    fn connect(&mut self) -> Result<(), SenderError> {
        if self.sender.is_connected() {
            trace!("Sender already connected.");
            return Ok(());
        }

        self.sender.connect()
    }

    fn disconnect(&mut self) {
        match self.sender.disconnect() {
            Ok(()) => trace!("Sender disconnected."),
            Err(SenderError::NotConnected) => debug!("Sender had no session to disconnect."),
            Err(e) => {
                warn!(error = %e, "Failed to disconnect sender.");
                self.update.track_disconnect_failed();
                self.emit(&Diagnostic::DisconnectFailed { error: &e });
            }
        }
    }

    fn publish_series(&mut self) {
        let qos = self.config.qos;
        for record in self.series.iter() {
            let result =
                self.sender.publish(record.name(), record.value(), record.timestamp(), qos);
            match result {
                Ok(()) => self.update.track_record_published(),
                Err(e) => {
                    warn!(metric_name = record.name(), error = %e, "Failed to publish record.");
                    self.update.track_records_dropped(1);
                    emit(
                        self.config.diagnostics.as_ref(),
                        &Diagnostic::PublishFailed { name: record.name(), error: &e },
                    );
                }
            }
        }
    }

    fn collect(&mut self, snapshot: &Snapshot, timestamp: u64) {
        for (name, value) in &snapshot.gauges {
            if self.is_filtered(name, MetricRef::Gauge(value)) {
                continue;
            }

            match self.formatter.format(value) {
                Some(formatted) => self.push(name, None, formatted, timestamp),
                None => self.skip(name, None),
            }
        }

        for (name, counter) in &snapshot.counters {
            if self.is_filtered(name, MetricRef::Counter(counter)) {
                continue;
            }

            self.push_integer(name, "count", counter.count, timestamp);
        }

        for (name, histogram) in &snapshot.histograms {
            if self.is_filtered(name, MetricRef::Histogram(histogram)) {
                continue;
            }

            self.collect_histogram(name, histogram, timestamp);
        }

        for (name, meter) in &snapshot.meters {
            if self.is_filtered(name, MetricRef::Meter(meter)) {
                continue;
            }

            self.collect_meter(name, meter, timestamp);
        }

        for (name, timer) in &snapshot.timers {
            if self.is_filtered(name, MetricRef::Timer(timer)) {
                continue;
            }

            self.collect_timer(name, timer, timestamp);
        }

        trace!(records = self.series.len(), "Collected records from snapshot.");
    }

    fn collect_histogram(&mut self, name: &str, histogram: &Histogram, timestamp: u64) {
        let stats = &histogram.snapshot;
        self.push_integer(name, "count", histogram.count, timestamp);
        self.push_integer(name, "max", stats.max, timestamp);
        self.push_float(name, "mean", stats.mean, timestamp);
        self.push_integer(name, "min", stats.min, timestamp);
        self.push_float(name, "stddev", stats.stddev, timestamp);
        self.push_percentiles(name, stats, timestamp, |v| v);
    }

    fn collect_meter(&mut self, name: &str, meter: &Meter, timestamp: u64) {
        self.push_integer(name, "count", meter.count, timestamp);
        self.push_rates(name, &meter.rates, timestamp);
    }

    fn collect_timer(&mut self, name: &str, timer: &Timer, timestamp: u64) {
        let unit = self.config.duration_unit;
        let convert = |nanos: f64| unit.convert_duration(nanos);

        let stats = &timer.snapshot;
        self.push_float(name, "max", convert(stats.max as f64), timestamp);
        self.push_float(name, "mean", convert(stats.mean), timestamp);
        self.push_float(name, "min", convert(stats.min as f64), timestamp);
        self.push_float(name, "stddev", convert(stats.stddev), timestamp);
        self.push_percentiles(name, stats, timestamp, convert);
        self.push_integer(name, "count", timer.count, timestamp);
        self.push_rates(name, &timer.rates, timestamp);
    }

    fn push_percentiles<F>(&mut self, name: &str, stats: &Statistics, timestamp: u64, convert: F)
    where
        F: Fn(f64) -> f64,
    {
        let percentiles = [
            ("p50", stats.median),
            ("p75", stats.p75),
            ("p95", stats.p95),
            ("p98", stats.p98),
            ("p99", stats.p99),
            ("p999", stats.p999),
        ];

        for (suffix, value) in percentiles {
            self.push_float(name, suffix, convert(value), timestamp);
        }
    }

    fn push_rates(&mut self, name: &str, rates: &Rates, timestamp: u64) {
        let unit = self.config.rate_unit;
        let rates = [
            ("m1_rate", rates.m1),
            ("m5_rate", rates.m5),
            ("m15_rate", rates.m15),
            ("mean_rate", rates.mean),
        ];

        for (suffix, rate) in rates {
            self.push_float(name, suffix, unit.convert_rate(rate), timestamp);
        }
    }

    fn push_integer<I: itoa::Integer>(&mut self, name: &str, suffix: &str, value: I, timestamp: u64) {
        let formatted = self.formatter.format_integer(value);
        self.push(name, Some(suffix), formatted, timestamp);
    }

    fn push_float(&mut self, name: &str, suffix: &str, value: f64, timestamp: u64) {
        match self.formatter.format_float(value) {
            Some(formatted) => self.push(name, Some(suffix), formatted, timestamp),
            None => self.skip(name, Some(suffix)),
        }
    }

    fn push(&mut self, name: &str, suffix: Option<&str>, value: String, timestamp: u64) {
        let full_name = self.full_name(name, suffix);
        if full_name.is_empty() {
            self.skip_record(&full_name, "empty name");
            return;
        }

        self.series.add_discrete_time_value(DiscreteTimeValue::new(full_name, value, timestamp));
    }

    fn skip(&mut self, name: &str, suffix: Option<&str>) {
        let full_name = self.full_name(name, suffix);
        self.skip_record(&full_name, "no numeric form");
    }

    fn skip_record(&mut self, full_name: &str, reason: &'static str) {
        debug!(metric_name = full_name, reason, "Skipping value.");

        self.update.track_value_skipped();
        self.emit(&Diagnostic::ValueSkipped { name: full_name });
    }

    fn full_name(&self, name: &str, suffix: Option<&str>) -> String {
        self.config.prefixer.prefixed(std::iter::once(name).chain(suffix))
    }

    fn is_filtered(&self, name: &str, metric: MetricRef<'_>) -> bool {
        let filtered =
            self.config.filter.as_ref().is_some_and(|filter| !filter.matches(name, metric));
        if filtered {
            trace!(metric_name = name, family = metric.family(), "Metric excluded by filter.");
        }

        filtered
    }

    fn emit(&self, diagnostic: &Diagnostic<'_>) {
        emit(self.config.diagnostics.as_ref(), diagnostic);
    }
}

fn emit(sink: Option<&DiagnosticsSink>, diagnostic: &Diagnostic<'_>) {
    if let Some(sink) = sink {
        sink(diagnostic);
    }
}
