//! A reporter that periodically publishes a snapshot of application metrics as discrete, timestamped records over a
//! publish/subscribe transport such as [MQTT][mqtt].
//!
//! [mqtt]: https://mqtt.org/
//!
//! # Usage
//!
//! A reporter is built from an [`MqttReporterBuilder`] and a [`Sender`], which is the transport records are published
//! through. [`MqttSender`] publishes to an MQTT broker; any other transport can be plugged in by implementing
//! [`Sender`].
//!
//! ```no_run
//! # use metrics_exporter_mqtt::{MqttReporterBuilder, MqttSenderBuilder, QualityOfService, Snapshot, TimeUnit};
//! // First, create the sender, pointing it at the broker and the topic to publish to.
//! let sender = MqttSenderBuilder::new()
//!     .with_remote_address("broker.local:1883")
//!     .expect("invalid broker address")
//!     .with_topic("devices/device1/metrics")
//!     .expect("invalid topic")
//!     .build();
//!
//! // Then, create the reporter. Every metric name will be prefixed with `device1.`.
//! let mut reporter = MqttReporterBuilder::new()
//!     .with_prefix("device1")
//!     .convert_durations_to(TimeUnit::Milliseconds)
//!     .with_quality_of_service(QualityOfService::AtLeastOnce)
//!     .build(sender);
//!
//! // Each call to `report` runs one report cycle: connect, publish every record, disconnect.
//! let snapshot = Snapshot::new().with_gauge("temp", 21.567).with_counter("hits", 42);
//! reporter.report(&snapshot);
//! ```
//!
//! To report on a fixed interval, use [`MqttReporterBuilder::build_scheduled`] with a [`SnapshotSource`], which runs
//! report cycles on a background thread.
//!
//! # Records
//!
//! Each metric becomes one or more records, named `<prefix>.<metric>.<statistic>`:
//!
//! - gauges: a single record named after the gauge itself, skipped if its value isn't numeric
//! - counters: `count`
//! - histograms: `count`, `max`, `mean`, `min`, `stddev`, `p50`, `p75`, `p95`, `p98`, `p99`, `p999`
//! - meters: `count`, `m1_rate`, `m5_rate`, `m15_rate`, `mean_rate`
//! - timers: `max`, `mean`, `min`, `stddev`, `p50`, `p75`, `p95`, `p98`, `p99`, `p999`, `count`, `m1_rate`,
//!   `m5_rate`, `m15_rate`, `mean_rate`
//!
//! Integers are published as their exact digits, and everything else with two fractional digits. See [`formatting`]
//! for the details.
//!
//! # Failures
//!
//! No failure escapes a report cycle. If connecting fails, nothing is published; if publishing a record fails, only
//! that record is dropped; the sender is always disconnected at the end of the cycle. Failures are logged through
//! [`tracing`], and can be observed programmatically with [`MqttReporterBuilder::with_diagnostics`].
//!
//! # Telemetry
//!
//! The reporter emits counters about its own behavior through the [`metrics`] facade, all under the
//! `mqtt_reporter` namespace: cycles run, records published and dropped, values skipped, and connect/disconnect
//! failures.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod builder;
pub use self::builder::{BuildError, MqttReporterBuilder};

mod clock;
pub use self::clock::{Clock, ManualClock, SystemClock};

mod filter;
pub use self::filter::MetricFilter;

pub mod formatting;

mod mqtt;
pub use self::mqtt::{MqttSender, MqttSenderBuilder};

pub mod naming;

mod qos;
pub use self::qos::QualityOfService;

mod reporter;
pub use self::reporter::{Diagnostic, DiagnosticsSink, MqttReporter};

mod scheduler;
pub use self::scheduler::{ScheduledReporter, SnapshotSource};

mod sender;
pub use self::sender::{Call, PublishedRecord, RecordingSender, Sender, SenderError, SenderErrorKind};

mod series;
pub use self::series::{DiscreteTimeValue, SeriesSet};

mod snapshot;
pub use self::snapshot::{
    Counter, GaugeValue, Histogram, Meter, MetricRef, Rates, Snapshot, Statistics, Timer,
};

mod telemetry;

mod units;
pub use self::units::TimeUnit;
