use metrics_exporter_mqtt::{MqttReporterBuilder, RecordingSender, Snapshot};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

fn counter_value(snapshotter: &Snapshotter, name: &str) -> Option<u64> {
    snapshotter.snapshot().into_vec().into_iter().find_map(|(key, _, _, value)| {
        match value {
            DebugValue::Counter(count) if key.key().name() == name => Some(count),
            _ => None,
        }
    })
}

#[test]
fn cycles_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let sender = RecordingSender::new();
    sender.fail_publish(2);
    let mut reporter = MqttReporterBuilder::new().build(sender.clone());

    let snapshot = Snapshot::new().with_counter("hits", 1).with_gauge("temp", 2).with_gauge("status", "up");
    metrics::with_local_recorder(&recorder, || {
        reporter.report(&snapshot);
        reporter.report(&snapshot);
    });

    assert_eq!(counter_value(&snapshotter, "mqtt_reporter.cycles"), Some(2));
    // Each cycle publishes "temp" and "hits.count"; only the second publish attempt overall fails.
    assert_eq!(counter_value(&snapshotter, "mqtt_reporter.records_published"), Some(3));
    assert_eq!(counter_value(&snapshotter, "mqtt_reporter.records_dropped"), Some(1));
    assert_eq!(counter_value(&snapshotter, "mqtt_reporter.values_skipped"), Some(2));
    assert_eq!(counter_value(&snapshotter, "mqtt_reporter.connect_failures"), Some(0));
    assert_eq!(counter_value(&snapshotter, "mqtt_reporter.disconnect_failures"), Some(0));
}

#[test]
fn connect_failures_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let sender = RecordingSender::new();
    sender.fail_connect(true);
    let mut reporter = MqttReporterBuilder::new().build(sender);

    metrics::with_local_recorder(&recorder, || {
        reporter.report(&Snapshot::new().with_counter("hits", 1));
    });

    assert_eq!(counter_value(&snapshotter, "mqtt_reporter.cycles"), Some(1));
    assert_eq!(counter_value(&snapshotter, "mqtt_reporter.connect_failures"), Some(1));
    assert_eq!(counter_value(&snapshotter, "mqtt_reporter.records_published"), Some(0));
    // The missing session is expected after a failed connect, so it isn't a disconnect failure.
    assert_eq!(counter_value(&snapshotter, "mqtt_reporter.disconnect_failures"), Some(0));
}
