use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use metrics_exporter_mqtt::{
    Diagnostic, MqttReporterBuilder, MqttSenderBuilder, QualityOfService, Snapshot,
};

fn main() {
    tracing_subscriber::fmt::init();

    let sender = MqttSenderBuilder::new()
        .with_remote_address("localhost:1883")
        .expect("failed to parse remote address")
        .with_topic("devices/example/metrics")
        .expect("invalid topic")
        .build();

    let iterations = Arc::new(AtomicI64::new(0));
    let started = Instant::now();

    let source_iterations = Arc::clone(&iterations);
    let source = move || {
        Snapshot::new()
            .with_counter("loop_iterations", source_iterations.load(Ordering::Relaxed))
            .with_gauge("uptime_secs", started.elapsed().as_secs_f64())
    };

    let _reporter = MqttReporterBuilder::new()
        .with_prefix("example")
        .with_quality_of_service(QualityOfService::AtLeastOnce)
        .with_diagnostics(|diagnostic: &Diagnostic<'_>| {
            if let Diagnostic::CycleCompleted { records_published, records_dropped, .. } = diagnostic {
                println!("published {} records, dropped {}", records_published, records_dropped);
            }
        })
        .build_scheduled(sender, source, Duration::from_secs(5))
        .expect("failed to start reporter");

    // Loop over and over, pretending to do some work.
    loop {
        iterations.fetch_add(1, Ordering::Relaxed);
        std::thread::sleep(Duration::from_millis(100));
    }
}
