use std::{
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender as ShutdownSender};
use tracing::{debug, error, trace};

use crate::{builder::BuildError, reporter::MqttReporter, sender::Sender, snapshot::Snapshot};

/// A source of metric snapshots, such as a metrics registry.
pub trait SnapshotSource: Send {
    /// Takes a point-in-time snapshot of every metric.
    fn snapshot(&mut self) -> Snapshot;
}

impl<F> SnapshotSource for F
where
    F: FnMut() -> Snapshot + Send,
{
    fn snapshot(&mut self) -> Snapshot {
        self()
    }
}

/// A reporter running on a background thread, reporting once per interval.
///
/// The first cycle runs one interval after the reporter is spawned. Cycles run back to back on the same thread, so
/// they never overlap: if a cycle takes longer than the interval, the next one starts as soon as it finishes.
///
/// Dropping a `ScheduledReporter` stops it and waits for any in-flight cycle to finish.
pub struct ScheduledReporter<S> {
    interval: Duration,
    shutdown_tx: Option<ShutdownSender<()>>,
    handle: Option<JoinHandle<MqttReporter<S>>>,
}

impl<S> ScheduledReporter<S>
where
    S: Sender + Send + 'static,
{
    pub(crate) fn spawn<P>(
        reporter: MqttReporter<S>,
        source: P,
        interval: Duration,
    ) -> Result<Self, BuildError>
    where
        P: SnapshotSource + 'static,
    {
        let (shutdown_tx, shutdown_rx) = bounded(1);

        let handle = thread::Builder::new()
            .name("metrics-exporter-mqtt-reporter".to_string())
            .spawn(move || run(reporter, source, interval, &shutdown_rx))
            .map_err(|_| BuildError::Backend)?;

        Ok(ScheduledReporter { interval, shutdown_tx: Some(shutdown_tx), handle: Some(handle) })
    }

    /// Gets the reporting interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stops the reporter, waiting for any in-flight cycle to finish.
    ///
    /// Returns the reporter so that it can be inspected or run manually, or `None` if the background thread panicked.
    pub fn stop(mut self) -> Option<MqttReporter<S>> {
        self.shutdown()
    }
}

impl<S> ScheduledReporter<S> {
    fn shutdown(&mut self) -> Option<MqttReporter<S>> {
        // Dropping the sending side wakes the background thread even if it is not waiting yet.
        drop(self.shutdown_tx.take());

        let handle = self.handle.take()?;
        match handle.join() {
            Ok(reporter) => Some(reporter),
            Err(_) => {
                error!("Scheduled reporter thread panicked.");
                None
            }
        }
    }
}

impl<S> Drop for ScheduledReporter<S> {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn run<S, P>(
    mut reporter: MqttReporter<S>,
    mut source: P,
    interval: Duration,
    shutdown_rx: &Receiver<()>,
) -> MqttReporter<S>
where
    S: Sender,
    P: SnapshotSource,
{
    debug!(?interval, "Scheduled reporter started.");

    let mut next_report = Instant::now() + interval;
    loop {
        // Wait until our target report deadline, or until we're told to stop.
        //
        // If the previous cycle took longer than the interval, we won't wait at all.
        let wait = next_report.saturating_duration_since(Instant::now());
        match shutdown_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        next_report = Instant::now() + interval;

        let snapshot = source.snapshot();
        trace!(metrics = snapshot.len(), "Running scheduled report cycle.");
        reporter.report(&snapshot);
    }

    debug!("Scheduled reporter stopped.");
    reporter
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::{Duration, Instant},
    };

    use crate::{
        builder::MqttReporterBuilder,
        sender::{RecordingSender, Sender as _},
        snapshot::Snapshot,
    };

    #[test]
    fn reports_periodically_until_stopped() {
        let sender = RecordingSender::new();
        let snapshots = Arc::new(AtomicUsize::new(0));

        let source = {
            let snapshots = Arc::clone(&snapshots);
            move || {
                snapshots.fetch_add(1, Ordering::SeqCst);
                Snapshot::new().with_counter("ticks", 1)
            }
        };

        let scheduled = MqttReporterBuilder::new()
            .build_scheduled(sender.clone(), source, Duration::from_millis(10))
            .expect("should spawn scheduled reporter");
        assert_eq!(scheduled.interval(), Duration::from_millis(10));

        let deadline = Instant::now() + Duration::from_secs(10);
        while snapshots.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        let reporter = scheduled.stop().expect("reporter thread should not panic");
        let cycles = snapshots.load(Ordering::SeqCst);
        assert!(cycles >= 3, "only {} cycles ran", cycles);

        // Every cycle connects, publishes one record, and disconnects.
        assert_eq!(sender.connect_calls(), cycles);
        assert_eq!(sender.disconnect_calls(), cycles);
        assert_eq!(sender.published().len(), cycles);
        assert!(!reporter.sender().is_connected());

        // No more cycles run once stopped.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(snapshots.load(Ordering::SeqCst), cycles);
    }

    #[test]
    fn dropping_stops_the_thread() {
        let sender = RecordingSender::new();
        let scheduled = MqttReporterBuilder::new()
            .build_scheduled(sender.clone(), Snapshot::new, Duration::from_secs(3600))
            .expect("should spawn scheduled reporter");

        let started = Instant::now();
        drop(scheduled);

        assert!(started.elapsed() < Duration::from_secs(60));
        assert!(sender.calls().is_empty());
    }
}
