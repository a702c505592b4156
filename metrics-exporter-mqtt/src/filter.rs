use crate::snapshot::MetricRef;

/// Decides which metrics take part in a report cycle.
///
/// Metrics that do not match are excluded from the cycle entirely.
pub trait MetricFilter: Send + Sync {
    /// Returns `true` if the metric should be reported.
    fn matches(&self, name: &str, metric: MetricRef<'_>) -> bool;
}

impl<F> MetricFilter for F
where
    F: Fn(&str, MetricRef<'_>) -> bool + Send + Sync,
{
    fn matches(&self, name: &str, metric: MetricRef<'_>) -> bool {
        self(name, metric)
    }
}

#[cfg(test)]
mod tests {
    use super::MetricFilter;
    use crate::snapshot::{Counter, GaugeValue, MetricRef};

    fn only_counters(_: &str, metric: MetricRef<'_>) -> bool {
        matches!(metric, MetricRef::Counter(_))
    }

    #[test]
    fn functions_and_closures_are_filters() {
        let counter = Counter::new(1);
        let gauge = GaugeValue::I32(1);

        let by_family: &dyn MetricFilter = &only_counters;
        assert!(by_family.matches("hits", MetricRef::Counter(&counter)));
        assert!(!by_family.matches("temp", MetricRef::Gauge(&gauge)));

        let by_name = |name: &str, _: MetricRef<'_>| name.starts_with("jvm.");
        assert!(by_name.matches("jvm.threads", MetricRef::Gauge(&gauge)));
        assert!(!by_name.matches("db.threads", MetricRef::Gauge(&gauge)));
    }
}
