use std::slice::Iter;

/// A single timestamped reading.
///
/// The value is already formatted: consumers receive it exactly as it will be published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscreteTimeValue {
    name: String,
    value: String,
    timestamp: u64,
}

impl DiscreteTimeValue {
    /// Creates a new `DiscreteTimeValue`.
    ///
    /// `timestamp` is in seconds since the Unix epoch.
    pub fn new<N, V>(name: N, value: V, timestamp: u64) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        debug_assert!(!name.is_empty(), "metric names must not be empty");

        Self { name, value: value.into(), timestamp }
    }

    /// Gets the fully-qualified metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the formatted value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Gets the timestamp, in seconds since the Unix epoch.
    pub const fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// The records produced during one report cycle, in the order they were generated.
#[derive(Clone, Debug, Default)]
pub struct SeriesSet {
    discrete_time_values: Vec<DiscreteTimeValue>,
}

impl SeriesSet {
    /// Creates an empty `SeriesSet`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn add_discrete_time_value(&mut self, value: DiscreteTimeValue) {
        self.discrete_time_values.push(value);
    }

    /// Removes every record, keeping the allocation for the next cycle.
    pub fn reset_series(&mut self) {
        self.discrete_time_values.clear();
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.discrete_time_values.len()
    }

    /// Returns `true` if there are no records.
    pub fn is_empty(&self) -> bool {
        self.discrete_time_values.is_empty()
    }

    /// Gets all records in insertion order.
    pub fn discrete_time_values(&self) -> &[DiscreteTimeValue] {
        &self.discrete_time_values
    }

    /// Returns an iterator over the records in insertion order.
    pub fn iter(&self) -> Iter<'_, DiscreteTimeValue> {
        self.discrete_time_values.iter()
    }
}

impl<'a> IntoIterator for &'a SeriesSet {
    type Item = &'a DiscreteTimeValue;
    type IntoIter = Iter<'a, DiscreteTimeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<DiscreteTimeValue> for SeriesSet {
    fn extend<T: IntoIterator<Item = DiscreteTimeValue>>(&mut self, iter: T) {
        self.discrete_time_values.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::{DiscreteTimeValue, SeriesSet};

    fn series_with_one() -> SeriesSet {
        let mut series = SeriesSet::new();
        series.add_discrete_time_value(DiscreteTimeValue::new("test", "value", 1_700_000_000));
        series
    }

    #[test]
    fn is_empty() {
        assert!(SeriesSet::new().is_empty());
        assert!(!series_with_one().is_empty());
    }

    #[test]
    fn add_discrete_time_value() {
        let mut series = series_with_one();
        series.add_discrete_time_value(DiscreteTimeValue::new("test2", "value", 1_700_000_001));
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn reset_series() {
        let mut series = series_with_one();
        series.extend((0..16).map(|i| DiscreteTimeValue::new(format!("m{i}"), "1", i)));
        assert_eq!(series.len(), 17);

        series.reset_series();
        assert_eq!(series.len(), 0);
        assert!(series.is_empty());
        assert!(series.discrete_time_values().is_empty());
    }

    #[test]
    fn preserves_insertion_order() {
        let mut series = SeriesSet::new();
        let names = ["zeta", "alpha", "mu", "beta"];
        for (i, name) in names.iter().enumerate() {
            series.add_discrete_time_value(DiscreteTimeValue::new(*name, i.to_string(), 42));
        }

        let observed = series.iter().map(DiscreteTimeValue::name).collect::<Vec<_>>();
        assert_eq!(observed, names);

        let first = &series.discrete_time_values()[0];
        assert_eq!(first.value(), "0");
        assert_eq!(first.timestamp(), 42);
    }
}
