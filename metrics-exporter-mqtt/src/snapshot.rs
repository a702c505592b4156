//! Point-in-time readings handed to the reporter by a metrics registry.
//!
//! The reporter never owns or mutates these structures: it reads one [`Snapshot`] per report cycle. Every family is
//! held in a [`BTreeMap`], so iteration is always in alphabetical order of the metric name.
use std::collections::BTreeMap;

use rust_decimal::Decimal;

/// The current value of a gauge.
///
/// Gauges may hold any kind of value. Only the numeric variants can be reported; the rest are skipped.
#[derive(Clone, Debug, PartialEq)]
pub enum GaugeValue {
    /// Signed 8-bit integer.
    I8(i8),
    /// Signed 16-bit integer.
    I16(i16),
    /// Signed 32-bit integer.
    I32(i32),
    /// Signed 64-bit integer.
    I64(i64),
    /// Signed 128-bit integer.
    I128(i128),
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// Unsigned 128-bit integer.
    U128(u128),
    /// Single-precision floating point.
    F32(f32),
    /// Double-precision floating point.
    F64(f64),
    /// Arbitrary-precision decimal.
    Decimal(Decimal),
    /// Boolean. Not reportable.
    Bool(bool),
    /// Free-form text. Not reportable.
    Text(String),
}

impl GaugeValue {
    /// Returns `true` if this value is one of the numeric variants.
    pub const fn is_numeric(&self) -> bool {
        !matches!(self, GaugeValue::Bool(_) | GaugeValue::Text(_))
    }
}

macro_rules! impl_gauge_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for GaugeValue {
                fn from(value: $ty) -> Self {
                    GaugeValue::$variant(value)
                }
            }
        )*
    };
}

impl_gauge_value_from!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64, i128 => I128,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, u128 => U128,
    f32 => F32, f64 => F64, Decimal => Decimal, bool => Bool, String => Text,
);

impl From<&str> for GaugeValue {
    fn from(value: &str) -> Self {
        GaugeValue::Text(value.to_string())
    }
}

/// A monotonic or up/down count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counter {
    /// Current count.
    pub count: i64,
}

impl Counter {
    /// Creates a new `Counter` with the given count.
    pub const fn new(count: i64) -> Self {
        Self { count }
    }
}

/// Statistical summary of a distribution of values.
///
/// Minimum and maximum are integral samples; the remaining fields are derived and therefore floating point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Statistics {
    /// Smallest sample.
    pub min: i64,
    /// Largest sample.
    pub max: i64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Standard deviation.
    pub stddev: f64,
    /// 50th percentile.
    pub median: f64,
    /// 75th percentile.
    pub p75: f64,
    /// 95th percentile.
    pub p95: f64,
    /// 98th percentile.
    pub p98: f64,
    /// 99th percentile.
    pub p99: f64,
    /// 99.9th percentile.
    pub p999: f64,
}

/// Exponentially-weighted and mean rates, in events per second.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rates {
    /// One-minute moving average.
    pub m1: f64,
    /// Five-minute moving average.
    pub m5: f64,
    /// Fifteen-minute moving average.
    pub m15: f64,
    /// Mean rate since creation.
    pub mean: f64,
}

/// A distribution of values.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Histogram {
    /// Number of samples recorded.
    pub count: u64,
    /// Summary of the recorded samples.
    pub snapshot: Statistics,
}

/// A rate of events.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Meter {
    /// Number of events marked.
    pub count: u64,
    /// Event rates, per second.
    pub rates: Rates,
}

/// A distribution of durations along with the rate at which they were recorded.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Timer {
    /// Number of durations recorded.
    pub count: u64,
    /// Summary of the recorded durations, in nanoseconds.
    pub snapshot: Statistics,
    /// Recording rates, per second.
    pub rates: Rates,
}

/// A borrowed reference to a single metric of any family.
#[derive(Clone, Copy, Debug)]
pub enum MetricRef<'a> {
    /// A gauge.
    Gauge(&'a GaugeValue),
    /// A counter.
    Counter(&'a Counter),
    /// A histogram.
    Histogram(&'a Histogram),
    /// A meter.
    Meter(&'a Meter),
    /// A timer.
    Timer(&'a Timer),
}

impl MetricRef<'_> {
    /// Gets the name of the metric family.
    pub const fn family(&self) -> &'static str {
        match self {
            MetricRef::Gauge(_) => "gauge",
            MetricRef::Counter(_) => "counter",
            MetricRef::Histogram(_) => "histogram",
            MetricRef::Meter(_) => "meter",
            MetricRef::Timer(_) => "timer",
        }
    }
}

/// A point-in-time view of every metric in a registry, grouped by family.
///
/// Names are unique within a family, but the same name may appear in more than one family.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// Gauges, by name.
    pub gauges: BTreeMap<String, GaugeValue>,
    /// Counters, by name.
    pub counters: BTreeMap<String, Counter>,
    /// Histograms, by name.
    pub histograms: BTreeMap<String, Histogram>,
    /// Meters, by name.
    pub meters: BTreeMap<String, Meter>,
    /// Timers, by name.
    pub timers: BTreeMap<String, Timer>,
}

impl Snapshot {
    /// Creates an empty `Snapshot`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a gauge.
    #[must_use]
    pub fn with_gauge<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<GaugeValue>,
    {
        self.gauges.insert(name.into(), value.into());
        self
    }

    /// Adds a counter.
    #[must_use]
    pub fn with_counter<N: Into<String>>(mut self, name: N, count: i64) -> Self {
        self.counters.insert(name.into(), Counter::new(count));
        self
    }

    /// Adds a histogram.
    #[must_use]
    pub fn with_histogram<N: Into<String>>(mut self, name: N, histogram: Histogram) -> Self {
        self.histograms.insert(name.into(), histogram);
        self
    }

    /// Adds a meter.
    #[must_use]
    pub fn with_meter<N: Into<String>>(mut self, name: N, meter: Meter) -> Self {
        self.meters.insert(name.into(), meter);
        self
    }

    /// Adds a timer.
    #[must_use]
    pub fn with_timer<N: Into<String>>(mut self, name: N, timer: Timer) -> Self {
        self.timers.insert(name.into(), timer);
        self
    }

    /// Returns the total number of metrics across all families.
    pub fn len(&self) -> usize {
        self.gauges.len()
            + self.counters.len()
            + self.histograms.len()
            + self.meters.len()
            + self.timers.len()
    }

    /// Returns `true` if no family holds any metric.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{GaugeValue, MetricRef, Snapshot};

    #[test]
    fn gauge_value_conversions() {
        assert_eq!(GaugeValue::from(7u8), GaugeValue::U8(7));
        assert_eq!(GaugeValue::from(-7i128), GaugeValue::I128(-7));
        assert_eq!(GaugeValue::from(1.5f32), GaugeValue::F32(1.5));
        assert_eq!(GaugeValue::from(Decimal::new(125, 2)), GaugeValue::Decimal(Decimal::new(125, 2)));
        assert_eq!(GaugeValue::from("up"), GaugeValue::Text("up".to_string()));

        assert!(GaugeValue::from(0.0f64).is_numeric());
        assert!(!GaugeValue::from(true).is_numeric());
        assert!(!GaugeValue::from("up").is_numeric());
        assert_eq!(MetricRef::Gauge(&GaugeValue::from(1u8)).family(), "gauge");
    }

    #[test]
    fn families_iterate_alphabetically() {
        let snapshot = Snapshot::new()
            .with_counter("zebra", 1)
            .with_counter("apple", 2)
            .with_counter("mango", 3)
            .with_gauge("mango", 4.0);

        let names = snapshot.counters.keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(names, ["apple", "mango", "zebra"]);
        assert_eq!(snapshot.len(), 4);
        assert!(!snapshot.is_empty());
        assert!(Snapshot::new().is_empty());
    }
}
