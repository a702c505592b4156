use std::{fmt, str::FromStr};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// A unit of time used to scale reported rates and durations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    /// Nanoseconds.
    Nanoseconds,
    /// Microseconds.
    Microseconds,
    /// Milliseconds.
    Milliseconds,
    /// Seconds.
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// Days.
    Days,
}

impl TimeUnit {
    /// Returns the number of nanoseconds in one of this unit.
    pub const fn as_nanos(self) -> u64 {
        match self {
            TimeUnit::Nanoseconds => 1,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Milliseconds => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
            TimeUnit::Minutes => 60 * 1_000_000_000,
            TimeUnit::Hours => 60 * 60 * 1_000_000_000,
            TimeUnit::Days => 24 * 60 * 60 * 1_000_000_000,
        }
    }

    /// Gets the factor that converts a per-second rate into a rate per this unit.
    pub fn rate_factor(self) -> f64 {
        self.as_nanos() as f64 / NANOS_PER_SECOND
    }

    /// Converts a rate in events per second into events per this unit.
    pub fn convert_rate(self, per_second: f64) -> f64 {
        per_second * self.rate_factor()
    }

    /// Converts a duration in nanoseconds into this unit.
    pub fn convert_duration(self, nanos: f64) -> f64 {
        nanos / self.as_nanos() as f64
    }

    /// Gets the string form of this unit.
    pub const fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "nanoseconds",
            TimeUnit::Microseconds => "microseconds",
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        }
    }

    /// Gets the singular form of this unit, as used in rate labels such as "events/second".
    pub fn singular(self) -> &'static str {
        let plural = self.as_str();
        &plural[..plural.len() - 1]
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ns" | "nanoseconds" => Ok(TimeUnit::Nanoseconds),
            "us" | "microseconds" => Ok(TimeUnit::Microseconds),
            "ms" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            "s" | "seconds" => Ok(TimeUnit::Seconds),
            "m" | "minutes" => Ok(TimeUnit::Minutes),
            "h" | "hours" => Ok(TimeUnit::Hours),
            "d" | "days" => Ok(TimeUnit::Days),
            other => Err(format!("unknown time unit '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TimeUnit;

    #[test]
    fn rate_factor() {
        assert_eq!(TimeUnit::Seconds.rate_factor(), 1.0);
        assert_eq!(TimeUnit::Minutes.rate_factor(), 60.0);
        assert_eq!(TimeUnit::Hours.rate_factor(), 3600.0);
        assert_eq!(TimeUnit::Milliseconds.rate_factor(), 0.001);
    }

    #[test]
    fn convert_rate() {
        assert_eq!(TimeUnit::Seconds.convert_rate(2.0), 2.0);
        assert_eq!(TimeUnit::Minutes.convert_rate(2.0), 120.0);
    }

    #[test]
    fn convert_duration() {
        let nanos = 2_500_000.0;
        assert_eq!(TimeUnit::Nanoseconds.convert_duration(nanos), 2_500_000.0);
        assert_eq!(TimeUnit::Milliseconds.convert_duration(nanos), 2.5);
        assert_eq!(TimeUnit::Microseconds.convert_duration(nanos), 2_500.0);
    }

    #[test]
    fn parse_and_label() {
        assert_eq!("ms".parse::<TimeUnit>(), Ok(TimeUnit::Milliseconds));
        assert_eq!("Seconds".parse::<TimeUnit>(), Ok(TimeUnit::Seconds));
        assert!("fortnights".parse::<TimeUnit>().is_err());

        assert_eq!(TimeUnit::Seconds.singular(), "second");
        assert_eq!(TimeUnit::Days.to_string(), "days");
    }
}
