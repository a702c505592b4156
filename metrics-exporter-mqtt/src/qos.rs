use std::fmt;

/// Delivery guarantee requested for every published record.
///
/// Each level carries the numeric code used on the wire by the transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum QualityOfService {
    /// The record is delivered at most once, with no acknowledgement.
    AtMostOnce,

    /// The record is delivered at least once, and may be duplicated.
    AtLeastOnce,

    /// The record is delivered exactly once.
    #[default]
    ExactlyOnce,
}

impl QualityOfService {
    /// Returns the transport code for this level.
    pub const fn code(self) -> u8 {
        match self {
            QualityOfService::AtMostOnce => 0,
            QualityOfService::AtLeastOnce => 1,
            QualityOfService::ExactlyOnce => 2,
        }
    }

    /// Gets the level matching the given transport code, if any.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(QualityOfService::AtMostOnce),
            1 => Some(QualityOfService::AtLeastOnce),
            2 => Some(QualityOfService::ExactlyOnce),
            _ => None,
        }
    }

    /// Gets the string form of this level.
    pub const fn as_str(self) -> &'static str {
        match self {
            QualityOfService::AtMostOnce => "at_most_once",
            QualityOfService::AtLeastOnce => "at_least_once",
            QualityOfService::ExactlyOnce => "exactly_once",
        }
    }
}

impl fmt::Display for QualityOfService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
