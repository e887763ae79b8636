//! # Domain Enums
//!
//! Enumeration types for domain concepts.
//!
//! - [`SortBy`] - Ranking criterion requested by the caller
//! - [`CorridorAvailability`] - Whether any provider serves a corridor
//!
//! All enums implement `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`,
//! `Display`, `FromStr`, and Serde traits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ranking criterion for quotes.
///
/// # Examples
///
/// ```
/// use remit_quotes::domain::value_objects::enums::SortBy;
///
/// let sort: SortBy = "lowest_fee".parse().unwrap();
/// assert_eq!(sort, SortBy::LowestFee);
/// assert_eq!(SortBy::default(), SortBy::BestRate);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Highest exchange rate first.
    #[default]
    BestRate,
    /// Lowest fee first.
    LowestFee,
    /// Fastest delivery first.
    FastestTime,
    /// Highest rate after fee penalty first.
    BestValue,
}

impl SortBy {
    /// Returns the wire name of this criterion.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BestRate => "best_rate",
            Self::LowestFee => "lowest_fee",
            Self::FastestTime => "fastest_time",
            Self::BestValue => "best_value",
        }
    }

    /// Parses a criterion, falling back to [`SortBy::BestRate`] for unknown input.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "best_rate" | "rate" => Ok(Self::BestRate),
            "lowest_fee" | "fee" => Ok(Self::LowestFee),
            "fastest_time" | "time" | "speed" => Ok(Self::FastestTime),
            "best_value" | "value" => Ok(Self::BestValue),
            _ => Err(ParseEnumError::InvalidValue("SortBy", s.to_string())),
        }
    }
}

/// Availability state of a corridor.
///
/// Starts as `Unknown`; a full provider fan-out moves it to `Available` when at
/// least one provider succeeded, `Unavailable` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorridorAvailability {
    /// No availability information cached.
    #[default]
    Unknown,
    /// At least one provider served the corridor.
    Available,
    /// No provider served the corridor.
    Unavailable,
}

impl CorridorAvailability {
    /// Maps a success flag to a known state.
    #[inline]
    #[must_use]
    pub const fn from_success(any_success: bool) -> Self {
        if any_success {
            Self::Available
        } else {
            Self::Unavailable
        }
    }

    /// Returns true if the corridor is known to be unavailable.
    #[inline]
    #[must_use]
    pub const fn is_unavailable(self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

impl fmt::Display for CorridorAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::Available => write!(f, "AVAILABLE"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
        }
    }
}

impl FromStr for CorridorAvailability {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNKNOWN" => Ok(Self::Unknown),
            "AVAILABLE" => Ok(Self::Available),
            "UNAVAILABLE" => Ok(Self::Unavailable),
            _ => Err(ParseEnumError::InvalidValue(
                "CorridorAvailability",
                s.to_string(),
            )),
        }
    }
}

/// Error type for parsing enum values from strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEnumError {
    /// The provided string value is not valid for the enum.
    InvalidValue(&'static str, String),
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue(enum_name, value) => {
                write!(f, "invalid {} value: '{}'", enum_name, value)
            }
        }
    }
}

impl std::error::Error for ParseEnumError {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod sort_by {
        use super::*;

        #[test]
        fn from_str_all_variants() {
            assert_eq!("best_rate".parse::<SortBy>().unwrap(), SortBy::BestRate);
            assert_eq!("LOWEST_FEE".parse::<SortBy>().unwrap(), SortBy::LowestFee);
            assert_eq!(
                "fastest-time".parse::<SortBy>().unwrap(),
                SortBy::FastestTime
            );
            assert_eq!("best_value".parse::<SortBy>().unwrap(), SortBy::BestValue);
        }

        #[test]
        fn from_str_invalid() {
            let err = "cheapest".parse::<SortBy>().unwrap_err();
            assert_eq!(err.to_string(), "invalid SortBy value: 'cheapest'");
        }

        #[test]
        fn lenient_falls_back_to_best_rate() {
            assert_eq!(SortBy::parse_lenient("nonsense"), SortBy::BestRate);
            assert_eq!(SortBy::parse_lenient("best_value"), SortBy::BestValue);
        }

        #[test]
        fn display_roundtrip() {
            for sort in [
                SortBy::BestRate,
                SortBy::LowestFee,
                SortBy::FastestTime,
                SortBy::BestValue,
            ] {
                assert_eq!(sort.to_string().parse::<SortBy>().unwrap(), sort);
            }
        }

        #[test]
        fn serde_snake_case() {
            let json = serde_json::to_string(&SortBy::FastestTime).unwrap();
            assert_eq!(json, "\"fastest_time\"");
        }
    }

    mod corridor_availability {
        use super::*;

        #[test]
        fn from_success() {
            assert_eq!(
                CorridorAvailability::from_success(true),
                CorridorAvailability::Available
            );
            assert!(CorridorAvailability::from_success(false).is_unavailable());
        }

        #[test]
        fn default_is_unknown() {
            assert_eq!(
                CorridorAvailability::default(),
                CorridorAvailability::Unknown
            );
        }

        #[test]
        fn from_str() {
            assert_eq!(
                "available".parse::<CorridorAvailability>().unwrap(),
                CorridorAvailability::Available
            );
            assert!("maybe".parse::<CorridorAvailability>().is_err());
        }
    }
}
