//! # Corridor Value Objects
//!
//! Country codes, currency codes and the transfer corridor they form.
//!
//! Countries are stored as ISO-3166 alpha-2 in upper case. Alpha-3 codes are
//! accepted at construction and converted, so every cache key and storage row
//! uses the same representation. Currencies are ISO-4217 alpha-3 in upper case.
//!
//! # Examples
//!
//! ```
//! use remit_quotes::domain::value_objects::corridor::{CountryCode, Corridor};
//!
//! let mx = CountryCode::parse("MEX").unwrap();
//! assert_eq!(mx.as_str(), "MX");
//!
//! let corridor = Corridor::parse("us", "MX", "usd", "MXN").unwrap();
//! assert_eq!(corridor.to_string(), "US->MX (USD->MXN)");
//! ```

use crate::domain::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Alpha-3 to alpha-2 conversion table for the countries the system serves.
const ALPHA3_TO_ALPHA2: &[(&str, &str)] = &[
    ("ARE", "AE"),
    ("ARG", "AR"),
    ("AUS", "AU"),
    ("AUT", "AT"),
    ("BEL", "BE"),
    ("BGD", "BD"),
    ("BOL", "BO"),
    ("BRA", "BR"),
    ("CAN", "CA"),
    ("CHE", "CH"),
    ("CHL", "CL"),
    ("CHN", "CN"),
    ("CMR", "CM"),
    ("COL", "CO"),
    ("CRI", "CR"),
    ("DEU", "DE"),
    ("DNK", "DK"),
    ("DOM", "DO"),
    ("ECU", "EC"),
    ("EGY", "EG"),
    ("ESP", "ES"),
    ("ETH", "ET"),
    ("FIN", "FI"),
    ("FRA", "FR"),
    ("GBR", "GB"),
    ("GHA", "GH"),
    ("GTM", "GT"),
    ("HKG", "HK"),
    ("HND", "HN"),
    ("HTI", "HT"),
    ("IDN", "ID"),
    ("IND", "IN"),
    ("IRL", "IE"),
    ("ISR", "IL"),
    ("ITA", "IT"),
    ("JAM", "JM"),
    ("JOR", "JO"),
    ("JPN", "JP"),
    ("KEN", "KE"),
    ("KOR", "KR"),
    ("LBN", "LB"),
    ("LKA", "LK"),
    ("MAR", "MA"),
    ("MEX", "MX"),
    ("MYS", "MY"),
    ("NGA", "NG"),
    ("NIC", "NI"),
    ("NLD", "NL"),
    ("NOR", "NO"),
    ("NPL", "NP"),
    ("NZL", "NZ"),
    ("PAK", "PK"),
    ("PER", "PE"),
    ("PHL", "PH"),
    ("POL", "PL"),
    ("PRT", "PT"),
    ("QAT", "QA"),
    ("ROU", "RO"),
    ("SAU", "SA"),
    ("SEN", "SN"),
    ("SGP", "SG"),
    ("SLV", "SV"),
    ("SWE", "SE"),
    ("THA", "TH"),
    ("TUR", "TR"),
    ("TZA", "TZ"),
    ("UGA", "UG"),
    ("UKR", "UA"),
    ("USA", "US"),
    ("VNM", "VN"),
    ("ZAF", "ZA"),
    ("ZWE", "ZW"),
];

fn is_ascii_alpha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

/// ISO-3166 alpha-2 country code in upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Parses a country code, accepting alpha-2 or alpha-3 input in any case.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCountryCode` if the input is not two or
    /// three ASCII letters, or is an alpha-3 code outside the conversion table.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let code = input.trim().to_ascii_uppercase();
        if !is_ascii_alpha(&code) {
            return Err(DomainError::InvalidCountryCode(input.to_string()));
        }
        match code.len() {
            2 => Ok(Self(code)),
            3 => ALPHA3_TO_ALPHA2
                .iter()
                .find(|(alpha3, _)| *alpha3 == code)
                .map(|(_, alpha2)| Self((*alpha2).to_string()))
                .ok_or_else(|| DomainError::InvalidCountryCode(input.to_string())),
            _ => Err(DomainError::InvalidCountryCode(input.to_string())),
        }
    }

    /// Returns the alpha-3 form of this code, if it is in the conversion table.
    #[must_use]
    pub fn to_alpha3(&self) -> Option<&'static str> {
        ALPHA3_TO_ALPHA2
            .iter()
            .find(|(_, alpha2)| *alpha2 == self.0)
            .map(|(alpha3, _)| *alpha3)
    }

    /// Returns the alpha-2 code.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CountryCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

/// ISO-4217 alpha-3 currency code in upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parses a currency code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCurrencyCode` unless the input is exactly
    /// three ASCII letters.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let code = input.trim().to_ascii_uppercase();
        if code.len() == 3 && is_ascii_alpha(&code) {
            Ok(Self(code))
        } else {
            Err(DomainError::InvalidCurrencyCode(input.to_string()))
        }
    }

    /// Returns the currency code.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// A transfer lane: source/destination country and currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Corridor {
    source_country: CountryCode,
    dest_country: CountryCode,
    source_currency: CurrencyCode,
    dest_currency: CurrencyCode,
}

impl Corridor {
    /// Creates a corridor from validated codes.
    #[must_use]
    pub fn new(
        source_country: CountryCode,
        dest_country: CountryCode,
        source_currency: CurrencyCode,
        dest_currency: CurrencyCode,
    ) -> Self {
        Self {
            source_country,
            dest_country,
            source_currency,
            dest_currency,
        }
    }

    /// Parses a corridor from raw codes.
    ///
    /// # Errors
    ///
    /// Returns the first `DomainError` raised by any of the four codes.
    pub fn parse(
        source_country: &str,
        dest_country: &str,
        source_currency: &str,
        dest_currency: &str,
    ) -> DomainResult<Self> {
        Ok(Self::new(
            CountryCode::parse(source_country)?,
            CountryCode::parse(dest_country)?,
            CurrencyCode::parse(source_currency)?,
            CurrencyCode::parse(dest_currency)?,
        ))
    }

    /// Returns the source country.
    #[inline]
    #[must_use]
    pub fn source_country(&self) -> &CountryCode {
        &self.source_country
    }

    /// Returns the destination country.
    #[inline]
    #[must_use]
    pub fn dest_country(&self) -> &CountryCode {
        &self.dest_country
    }

    /// Returns the source currency.
    #[inline]
    #[must_use]
    pub fn source_currency(&self) -> &CurrencyCode {
        &self.source_currency
    }

    /// Returns the destination currency.
    #[inline]
    #[must_use]
    pub fn dest_currency(&self) -> &CurrencyCode {
        &self.dest_currency
    }
}

impl fmt::Display for Corridor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{} ({}->{})",
            self.source_country, self.dest_country, self.source_currency, self.dest_currency
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod country_code {
        use super::*;

        #[test]
        fn alpha2_is_uppercased() {
            assert_eq!(CountryCode::parse("us").unwrap().as_str(), "US");
            assert_eq!(CountryCode::parse(" mx ").unwrap().as_str(), "MX");
        }

        #[test]
        fn alpha3_is_converted() {
            assert_eq!(CountryCode::parse("USA").unwrap().as_str(), "US");
            assert_eq!(CountryCode::parse("gbr").unwrap().as_str(), "GB");
        }

        #[test]
        fn unknown_alpha3_rejected() {
            assert!(matches!(
                CountryCode::parse("XXX"),
                Err(DomainError::InvalidCountryCode(_))
            ));
        }

        #[test]
        fn malformed_rejected() {
            for bad in ["", "U", "U1", "USAA", "1234", "U S"] {
                assert!(CountryCode::parse(bad).is_err(), "{bad} should be rejected");
            }
        }

        #[test]
        fn to_alpha3() {
            let code = CountryCode::parse("PH").unwrap();
            assert_eq!(code.to_alpha3(), Some("PHL"));
        }

        #[test]
        fn serde_validates() {
            let code: CountryCode = serde_json::from_str("\"MEX\"").unwrap();
            assert_eq!(code.as_str(), "MX");
            assert!(serde_json::from_str::<CountryCode>("\"12\"").is_err());
        }
    }

    mod currency_code {
        use super::*;

        #[test]
        fn parse_valid() {
            assert_eq!(CurrencyCode::parse("usd").unwrap().as_str(), "USD");
        }

        #[test]
        fn parse_invalid() {
            for bad in ["", "US", "USDT", "U$D", "123"] {
                assert!(CurrencyCode::parse(bad).is_err(), "{bad} should be rejected");
            }
        }
    }

    mod corridor {
        use super::*;

        #[test]
        fn parse_and_accessors() {
            let c = Corridor::parse("USA", "mx", "usd", "mxn").unwrap();
            assert_eq!(c.source_country().as_str(), "US");
            assert_eq!(c.dest_country().as_str(), "MX");
            assert_eq!(c.source_currency().as_str(), "USD");
            assert_eq!(c.dest_currency().as_str(), "MXN");
        }

        #[test]
        fn parse_reports_first_bad_field() {
            let err = Corridor::parse("US", "MX", "USD", "PESO").unwrap_err();
            assert_eq!(err, DomainError::InvalidCurrencyCode("PESO".to_string()));
        }

        #[test]
        fn display() {
            let c = Corridor::parse("US", "MX", "USD", "MXN").unwrap();
            assert_eq!(c.to_string(), "US->MX (USD->MXN)");
        }
    }
}
