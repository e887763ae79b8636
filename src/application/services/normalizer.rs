//! # Response Normalizer
//!
//! Maps heterogeneous provider output onto one canonical [`Quote`] shape.
//!
//! Providers spell the same payment and delivery methods in many ways and
//! report numbers as strings, integers or floats. Everything here is pure:
//! no function fails, and [`normalize_quote`] is idempotent.

use crate::domain::entities::quote::{Quote, compute_destination_amount};
use crate::domain::value_objects::amount::parse_decimal;
use serde_json::Value;
use std::collections::HashMap;

/// Synonym → canonical method name. Keys are in lookup form (see [`lookup_form`]).
const METHOD_SYNONYMS: &[(&str, &str)] = &[
    ("bank", "bank_transfer"),
    ("bank_account", "bank_transfer"),
    ("bank_transfer", "bank_transfer"),
    ("banktransfer", "bank_transfer"),
    ("ach", "bank_transfer"),
    ("wire", "bank_transfer"),
    ("wire_transfer", "bank_transfer"),
    ("debit", "debit_card"),
    ("debit_card", "debit_card"),
    ("debitcard", "debit_card"),
    ("credit", "credit_card"),
    ("credit_card", "credit_card"),
    ("creditcard", "credit_card"),
    ("cash", "cash_pickup"),
    ("cash_pickup", "cash_pickup"),
    ("cash_collection", "cash_pickup"),
    ("pickup", "cash_pickup"),
    ("wallet", "mobile_wallet"),
    ("mobile_wallet", "mobile_wallet"),
    ("mobile_money", "mobile_wallet"),
    ("ewallet", "mobile_wallet"),
    ("e_wallet", "mobile_wallet"),
    ("deposit", "bank_deposit"),
    ("bank_deposit", "bank_deposit"),
    ("account_deposit", "bank_deposit"),
    ("home_delivery", "home_delivery"),
    ("door_to_door", "home_delivery"),
];

/// Lower-cases and joins words with `_` so "Bank Account" and "bank-account"
/// share one lookup key.
fn lookup_form(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Returns the canonical name of a payment or delivery method.
///
/// Lookup is case-insensitive and ignores separators. Unknown methods are
/// returned trimmed but otherwise unchanged.
///
/// # Examples
///
/// ```
/// use remit_quotes::application::services::normalizer::standardize_method;
///
/// assert_eq!(standardize_method("Bank Account"), "bank_transfer");
/// assert_eq!(standardize_method(" carrier pigeon "), "carrier pigeon");
/// ```
#[must_use]
pub fn standardize_method(s: &str) -> String {
    let key = lookup_form(s);
    METHOD_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == key)
        .map_or_else(|| s.trim().to_string(), |(_, canonical)| (*canonical).to_string())
}

/// Coerces a JSON scalar into a finite `f64`.
///
/// Numbers are taken as is, strings are parsed with thousands separators
/// stripped, everything else (and any non-finite result) is `None`.
#[must_use]
pub fn normalize_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => normalize_numeric_str(s),
        _ => None,
    }
}

/// String form of [`normalize_numeric`].
///
/// # Examples
///
/// ```
/// use remit_quotes::application::services::normalizer::normalize_numeric_str;
///
/// assert_eq!(normalize_numeric_str("1,234.50"), Some(1234.5));
/// assert_eq!(normalize_numeric_str("n/a"), None);
/// ```
#[must_use]
pub fn normalize_numeric_str(s: &str) -> Option<f64> {
    parse_decimal(s)
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn standardize_optional(method: Option<&str>) -> Option<String> {
    method
        .map(standardize_method)
        .filter(|m| !m.is_empty())
}

/// Returns the canonical form of `quote`.
///
/// Methods are standardized, non-finite numbers dropped, and a missing
/// destination amount is filled in from the exchange rate and fee.
#[must_use]
pub fn normalize_quote(quote: &Quote) -> Quote {
    let exchange_rate = finite(quote.exchange_rate());
    let fee = finite(quote.fee());
    let mut destination_amount = finite(quote.destination_amount());

    if quote.is_success() && destination_amount.is_none() {
        if let Some(rate) = exchange_rate {
            destination_amount = finite(Some(compute_destination_amount(
                quote.send_amount(),
                fee,
                rate,
            )));
        }
    }

    quote
        .to_builder()
        .maybe_exchange_rate(exchange_rate)
        .maybe_fee(fee)
        .maybe_destination_amount(destination_amount)
        .payment_method(standardize_optional(quote.payment_method()))
        .delivery_method(standardize_optional(quote.delivery_method()))
        .build()
}

/// Keeps one quote per provider id, compared case-insensitively.
///
/// On duplicates the quote with the strictly greater exchange rate wins;
/// ties keep the first seen. Output follows first-seen order of providers.
#[must_use]
pub fn filter_duplicate_providers(quotes: Vec<Quote>) -> Vec<Quote> {
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(quotes.len());
    let mut kept: Vec<Quote> = Vec::with_capacity(quotes.len());

    for quote in quotes {
        let id = quote.provider_id().to_lowercase();
        match slots.get(&id).and_then(|&i| kept.get_mut(i)) {
            Some(existing) => {
                if rate_key(&quote) > rate_key(existing) {
                    *existing = quote;
                }
            }
            None => {
                slots.insert(id, kept.len());
                kept.push(quote);
            }
        }
    }
    kept
}

fn rate_key(quote: &Quote) -> f64 {
    quote.exchange_rate().unwrap_or(f64::NEG_INFINITY)
}
