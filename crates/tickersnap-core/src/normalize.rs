//! Field normalization from decoded payload values to canonical units.
//!
//! Conversions are pure and total: every input maps to a value, to absence
//! or to a [`NormalizeError`]. Provider wrapper objects (`{"raw": 1.5,
//! "fmt": "1.50"}`) are unwrapped everywhere, sentinel placeholders such as
//! `"N/A"` are absence, and zero is always a present value.
//!
//! Endpoint adapters describe their fields with static [`FieldSpec`] tables
//! and run them through [`normalize_fields`].

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tracing::warn;

use crate::decode::{DecodedTree, Scalar};
use crate::{ExchangeTimezone, FieldValue, Fraction};

/// Decimal places kept on prices.
pub const PRICE_SCALE: u32 = 6;

const ABSENT_SENTINELS: [&str; 8] = ["", "N/A", "NaN", "-", "--", "Infinity", "-Infinity", "null"];

/// A present value that could not be converted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("field '{field}' is not numeric: '{value}'")]
    NotNumeric { field: String, value: String },
    #[error("field '{field}' must not be negative: {value}")]
    Negative { field: String, value: String },
    #[error("field '{field}' is not a non-negative integer: '{value}'")]
    NotInteger { field: String, value: String },
    #[error("field '{field}' expected text, found {found}")]
    NotText { field: String, found: &'static str },
    #[error("field '{field}' is not a valid date or instant: '{value}'")]
    InvalidDate { field: String, value: String },
    #[error("required field '{field}' is missing")]
    MissingRequired { field: String },
}

impl NormalizeError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::NotNumeric { field, .. }
            | Self::Negative { field, .. }
            | Self::NotInteger { field, .. }
            | Self::NotText { field, .. }
            | Self::InvalidDate { field, .. }
            | Self::MissingRequired { field } => field,
        }
    }
}

/// How the provider expresses a percentage field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentScale {
    /// Already a share of one (`0.023`).
    Fraction,
    /// Percent points (`2.3`).
    PercentPoints,
}

/// Absence-aware view of a raw value.
///
/// Returns `None` for a missing key, `null`, sentinel strings and empty
/// wrapper objects, and unwraps `{"raw": ...}` wrappers.
pub fn optional(raw: Option<&DecodedTree>) -> Option<&DecodedTree> {
    let node = raw?;
    match node {
        DecodedTree::Scalar(Scalar::Null) => None,
        DecodedTree::Scalar(Scalar::Text(text)) => {
            let trimmed = text.trim();
            if ABSENT_SENTINELS.contains(&trimmed) {
                None
            } else {
                Some(node)
            }
        }
        DecodedTree::Map(entries) if entries.is_empty() => None,
        DecodedTree::Map(entries) if entries.contains_key("raw") => optional(entries.get("raw")),
        _ => Some(node),
    }
}

fn unwrap_raw(raw: &DecodedTree) -> &DecodedTree {
    match raw {
        DecodedTree::Map(entries) => entries.get("raw").map_or(raw, unwrap_raw),
        _ => raw,
    }
}

fn display_value(raw: &DecodedTree) -> String {
    match raw {
        DecodedTree::Scalar(Scalar::Number(number)) => number.to_string(),
        DecodedTree::Scalar(Scalar::Text(text)) => text.clone(),
        DecodedTree::Scalar(Scalar::Bool(flag)) => flag.to_string(),
        other => other.kind_name().to_owned(),
    }
}

fn parse_decimal_text(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(text).ok()
    } else {
        Decimal::from_str(text).ok()
    }
}

/// Exact decimal from a JSON number or numeric string.
pub fn to_decimal(raw: &DecodedTree, field: &str) -> Result<Decimal, NormalizeError> {
    let raw = unwrap_raw(raw);
    let parsed = match raw {
        DecodedTree::Scalar(Scalar::Number(number)) => parse_decimal_text(&number.to_string()),
        DecodedTree::Scalar(Scalar::Text(text)) => parse_decimal_text(text),
        _ => None,
    };
    parsed.ok_or_else(|| NormalizeError::NotNumeric {
        field: field.to_owned(),
        value: display_value(raw),
    })
}

/// Non-negative price rounded to [`PRICE_SCALE`] places, ties to even.
pub fn to_decimal_price(raw: &DecodedTree, field: &str) -> Result<Decimal, NormalizeError> {
    let value = to_decimal(raw, field)?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(NormalizeError::Negative {
            field: field.to_owned(),
            value: value.to_string(),
        });
    }
    Ok(value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointNearestEven))
}

/// Non-negative integral count; `1.2e5` and `"161000.0"` are accepted.
pub fn to_count(raw: &DecodedTree, field: &str) -> Result<u64, NormalizeError> {
    let not_integer = || NormalizeError::NotInteger {
        field: field.to_owned(),
        value: display_value(unwrap_raw(raw)),
    };
    let value = to_decimal(raw, field).map_err(|_| not_integer())?;
    if !value.fract().is_zero() {
        return Err(not_integer());
    }
    value.to_u64().ok_or_else(not_integer)
}

/// Text value, trimmed.
pub fn to_text(raw: &DecodedTree, field: &str) -> Result<String, NormalizeError> {
    let raw = unwrap_raw(raw);
    raw.as_text()
        .map(|text| text.trim().to_owned())
        .ok_or_else(|| NormalizeError::NotText {
            field: field.to_owned(),
            found: raw.kind_name(),
        })
}

fn epoch_instant(raw: &DecodedTree) -> Option<DateTime<Utc>> {
    let seconds = to_decimal(raw, "").ok()?;
    if !seconds.fract().is_zero() {
        return None;
    }
    DateTime::from_timestamp(seconds.to_i64()?, 0)
}

/// Instant from epoch seconds or an RFC 3339 string.
pub fn to_instant(raw: &DecodedTree, field: &str) -> Result<DateTime<Utc>, NormalizeError> {
    let raw = unwrap_raw(raw);
    let parsed = match raw {
        DecodedTree::Scalar(Scalar::Text(text)) => DateTime::parse_from_rfc3339(text.trim())
            .map(|instant| instant.with_timezone(&Utc))
            .ok()
            .or_else(|| epoch_instant(raw)),
        _ => epoch_instant(raw),
    };
    parsed.ok_or_else(|| NormalizeError::InvalidDate {
        field: field.to_owned(),
        value: display_value(raw),
    })
}

/// Exchange-local calendar date.
///
/// Epoch seconds and RFC 3339 instants are converted through `tz`; plain
/// `YYYY-MM-DD` strings are taken as they are.
pub fn to_calendar_date(
    raw: &DecodedTree,
    tz: &ExchangeTimezone,
    field: &str,
) -> Result<NaiveDate, NormalizeError> {
    let inner = unwrap_raw(raw);
    if let Some(text) = inner.as_text() {
        if let Ok(date) = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d") {
            return Ok(date);
        }
    }
    to_instant(inner, field).map(|instant| tz.local_date(instant))
}

/// Share of one from a percentage field with a known scale.
///
/// A trailing `%` always means percent points.
pub fn to_fraction(
    raw: &DecodedTree,
    scale: PercentScale,
    field: &str,
) -> Result<Fraction, NormalizeError> {
    let inner = unwrap_raw(raw);
    if let Some(points) = inner.as_text().and_then(|text| text.trim().strip_suffix('%')) {
        let value = parse_decimal_text(points).ok_or_else(|| NormalizeError::NotNumeric {
            field: field.to_owned(),
            value: display_value(inner),
        })?;
        return Ok(Fraction::from_percent_points(value));
    }

    let value = to_decimal(inner, field)?;
    Ok(match scale {
        PercentScale::Fraction => Fraction::new(value),
        PercentScale::PercentPoints => Fraction::from_percent_points(value),
    })
}

/// Canonical kind of a table field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Count,
    Price,
    Decimal,
    Percent(PercentScale),
    Instant,
}

/// One row of a static normalization table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec<K> {
    pub key: K,
    /// Dotted path below the node handed to [`normalize_fields`].
    pub path: &'static str,
    pub kind: FieldKind,
}

impl<K> FieldSpec<K> {
    pub const fn new(key: K, path: &'static str, kind: FieldKind) -> Self {
        Self { key, path, kind }
    }
}

/// What to do with a present value that fails conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Fail the whole record.
    Strict,
    /// Treat the field as absent and record it as rejected.
    Lenient,
}

/// Output of [`normalize_fields`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFields<K> {
    pub values: BTreeMap<K, FieldValue>,
    pub rejected: Vec<(K, NormalizeError)>,
}

impl<K: Ord> NormalizedFields<K> {
    pub fn text(&self, key: K) -> Option<String> {
        self.values
            .get(&key)
            .and_then(FieldValue::as_text)
            .map(str::to_owned)
    }

    pub fn decimal(&self, key: K) -> Option<Decimal> {
        self.values.get(&key).and_then(FieldValue::as_decimal)
    }

    pub fn count(&self, key: K) -> Option<u64> {
        self.values.get(&key).and_then(FieldValue::as_count)
    }

    pub fn fraction(&self, key: K) -> Option<Fraction> {
        self.values.get(&key).and_then(FieldValue::as_fraction)
    }

    pub fn instant(&self, key: K) -> Option<DateTime<Utc>> {
        self.values.get(&key).and_then(FieldValue::as_instant)
    }
}

/// Convert one present raw value according to `kind`.
pub fn convert_field(
    raw: &DecodedTree,
    kind: FieldKind,
    field: &str,
) -> Result<FieldValue, NormalizeError> {
    match kind {
        FieldKind::Text => to_text(raw, field).map(FieldValue::Text),
        FieldKind::Count => to_count(raw, field).map(FieldValue::Count),
        FieldKind::Price => to_decimal_price(raw, field).map(FieldValue::Decimal),
        FieldKind::Decimal => to_decimal(raw, field).map(FieldValue::Decimal),
        FieldKind::Percent(scale) => to_fraction(raw, scale, field).map(FieldValue::Fraction),
        FieldKind::Instant => to_instant(raw, field).map(FieldValue::Instant),
    }
}

/// Run a static field table against `node`.
///
/// Entries sharing a key are alternative sources; the first one present
/// wins, whether it converts or is rejected.
pub fn normalize_fields<K>(
    node: &DecodedTree,
    table: &[FieldSpec<K>],
    policy: FieldPolicy,
) -> Result<NormalizedFields<K>, NormalizeError>
where
    K: Copy + Ord + std::fmt::Debug,
{
    let mut values = BTreeMap::new();
    let mut rejected: Vec<(K, NormalizeError)> = Vec::new();

    for spec in table {
        let settled =
            values.contains_key(&spec.key) || rejected.iter().any(|(key, _)| *key == spec.key);
        if settled {
            continue;
        }
        let Some(raw) = optional(node.path(spec.path)) else {
            continue;
        };

        match convert_field(raw, spec.kind, spec.path) {
            Ok(value) => {
                values.insert(spec.key, value);
            }
            Err(error) => match policy {
                FieldPolicy::Strict => return Err(error),
                FieldPolicy::Lenient => {
                    warn!(
                        field = spec.path,
                        key = ?spec.key,
                        %error,
                        "dropping unconvertible field"
                    );
                    rejected.push((spec.key, error));
                }
            },
        }
    }

    Ok(NormalizedFields { values, rejected })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(json: &str) -> DecodedTree {
        DecodedTree::from_json(json.as_bytes()).expect("test json")
    }

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).expect("decimal literal")
    }

    #[test]
    fn sentinels_and_empty_wrappers_are_absent() {
        let node = tree(
            r#"{"a": null, "b": "N/A", "c": " -- ", "d": {}, "e": "Infinity", "f": {"raw": null, "fmt": null}}"#,
        );
        for key in ["a", "b", "c", "d", "e", "f", "missing"] {
            assert!(optional(node.get(key)).is_none(), "{key}");
        }
    }

    #[test]
    fn zero_is_present() {
        let node = tree(r#"{"yield": 0, "wrapped": {"raw": 0, "fmt": "0.00%"}}"#);
        let value = optional(node.get("yield")).expect("zero is present");
        assert_eq!(to_decimal(value, "yield").expect("numeric"), Decimal::ZERO);
        let wrapped = optional(node.get("wrapped")).expect("zero is present");
        assert_eq!(to_decimal(wrapped, "wrapped").expect("numeric"), Decimal::ZERO);
    }

    #[test]
    fn decimal_accepts_strings_and_scientific_notation() {
        let node = tree(r#"{"a": "12.50", "b": 1.5e3, "c": "2.5E-2", "d": "abc"}"#);
        assert_eq!(to_decimal(node.get("a").expect("a"), "a").expect("a"), dec("12.50"));
        assert_eq!(to_decimal(node.get("b").expect("b"), "b").expect("b"), dec("1500"));
        assert_eq!(to_decimal(node.get("c").expect("c"), "c").expect("c"), dec("0.025"));
        assert!(matches!(
            to_decimal(node.get("d").expect("d"), "d"),
            Err(NormalizeError::NotNumeric { .. })
        ));
    }

    #[test]
    fn price_rounds_half_to_even_and_rejects_negatives() {
        let node = tree(r#"{"up": 1.2345675, "even": 1.2345665, "neg": -0.01}"#);
        assert_eq!(
            to_decimal_price(node.get("up").expect("up"), "up").expect("up"),
            dec("1.234568")
        );
        assert_eq!(
            to_decimal_price(node.get("even").expect("even"), "even").expect("even"),
            dec("1.234566")
        );
        assert!(matches!(
            to_decimal_price(node.get("neg").expect("neg"), "neg"),
            Err(NormalizeError::Negative { .. })
        ));
    }

    #[test]
    fn count_requires_integral_values() {
        let node = tree(r#"{"a": 161000, "b": "161000.0", "c": 1.5, "d": -3}"#);
        assert_eq!(to_count(node.get("a").expect("a"), "a").expect("a"), 161_000);
        assert_eq!(to_count(node.get("b").expect("b"), "b").expect("b"), 161_000);
        for key in ["c", "d"] {
            assert!(matches!(
                to_count(node.get(key).expect("value"), key),
                Err(NormalizeError::NotInteger { .. })
            ));
        }
    }

    #[test]
    fn percent_scales_agree_exactly() {
        let node = tree(r#"{"points": 2.3, "fraction": 0.023, "suffixed": "2.3%"}"#);
        let expected = Fraction::new(dec("0.023"));
        assert_eq!(
            to_fraction(
                node.get("points").expect("p"),
                PercentScale::PercentPoints,
                "p"
            )
            .expect("p"),
            expected
        );
        assert_eq!(
            to_fraction(node.get("fraction").expect("f"), PercentScale::Fraction, "f").expect("f"),
            expected
        );
        assert_eq!(
            to_fraction(node.get("suffixed").expect("s"), PercentScale::Fraction, "s").expect("s"),
            expected
        );
    }

    #[test]
    fn calendar_date_from_epoch_iso_and_rfc3339() {
        let tz = ExchangeTimezone::named("America/New_York").expect("zone");
        let node = tree(
            r#"{"epoch": 1709614799, "float": 1709614800.0, "iso": "2024-03-05", "rfc": "2024-03-05T04:59:59Z", "bad": "yesterday"}"#,
        );
        let date = |key: &str| to_calendar_date(node.get(key).expect("value"), &tz, key);
        assert_eq!(date("epoch").expect("epoch"), NaiveDate::from_ymd_opt(2024, 3, 4).expect("d"));
        assert_eq!(date("float").expect("float"), NaiveDate::from_ymd_opt(2024, 3, 5).expect("d"));
        assert_eq!(date("iso").expect("iso"), NaiveDate::from_ymd_opt(2024, 3, 5).expect("d"));
        assert_eq!(date("rfc").expect("rfc"), NaiveDate::from_ymd_opt(2024, 3, 4).expect("d"));
        assert!(matches!(date("bad"), Err(NormalizeError::InvalidDate { .. })));
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum Key {
        Price,
        Yield,
        Name,
    }

    const TABLE: &[FieldSpec<Key>] = &[
        FieldSpec::new(Key::Price, "price.regularMarketPrice", FieldKind::Price),
        FieldSpec::new(Key::Price, "summaryDetail.previousClose", FieldKind::Price),
        FieldSpec::new(
            Key::Yield,
            "summaryDetail.dividendYield",
            FieldKind::Percent(PercentScale::Fraction),
        ),
        FieldSpec::new(Key::Name, "price.longName", FieldKind::Text),
    ];

    #[test]
    fn first_present_source_wins() {
        let node = tree(
            r#"{"price": {"regularMarketPrice": {}}, "summaryDetail": {"previousClose": {"raw": 10.5}}}"#,
        );
        let fields = normalize_fields(&node, TABLE, FieldPolicy::Strict).expect("strict");
        assert_eq!(fields.decimal(Key::Price), Some(dec("10.5")));
        assert_eq!(fields.text(Key::Name), None);
    }

    #[test]
    fn lenient_policy_records_rejections() {
        let node = tree(
            r#"{"price": {"longName": 42}, "summaryDetail": {"dividendYield": {"raw": 0.0044}}}"#,
        );
        let err = normalize_fields(&node, TABLE, FieldPolicy::Strict).expect_err("strict fails");
        assert!(matches!(err, NormalizeError::NotText { .. }));

        let fields = normalize_fields(&node, TABLE, FieldPolicy::Lenient).expect("lenient");
        assert_eq!(fields.fraction(Key::Yield), Some(Fraction::new(dec("0.0044"))));
        assert_eq!(fields.text(Key::Name), None);
        assert_eq!(fields.rejected.len(), 1);
        assert_eq!(fields.rejected[0].0, Key::Name);
        assert_eq!(fields.rejected[0].1.field(), "price.longName");
    }
}
