//! Behavior-driven tests for field normalization
//!
//! These tests verify HOW raw provider values become canonical units:
//! absence versus zero, percent scales, exact decimals and exchange-local
//! calendar dates.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tickersnap_core::normalize::{
    optional, to_calendar_date, to_count, to_decimal, to_decimal_price, to_fraction, to_instant,
    NormalizeError, PercentScale,
};
use tickersnap_core::{DecodedTree, ExchangeTimezone, Fraction};

fn raw(json: &str) -> DecodedTree {
    DecodedTree::from_json(json.as_bytes()).expect("test json")
}

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("decimal literal")
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn new_york() -> ExchangeTimezone {
    ExchangeTimezone::named("America/New_York").expect("known zone")
}

// =============================================================================
// Normalization: Absence
// =============================================================================

#[test]
fn when_value_is_a_sentinel_it_is_absent() {
    // Given: The placeholders the provider uses for "no value"
    for sentinel in [r#"null"#, r#""N/A""#, r#""""#, r#""-""#, r#""NaN""#, r#"{}"#] {
        // When: The value is checked for presence
        let node = raw(sentinel);

        // Then: It is absent rather than an error
        assert!(optional(Some(&node)).is_none(), "{sentinel} should be absent");
    }
}

#[test]
fn when_value_is_zero_it_is_present() {
    // Given: A zero dividend yield
    let node = raw("0");

    // When: It is normalized as percent points
    let present = optional(Some(&node)).expect("zero is present");
    let fraction = to_fraction(present, PercentScale::PercentPoints, "dividendYield")
        .expect("zero converts");

    // Then: The value is a present zero
    assert_eq!(fraction, Fraction::new(Decimal::ZERO));
}

#[test]
fn when_value_is_wrapped_the_raw_member_is_used() {
    // Given: A quoteSummary style wrapper
    let node = raw(r#"{"raw": 1.5, "fmt": "1.50"}"#);

    // When: It is converted
    let value = to_decimal(optional(Some(&node)).expect("present"), "beta").expect("decimal");

    // Then: The raw number is used, not the formatted text
    assert_eq!(value, dec("1.5"));
}

// =============================================================================
// Normalization: Numbers
// =============================================================================

#[test]
fn when_price_has_many_decimals_it_is_rounded_half_to_even() {
    // Given: Prices exactly halfway at the seventh decimal place
    let up = raw("1.0000005");
    let down = raw("1.0000015");

    // When: They are normalized as prices
    let up = to_decimal_price(&up, "close").expect("price");
    let down = to_decimal_price(&down, "close").expect("price");

    // Then: Ties go to the even neighbour
    assert_eq!(up, dec("1.000000"));
    assert_eq!(down, dec("1.000002"));
}

#[test]
fn when_price_is_negative_it_is_rejected() {
    // Given: A negative close
    let node = raw("-3.2");

    // When: It is normalized as a price
    let err = to_decimal_price(&node, "close").expect_err("negative price");

    // Then: The error names the field
    assert!(matches!(err, NormalizeError::Negative { .. }));
    assert_eq!(err.field(), "close");
}

#[test]
fn when_count_is_float_encoded_it_is_accepted_if_integral() {
    // Given: Volumes in the encodings the provider uses
    assert_eq!(to_count(&raw("1.2e5"), "volume"), Ok(120_000));
    assert_eq!(to_count(&raw(r#""161000.0""#), "volume"), Ok(161_000));

    // When / Then: A fractional count is rejected
    let err = to_count(&raw("10.5"), "volume").expect_err("fractional");
    assert!(matches!(err, NormalizeError::NotInteger { .. }));
}

#[test]
fn when_text_is_not_numeric_the_error_keeps_the_value() {
    // Given: Free text in a numeric field
    let err = to_decimal(&raw(r#""about 161k""#), "fullTimeEmployees").expect_err("text");

    // Then: The error reports the field and the offending value
    assert_eq!(
        err,
        NormalizeError::NotNumeric {
            field: String::from("fullTimeEmployees"),
            value: String::from("about 161k"),
        }
    );
}

// =============================================================================
// Normalization: Percentages
// =============================================================================

#[test]
fn when_scales_differ_the_same_percentage_gives_the_same_fraction() {
    // Given: 2.3% expressed as percent points, as a fraction and as text
    let points = to_fraction(&raw("2.3"), PercentScale::PercentPoints, "change").expect("points");
    let fraction = to_fraction(&raw("0.023"), PercentScale::Fraction, "yield").expect("fraction");
    let text = to_fraction(&raw(r#""2.3%""#), PercentScale::Fraction, "yield").expect("text");

    // Then: All three are the same fraction of one
    assert_eq!(points, fraction);
    assert_eq!(text, fraction);
    assert_eq!(points.to_string(), "2.3%");
}

// =============================================================================
// Normalization: Dates
// =============================================================================

#[test]
fn when_epoch_crosses_local_midnight_the_date_advances() {
    // Given: One second before and exactly at midnight in New York (EST)
    // 2024-01-16 00:00 EST = 2024-01-16 05:00 UTC
    let before = raw("1705381199");
    let at = raw("1705381200");

    // When: They are converted to exchange-local dates
    let before = to_calendar_date(&before, &new_york(), "date").expect("date");
    let at = to_calendar_date(&at, &new_york(), "date").expect("date");

    // Then: They fall on consecutive dates
    assert_eq!(before, date(2024, 1, 15));
    assert_eq!(at, date(2024, 1, 16));
}

#[test]
fn when_epoch_crosses_local_midnight_in_summer_time_the_offset_follows_dst() {
    // Given: Midnight in New York during EDT (UTC-4)
    // 2024-07-02 00:00 EDT = 2024-07-02 04:00 UTC
    let before = raw("1719892799");
    let at = raw("1719892800");

    // When: They are converted with the named zone
    let before = to_calendar_date(&before, &new_york(), "date").expect("date");
    let at = to_calendar_date(&at, &new_york(), "date").expect("date");

    // Then: The DST offset is honoured
    assert_eq!(before, date(2024, 7, 1));
    assert_eq!(at, date(2024, 7, 2));
}

#[test]
fn when_a_session_closes_in_utc_tomorrow_the_date_stays_local() {
    // Given: 20:30 New York time, already the next day in UTC
    let evening = raw("1709602200");

    // When: It is converted with the venue timezone and with UTC
    let local = to_calendar_date(&evening, &new_york(), "date").expect("date");
    let utc = to_calendar_date(&evening, &ExchangeTimezone::utc(), "date").expect("date");

    // Then: Only the venue timezone gives the trading date
    assert_eq!(local, date(2024, 3, 4));
    assert_eq!(utc, date(2024, 3, 5));
}

#[test]
fn when_date_is_plain_text_it_is_taken_as_is() {
    let parsed = to_calendar_date(&raw(r#""2020-08-31""#), &new_york(), "date").expect("date");
    assert_eq!(parsed, date(2020, 8, 31));
}

#[test]
fn when_instant_is_unparsable_it_is_an_invalid_date() {
    let err = to_instant(&raw(r#""yesterday""#), "regularMarketTime").expect_err("bad instant");
    assert!(matches!(err, NormalizeError::InvalidDate { .. }));
}

#[test]
fn when_timezone_name_is_unknown_the_offset_is_used() {
    // Given: An unknown zone name with a +09:00 offset
    let zone = ExchangeTimezone::resolve(Some("Mars/Olympus"), Some(32_400));

    // When: A UTC evening is converted
    // 2024-03-04 20:00 UTC = 2024-03-05 05:00 +09:00
    let local = zone.local_date(
        to_instant(&raw("1709582400"), "timestamp").expect("instant"),
    );

    // Then: The fixed offset decides the date
    assert_eq!(zone.name(), "+09:00");
    assert_eq!(local, date(2024, 3, 5));
}
