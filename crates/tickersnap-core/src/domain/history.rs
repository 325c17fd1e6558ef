use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Look-back window accepted by the chart endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub const ALL: [Self; 11] = [
        Self::OneDay,
        Self::FiveDays,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::TwoYears,
        Self::FiveYears,
        Self::TenYears,
        Self::YearToDate,
        Self::Max,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::TenYears => "10y",
            Self::YearToDate => "ytd",
            Self::Max => "max",
        }
    }

    /// Upper bound of calendar days covered; `None` for `max`.
    pub const fn span_days(self) -> Option<u32> {
        match self {
            Self::OneDay => Some(1),
            Self::FiveDays => Some(5),
            Self::OneMonth => Some(31),
            Self::ThreeMonths => Some(92),
            Self::SixMonths => Some(183),
            Self::OneYear | Self::YearToDate => Some(366),
            Self::TwoYears => Some(730),
            Self::FiveYears => Some(1_827),
            Self::TenYears => Some(3_653),
            Self::Max => None,
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|period| period.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidPeriod {
                value: value.trim().to_owned(),
            })
    }
}

/// Bar width accepted by the chart endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "2m")]
    TwoMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "60m")]
    SixtyMinutes,
    #[serde(rename = "90m")]
    NinetyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
}

impl Interval {
    pub const ALL: [Self; 13] = [
        Self::OneMinute,
        Self::TwoMinutes,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::ThirtyMinutes,
        Self::SixtyMinutes,
        Self::NinetyMinutes,
        Self::OneHour,
        Self::OneDay,
        Self::FiveDays,
        Self::OneWeek,
        Self::OneMonth,
        Self::ThreeMonths,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::TwoMinutes => "2m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::SixtyMinutes => "60m",
            Self::NinetyMinutes => "90m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneWeek => "1wk",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
        }
    }

    pub const fn is_intraday(self) -> bool {
        matches!(
            self,
            Self::OneMinute
                | Self::TwoMinutes
                | Self::FiveMinutes
                | Self::FifteenMinutes
                | Self::ThirtyMinutes
                | Self::SixtyMinutes
                | Self::NinetyMinutes
                | Self::OneHour
        )
    }

    /// How far back the provider serves this interval, in days.
    pub const fn max_lookback_days(self) -> Option<u32> {
        match self {
            Self::OneMinute => Some(7),
            Self::TwoMinutes
            | Self::FiveMinutes
            | Self::FifteenMinutes
            | Self::ThirtyMinutes
            | Self::NinetyMinutes => Some(60),
            Self::SixtyMinutes | Self::OneHour => Some(730),
            Self::OneDay | Self::FiveDays | Self::OneWeek | Self::OneMonth | Self::ThreeMonths => {
                None
            }
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|interval| interval.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidInterval {
                value: value.trim().to_owned(),
            })
    }
}

/// Whether a price series carries provider-adjusted or raw prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    Adjusted,
    Unadjusted,
}

/// Validated history parameters.
///
/// Only [`HistoryRequest::new`] and [`HistoryRequest::parse`] build one
/// outside this crate, so look-back limits always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistoryRequest {
    pub(crate) period: Period,
    pub(crate) interval: Interval,
    pub(crate) adjustment: Adjustment,
}

impl HistoryRequest {
    pub fn new(
        period: Period,
        interval: Interval,
        adjusted: bool,
    ) -> Result<Self, ValidationError> {
        if let Some(max_days) = interval.max_lookback_days() {
            let fits = period.span_days().is_some_and(|days| days <= max_days);
            if !fits {
                return Err(ValidationError::IntervalPeriodMismatch {
                    interval: interval.as_str().to_owned(),
                    period: period.as_str().to_owned(),
                    max_days,
                });
            }
        }

        if adjusted && interval.is_intraday() {
            return Err(ValidationError::AdjustmentUnavailable {
                interval: interval.as_str().to_owned(),
            });
        }

        let adjustment = if adjusted {
            Adjustment::Adjusted
        } else {
            Adjustment::Unadjusted
        };

        Ok(Self {
            period,
            interval,
            adjustment,
        })
    }

    /// Parse period and interval text as supplied by callers.
    pub fn parse(period: &str, interval: &str, adjusted: bool) -> Result<Self, ValidationError> {
        Self::new(period.parse()?, interval.parse()?, adjusted)
    }

    pub const fn period(&self) -> Period {
        self.period
    }

    pub const fn interval(&self) -> Interval {
        self.interval
    }

    pub const fn adjustment(&self) -> Adjustment {
        self.adjustment
    }

    pub const fn is_adjusted(&self) -> bool {
        matches!(self.adjustment, Adjustment::Adjusted)
    }

    /// Re-run the checks of [`HistoryRequest::new`].
    pub fn validated(self) -> Result<Self, ValidationError> {
        Self::new(self.period, self.interval, self.is_adjusted())
    }
}

impl Default for HistoryRequest {
    fn default() -> Self {
        Self {
            period: Period::OneMonth,
            interval: Interval::OneDay,
            adjustment: Adjustment::Adjusted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_period_and_interval() {
        assert_eq!(Period::from_str("1MO").expect("must parse"), Period::OneMonth);
        assert_eq!(Interval::from_str(" 1wk ").expect("must parse"), Interval::OneWeek);
    }

    #[test]
    fn rejects_unknown_period() {
        let err = Period::from_str("2mo").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidPeriod { .. }));
    }

    #[test]
    fn rejects_unknown_interval() {
        let err = Interval::from_str("2h").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidInterval { .. }));
    }

    #[test]
    fn one_minute_bars_are_limited_to_a_week() {
        assert!(HistoryRequest::parse("5d", "1m", false).is_ok());
        let err = HistoryRequest::parse("1mo", "1m", false).expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::IntervalPeriodMismatch {
                interval: String::from("1m"),
                period: String::from("1mo"),
                max_days: 7,
            }
        );
    }

    #[test]
    fn intraday_interval_rejects_max_period() {
        let err = HistoryRequest::parse("max", "1h", false).expect_err("must fail");
        assert!(matches!(err, ValidationError::IntervalPeriodMismatch { .. }));
        assert!(HistoryRequest::parse("2y", "1h", false).is_ok());
    }

    #[test]
    fn adjusted_intraday_is_rejected() {
        let err = HistoryRequest::parse("5d", "15m", true).expect_err("must fail");
        assert!(matches!(err, ValidationError::AdjustmentUnavailable { .. }));
    }

    #[test]
    fn default_request_is_adjusted_daily_month() {
        let request = HistoryRequest::default();
        assert_eq!(request.period(), Period::OneMonth);
        assert_eq!(request.interval(), Interval::OneDay);
        assert!(request.is_adjusted());
    }
}
