use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Named(Tz),
    Fixed(FixedOffset),
}

/// Timezone of the venue a symbol trades on.
///
/// Resolved from the IANA name the provider reports (`exchangeTimezoneName`)
/// so daylight-saving transitions inside a long series are honoured. The
/// provider's fixed `gmtoffset` is only used when the name is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeTimezone {
    name: String,
    zone: Zone,
}

impl ExchangeTimezone {
    pub fn utc() -> Self {
        Self {
            name: String::from("UTC"),
            zone: Zone::Named(Tz::UTC),
        }
    }

    /// Look up an IANA timezone such as `America/New_York`.
    pub fn named(name: &str) -> Option<Self> {
        let zone = name.trim().parse::<Tz>().ok()?;
        Some(Self {
            name: zone.name().to_owned(),
            zone: Zone::Named(zone),
        })
    }

    /// Fixed offset east of UTC, in seconds.
    pub fn fixed(offset_secs: i32) -> Option<Self> {
        let offset = FixedOffset::east_opt(offset_secs)?;
        Some(Self {
            name: offset.to_string(),
            zone: Zone::Fixed(offset),
        })
    }

    /// Prefer the IANA name, then the fixed offset, then UTC.
    pub fn resolve(name: Option<&str>, gmt_offset_secs: Option<i64>) -> Self {
        name.and_then(Self::named)
            .or_else(|| {
                gmt_offset_secs
                    .and_then(|secs| i32::try_from(secs).ok())
                    .and_then(Self::fixed)
            })
            .unwrap_or_else(Self::utc)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calendar date on the venue's wall clock at `instant`.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self.zone {
            Zone::Named(zone) => instant.with_timezone(&zone).date_naive(),
            Zone::Fixed(offset) => instant.with_timezone(&offset).date_naive(),
        }
    }
}

impl Default for ExchangeTimezone {
    fn default() -> Self {
        Self::utc()
    }
}
