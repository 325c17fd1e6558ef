use crate::adapters::chart::{chart_meta, chart_result, event_entries, events_request};
use crate::adapters::EndpointAdapter;
use crate::decode::{DecodeError, DecodedTree, Scalar};
use crate::normalize::{optional, to_calendar_date, to_count, to_text, NormalizeError};
use crate::transport::{EndpointKind, FetchRequest};
use crate::{AdapterError, SplitEvent, Symbol};

/// Split history of one symbol, oldest first.
#[derive(Debug, Clone)]
pub struct SplitsAdapter {
    symbol: Symbol,
}

impl SplitsAdapter {
    pub fn new(symbol: Symbol) -> Self {
        Self { symbol }
    }
}

impl EndpointAdapter for SplitsAdapter {
    type Output = Vec<SplitEvent>;

    fn endpoint(&self) -> EndpointKind {
        EndpointKind::Splits
    }

    fn request(&self) -> FetchRequest {
        events_request(EndpointKind::Splits, self.symbol.clone(), "split")
    }

    fn adapt(&self, tree: &DecodedTree) -> Result<Vec<SplitEvent>, AdapterError> {
        let endpoint = self.endpoint();
        let result = chart_result(tree, endpoint)?;
        let meta = chart_meta(result, endpoint)?;

        let mut events = Vec::new();
        for (key, entry) in event_entries(result, "splits", endpoint)? {
            let (numerator, denominator) = split_terms(entry)?;

            let key_node = DecodedTree::Scalar(Scalar::Text(key.to_owned()));
            let raw_date = optional(entry.get("date")).unwrap_or(&key_node);
            let date = to_calendar_date(raw_date, &meta.timezone, "splits.date")?;

            let event = SplitEvent::new(date, numerator, denominator).map_err(|error| {
                DecodeError::malformed(endpoint, format!("split {key}: {error}"))
            })?;
            events.push(event);
        }

        events.sort_by_key(|event| event.date);
        Ok(events)
    }
}

/// Numerator and denominator, falling back to the `splitRatio` text.
fn split_terms(entry: &DecodedTree) -> Result<(u32, u32), NormalizeError> {
    let numerator = optional(entry.get("numerator"));
    let denominator = optional(entry.get("denominator"));
    if let (Some(numerator), Some(denominator)) = (numerator, denominator) {
        return Ok((
            term(numerator, "splits.numerator")?,
            term(denominator, "splits.denominator")?,
        ));
    }

    let ratio = optional(entry.get("splitRatio"))
        .ok_or_else(|| NormalizeError::missing("splits.numerator"))?;
    let text = to_text(ratio, "splits.splitRatio")?;
    let not_ratio = || NormalizeError::NotNumeric {
        field: String::from("splits.splitRatio"),
        value: text.clone(),
    };
    let (left, right) = text
        .split_once(':')
        .or_else(|| text.split_once('/'))
        .ok_or_else(not_ratio)?;
    let parse = |part: &str| part.trim().parse::<u32>().map_err(|_| not_ratio());
    Ok((parse(left)?, parse(right)?))
}

fn term(raw: &DecodedTree, field: &str) -> Result<u32, NormalizeError> {
    let value = to_count(raw, field)?;
    u32::try_from(value).map_err(|_| NormalizeError::NotInteger {
        field: field.to_owned(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn adapt(json: &str) -> Result<Vec<SplitEvent>, AdapterError> {
        let tree = DecodedTree::from_json(json.as_bytes()).expect("test json");
        SplitsAdapter::new(Symbol::parse("AAPL").expect("symbol")).adapt(&tree)
    }

    #[test]
    fn splits_are_sorted_even_when_the_map_is_not() {
        // 2020-08-31 and 2014-06-09 at 09:30 New York.
        let events = adapt(
            r#"{"chart":{"result":[{"meta":{"exchangeTimezoneName":"America/New_York"},
                "events":{"splits":{
                    "1598880600":{"date":1598880600,"numerator":4.0,"denominator":1.0,"splitRatio":"4:1"},
                    "1402320600":{"date":1402320600,"numerator":7,"denominator":1,"splitRatio":"7:1"}
                }}}]}}"#,
        )
        .expect("events");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2014, 6, 9).expect("date"));
        assert_eq!(events[0].to_string(), "7:1");
        assert_eq!(events[1].date, NaiveDate::from_ymd_opt(2020, 8, 31).expect("date"));
        assert_eq!(events[1].to_string(), "4:1");
    }

    #[test]
    fn ratio_text_is_the_fallback() {
        let events = adapt(
            r#"{"chart":{"result":[{"meta":{},"events":{"splits":{"1598880600":{"date":1598880600,"splitRatio":"3:2"}}}}]}}"#,
        )
        .expect("events");
        assert_eq!((events[0].numerator, events[0].denominator), (3, 2));
    }

    #[test]
    fn fractional_terms_fail_the_slot() {
        let err = adapt(
            r#"{"chart":{"result":[{"meta":{},"events":{"splits":{"1598880600":{"date":1598880600,"numerator":1.5,"denominator":1}}}}]}}"#,
        )
        .expect_err("must fail");
        assert_eq!(err.code(), "adapter.normalize");
    }

    #[test]
    fn zero_denominator_is_malformed() {
        let err = adapt(
            r#"{"chart":{"result":[{"meta":{},"events":{"splits":{"1598880600":{"date":1598880600,"numerator":2,"denominator":0}}}}]}}"#,
        )
        .expect_err("must fail");
        assert_eq!(err.code(), "adapter.decode");
    }

    #[test]
    fn no_events_block_is_empty_success() {
        let events = adapt(r#"{"chart":{"result":[{"meta":{}}]}}"#).expect("events");
        assert!(events.is_empty());
    }
}
