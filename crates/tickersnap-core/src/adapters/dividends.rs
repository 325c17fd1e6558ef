use crate::adapters::chart::{chart_meta, chart_result, event_entries, events_request};
use crate::adapters::EndpointAdapter;
use crate::decode::{DecodeError, DecodedTree, Scalar};
use crate::normalize::{optional, to_calendar_date, to_decimal_price, NormalizeError};
use crate::transport::{EndpointKind, FetchRequest};
use crate::{AdapterError, DividendEvent, Symbol};

/// Cash dividend history of one symbol, oldest first.
#[derive(Debug, Clone)]
pub struct DividendsAdapter {
    symbol: Symbol,
}

impl DividendsAdapter {
    pub fn new(symbol: Symbol) -> Self {
        Self { symbol }
    }
}

impl EndpointAdapter for DividendsAdapter {
    type Output = Vec<DividendEvent>;

    fn endpoint(&self) -> EndpointKind {
        EndpointKind::Dividends
    }

    fn request(&self) -> FetchRequest {
        events_request(EndpointKind::Dividends, self.symbol.clone(), "div")
    }

    fn adapt(&self, tree: &DecodedTree) -> Result<Vec<DividendEvent>, AdapterError> {
        let endpoint = self.endpoint();
        let result = chart_result(tree, endpoint)?;
        let meta = chart_meta(result, endpoint)?;

        let mut events = Vec::new();
        for (key, entry) in event_entries(result, "dividends", endpoint)? {
            let amount = optional(entry.get("amount"))
                .ok_or_else(|| NormalizeError::missing("dividends.amount"))?;
            let amount = to_decimal_price(amount, "dividends.amount")?;

            // Entries without a date field are keyed by their epoch.
            let key_node = DecodedTree::Scalar(Scalar::Text(key.to_owned()));
            let raw_date = optional(entry.get("date")).unwrap_or(&key_node);
            let ex_date = to_calendar_date(raw_date, &meta.timezone, "dividends.date")?;

            let event = DividendEvent::new(ex_date, amount).map_err(|error| {
                DecodeError::malformed(endpoint, format!("dividend {key}: {error}"))
            })?;
            events.push(event);
        }

        events.sort_by_key(|event| event.ex_date);
        Ok(events)
    }
}
