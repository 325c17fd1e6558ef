use std::str::FromStr;

use rust_decimal::Decimal;
use tickersnap_core::decode::required_marker;
use tickersnap_core::{
    fetch_and_adapt, AdapterError, DecodeError, DividendsAdapter, EndpointAdapter, EndpointKind,
    FixtureTransport, Fraction, HistoryAdapter, HistoryRequest, InfoAdapter, InfoField, MarketId,
    MarketStatusAdapter, MarketSummaryAdapter, QuoteAdapter, SplitsAdapter, Symbol,
    TransportError,
};

fn symbol(value: &str) -> Symbol {
    Symbol::parse(value).expect("valid symbol")
}

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("decimal literal")
}

/// Behavior every adapter shares, whatever its payload.
async fn assert_common_contract<A: EndpointAdapter>(adapter: A)
where
    A::Output: std::fmt::Debug,
{
    let endpoint = adapter.endpoint();
    assert_eq!(adapter.request().endpoint, endpoint, "{endpoint}: request endpoint");

    let transport = FixtureTransport::new().with_status(endpoint, 503, "busy");
    let err = fetch_and_adapt(&adapter, &transport).await.expect_err("503");
    assert_eq!(
        err,
        AdapterError::Transport(TransportError::Upstream {
            endpoint,
            status: 503
        }),
        "{endpoint}: non-2xx status"
    );

    let transport =
        FixtureTransport::new().with_error(endpoint, TransportError::Timeout { endpoint });
    let err = fetch_and_adapt(&adapter, &transport).await.expect_err("timeout");
    assert_eq!(
        err,
        AdapterError::Transport(TransportError::Timeout { endpoint }),
        "{endpoint}: transport error passes through"
    );

    let transport = FixtureTransport::new().with_body(endpoint, "   ");
    let err = fetch_and_adapt(&adapter, &transport).await.expect_err("empty");
    assert!(
        matches!(err, AdapterError::Decode(DecodeError::MalformedPayload { .. })),
        "{endpoint}: empty body is malformed, got {err:?}"
    );

    let transport = FixtureTransport::new().with_body(endpoint, "[1, 2, 3]");
    let err = fetch_and_adapt(&adapter, &transport).await.expect_err("array");
    assert!(
        matches!(err, AdapterError::Decode(DecodeError::MalformedPayload { .. })),
        "{endpoint}: top-level array is malformed, got {err:?}"
    );

    let marker = required_marker(endpoint);
    let root = marker.split('.').next().expect("marker root");
    let body = format!(
        r#"{{"{root}":{{"error":{{"code":"Not Found","description":"No data found"}}}}}}"#
    );
    let transport = FixtureTransport::new().with_body(endpoint, body);
    let err = fetch_and_adapt(&adapter, &transport).await.expect_err("missing marker");
    assert_eq!(
        err,
        AdapterError::Decode(DecodeError::UnexpectedSchema {
            endpoint,
            marker,
            hint: Some(String::from("No data found")),
        }),
        "{endpoint}: missing marker carries provider hint"
    );
}

#[tokio::test]
async fn every_adapter_honours_the_common_contract() {
    let history = HistoryRequest::parse("1mo", "1d", true).expect("valid request");
    assert_common_contract(QuoteAdapter::new(symbol("AAPL"))).await;
    assert_common_contract(HistoryAdapter::new(symbol("AAPL"), history)).await;
    assert_common_contract(InfoAdapter::new(symbol("AAPL"))).await;
    assert_common_contract(DividendsAdapter::new(symbol("AAPL"))).await;
    assert_common_contract(SplitsAdapter::new(symbol("AAPL"))).await;
    assert_common_contract(MarketStatusAdapter::new(MarketId::us())).await;
    assert_common_contract(MarketSummaryAdapter::new(MarketId::us())).await;
}

#[tokio::test]
async fn etf_quote_without_market_cap_is_ready() {
    let transport = FixtureTransport::new().with_body(
        EndpointKind::Quote,
        include_str!("../fixtures/quote_spy_no_market_cap.json"),
    );
    let quote = fetch_and_adapt(&QuoteAdapter::new(symbol("SPY")), &transport)
        .await
        .expect("quote");

    assert_eq!(quote.last_price, dec("512.85"));
    assert_eq!(quote.market_cap, None);
    assert_eq!(quote.change, Some(Fraction::new(Decimal::ZERO)));
    assert_eq!(quote.dividend_yield, Some(Fraction::new(dec("0.0129"))));
    assert_eq!(quote.currency.as_deref(), Some("USD"));
}

#[tokio::test]
async fn equity_quote_maps_every_field() {
    let transport = FixtureTransport::new()
        .with_body(EndpointKind::Quote, include_str!("../fixtures/quote_aapl.json"));
    let quote = fetch_and_adapt(&QuoteAdapter::new(symbol("AAPL")), &transport)
        .await
        .expect("quote");

    assert_eq!(quote.day_range(), Some((dec("173.7"), dec("176.9"))));
    assert_eq!(quote.year_range(), Some((dec("143.9"), dec("199.62"))));
    assert_eq!(quote.last_volume, Some(81_510_101));
    assert_eq!(quote.market_cap, Some(dec("2704000000000")));
    assert_eq!(quote.change, Some(Fraction::new(dec("-0.025423"))));
}

#[tokio::test]
async fn info_with_one_bad_attribute_still_succeeds() {
    let transport = FixtureTransport::new().with_body(
        EndpointKind::Info,
        include_str!("../fixtures/quote_summary_aapl.json"),
    );
    let info = fetch_and_adapt(&InfoAdapter::new(symbol("AAPL")), &transport)
        .await
        .expect("info");

    assert_eq!(info.rejected(), &[InfoField::FullTimeEmployees]);
    assert_eq!(info.full_time_employees(), None);
    assert_eq!(info.long_name(), Some("Apple Inc."));
    assert_eq!(info.sector(), Some("Technology"));
    assert_eq!(info.exchange(), Some("NasdaqGS"));
    assert_eq!(info.currency(), Some("USD"));
    assert_eq!(info.trailing_pe(), Some(dec("27.21")));
    assert_eq!(info.profit_margins(), Some(Fraction::new(dec("0.26"))));
    assert_eq!(info.held_by_institutions(), Some(Fraction::new(dec("0.6121"))));
    assert_eq!(info.dividend_yield(), Some(Fraction::new(dec("0.0055"))));
    assert_eq!(info.analyst_opinions(), Some(38));
    assert_eq!(info.recommendation_key(), Some("buy"));
    assert_eq!(info.target_mean_price(), Some(dec("201.84")));
}

#[tokio::test]
async fn chart_without_events_gives_empty_dividends() {
    let transport = FixtureTransport::new().with_body(
        EndpointKind::Dividends,
        include_str!("../fixtures/chart_aapl_no_events.json"),
    );
    let dividends = fetch_and_adapt(&DividendsAdapter::new(symbol("AAPL")), &transport)
        .await
        .expect("dividends");
    assert!(dividends.is_empty());
}

#[tokio::test]
async fn dividends_come_back_oldest_first() {
    let transport = FixtureTransport::new().with_body(
        EndpointKind::Dividends,
        include_str!("../fixtures/chart_aapl_dividends.json"),
    );
    let dividends = fetch_and_adapt(&DividendsAdapter::new(symbol("AAPL")), &transport)
        .await
        .expect("dividends");

    let dates: Vec<String> = dividends.iter().map(|event| event.ex_date.to_string()).collect();
    assert_eq!(dates, ["2023-08-11", "2023-11-10", "2024-02-09"]);
    assert!(dividends.iter().all(|event| event.amount == dec("0.24")));
}

#[tokio::test]
async fn splits_are_sorted_even_when_the_payload_is_not() {
    let transport = FixtureTransport::new().with_body(
        EndpointKind::Splits,
        include_str!("../fixtures/chart_aapl_splits_unsorted.json"),
    );
    let splits = fetch_and_adapt(&SplitsAdapter::new(symbol("AAPL")), &transport)
        .await
        .expect("splits");

    let rendered: Vec<String> = splits
        .iter()
        .map(|split| format!("{} {split}", split.date))
        .collect();
    assert_eq!(
        rendered,
        [
            "2001-12-19 2:1",
            "2005-02-24 2:1",
            "2014-06-09 7:1",
            "2020-08-31 4:1",
        ]
    );
    assert_eq!(splits[3].ratio(), dec("4"));
}

#[tokio::test]
async fn market_status_keeps_the_venue_offset() {
    let transport = FixtureTransport::new().with_body(
        EndpointKind::MarketTime,
        include_str!("../fixtures/markettime_us.json"),
    );
    let status = fetch_and_adapt(&MarketStatusAdapter::new(MarketId::us()), &transport)
        .await
        .expect("status");

    assert_eq!(status.id, MarketId::us());
    assert_eq!(status.state.as_deref(), Some("open"));
    let close = status.close.expect("close time");
    assert_eq!(close.to_rfc3339(), "2024-03-05T16:00:00-05:00");
    let timezone = status.timezone.expect("timezone");
    assert_eq!(timezone.gmt_offset_ms, -18_000_000);
    assert_eq!(timezone.long.as_deref(), Some("America/New_York"));
}

#[tokio::test]
async fn market_summary_is_keyed_by_exchange_with_fractional_change() {
    let transport = FixtureTransport::new().with_body(
        EndpointKind::MarketSummary,
        include_str!("../fixtures/market_summary_us.json"),
    );
    let summary = fetch_and_adapt(&MarketSummaryAdapter::new(MarketId::us()), &transport)
        .await
        .expect("summary");

    let exchanges: Vec<&str> = summary.items().keys().map(String::as_str).collect();
    assert_eq!(exchanges, ["DJI", "NIM", "SNP"]);

    let snp = summary.get("SNP").expect("S&P 500");
    assert_eq!(snp.symbol.as_deref(), Some("^GSPC"));
    assert_eq!(snp.change_percent, Some(Fraction::new(dec("-0.010193"))));
    assert_eq!(snp.change, Some(dec("-52.3")));
    assert_eq!(snp.source_interval_secs, Some(15));
    assert_eq!(snp.data_delay_secs, Some(0));
}
