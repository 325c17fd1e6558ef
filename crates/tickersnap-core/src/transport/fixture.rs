use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{EndpointKind, FetchRequest, RawResponse, Transport, TransportError};

#[derive(Debug, Clone)]
enum Canned {
    Response(RawResponse),
    Failure(TransportError),
}

/// Deterministic offline transport keyed by endpoint kind.
///
/// Endpoints without a canned response answer HTTP 404. Every call is
/// counted and recorded, including those that end up failing.
#[derive(Debug, Default)]
pub struct FixtureTransport {
    canned: BTreeMap<EndpointKind, Canned>,
    delays: BTreeMap<EndpointKind, Duration>,
    fetches: AtomicUsize,
    recorded: Mutex<Vec<FetchRequest>>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with HTTP 200.
    pub fn with_body(self, endpoint: EndpointKind, body: impl Into<Vec<u8>>) -> Self {
        self.with_response(endpoint, RawResponse::ok(body))
    }

    pub fn with_status(
        self,
        endpoint: EndpointKind,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.with_response(
            endpoint,
            RawResponse {
                status,
                body: body.into(),
            },
        )
    }

    pub fn with_response(mut self, endpoint: EndpointKind, response: RawResponse) -> Self {
        self.canned.insert(endpoint, Canned::Response(response));
        self
    }

    pub fn with_error(mut self, endpoint: EndpointKind, error: TransportError) -> Self {
        self.canned.insert(endpoint, Canned::Failure(error));
        self
    }

    /// Hold the response for `delay` before answering.
    pub fn with_delay(mut self, endpoint: EndpointKind, delay: Duration) -> Self {
        self.delays.insert(endpoint, delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn recorded_requests(&self) -> Vec<FetchRequest> {
        self.recorded
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn record(&self, request: &FetchRequest) {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut guard = self
            .recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.push(request.clone());
    }
}

impl Transport for FixtureTransport {
    fn fetch<'a>(
        &'a self,
        request: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            self.record(&request);

            if let Some(delay) = self.delays.get(&request.endpoint) {
                tokio::time::sleep(*delay).await;
            }

            match self.canned.get(&request.endpoint) {
                Some(Canned::Response(response)) => Ok(response.clone()),
                Some(Canned::Failure(error)) => Err(error.clone()),
                None => Ok(RawResponse {
                    status: 404,
                    body: Vec::new(),
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;

    fn request(endpoint: EndpointKind) -> FetchRequest {
        FetchRequest::for_symbol(endpoint, Symbol::parse("AAPL").expect("symbol"))
    }

    #[tokio::test]
    async fn serves_canned_bodies_and_counts_calls() {
        let transport = FixtureTransport::new().with_body(EndpointKind::Quote, "{}");

        let response = transport
            .fetch(request(EndpointKind::Quote))
            .await
            .expect("canned response");
        assert_eq!(response.body, b"{}".to_vec());

        let missing = transport
            .fetch(request(EndpointKind::Info))
            .await
            .expect("fallback response");
        assert_eq!(missing.status, 404);

        assert_eq!(transport.fetch_count(), 2);
        assert_eq!(transport.recorded_requests()[1].endpoint, EndpointKind::Info);
    }

    #[tokio::test]
    async fn replays_transport_errors() {
        let transport = FixtureTransport::new().with_error(
            EndpointKind::Splits,
            TransportError::Timeout {
                endpoint: EndpointKind::Splits,
            },
        );

        let err = transport
            .fetch(request(EndpointKind::Splits))
            .await
            .expect_err("canned failure");
        assert_eq!(
            err,
            TransportError::Timeout {
                endpoint: EndpointKind::Splits
            }
        );
    }

    #[tokio::test]
    async fn delays_responses_per_endpoint() {
        let transport = FixtureTransport::new()
            .with_body(EndpointKind::History, "{}")
            .with_delay(EndpointKind::History, Duration::from_millis(30));

        let started = tokio::time::Instant::now();
        transport
            .fetch(request(EndpointKind::History))
            .await
            .expect("delayed response");
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
