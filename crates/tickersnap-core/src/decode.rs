//! Response decoding into a provider-agnostic tree.
//!
//! [`decode`] turns a response body into a [`DecodedTree`] and verifies the
//! structural marker each endpoint needs (for example `chart.result`).
//! Nothing is converted to domain types here; that is the normalizer's job.

use std::collections::BTreeMap;

use serde_json::{Number, Value};
use thiserror::Error;

use crate::transport::EndpointKind;

/// Leaf of a decoded payload.
///
/// Numbers keep their JSON text, so decimals are built without passing
/// through a float.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

/// Decoded response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedTree {
    Map(BTreeMap<String, DecodedTree>),
    Seq(Vec<DecodedTree>),
    Scalar(Scalar),
}

impl DecodedTree {
    pub const fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    /// Parse a JSON document without any marker checks.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice::<Value>(bytes).map(Self::from)
    }

    /// Child of a map node.
    pub fn get(&self, key: &str) -> Option<&DecodedTree> {
        match self {
            Self::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Walk a dotted path; numeric segments index into sequences.
    pub fn path(&self, path: &str) -> Option<&DecodedTree> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('.').try_fold(self, |node, segment| match node {
            Self::Map(entries) => entries.get(segment),
            Self::Seq(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
            Self::Scalar(_) => None,
        })
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, DecodedTree>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[DecodedTree]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Scalar(Scalar::Number(number)) => Some(number),
            _ => None,
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Null))
    }

    /// Short description used in error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Map(_) => "object",
            Self::Seq(_) => "array",
            Self::Scalar(Scalar::Null) => "null",
            Self::Scalar(Scalar::Bool(_)) => "boolean",
            Self::Scalar(Scalar::Number(_)) => "number",
            Self::Scalar(Scalar::Text(_)) => "string",
        }
    }
}

impl From<Value> for DecodedTree {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(flag) => Self::Scalar(Scalar::Bool(flag)),
            Value::Number(number) => Self::Scalar(Scalar::Number(number)),
            Value::String(text) => Self::Scalar(Scalar::Text(text)),
            Value::Array(items) => Self::Seq(items.into_iter().map(Self::from).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Payload could not be decoded into the shape an endpoint needs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed {endpoint} payload: {reason}")]
    MalformedPayload {
        endpoint: EndpointKind,
        reason: String,
    },
    #[error("{endpoint} payload has no '{marker}'{}", hint_suffix(.hint))]
    UnexpectedSchema {
        endpoint: EndpointKind,
        marker: &'static str,
        hint: Option<String>,
    },
}

impl DecodeError {
    pub fn malformed(endpoint: EndpointKind, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            endpoint,
            reason: reason.into(),
        }
    }
}

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_deref()
        .map(|hint| format!(" ({hint})"))
        .unwrap_or_default()
}

/// Structural marker that must hold an array for `endpoint`.
pub const fn required_marker(endpoint: EndpointKind) -> &'static str {
    match endpoint {
        EndpointKind::Quote => "quoteResponse.result",
        EndpointKind::History | EndpointKind::Dividends | EndpointKind::Splits => "chart.result",
        EndpointKind::Info => "quoteSummary.result",
        EndpointKind::MarketTime => "finance.marketTimes",
        EndpointKind::MarketSummary => "marketSummaryResponse.result",
    }
}

/// Decode `bytes` and check the endpoint's structural marker.
pub fn decode(endpoint: EndpointKind, bytes: &[u8]) -> Result<DecodedTree, DecodeError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::malformed(endpoint, "empty body"));
    }

    let tree = DecodedTree::from_json(bytes)
        .map_err(|error| DecodeError::malformed(endpoint, format!("invalid JSON: {error}")))?;
    if tree.as_map().is_none() {
        return Err(DecodeError::malformed(
            endpoint,
            format!("top level is {}, expected object", tree.kind_name()),
        ));
    }

    check_marker(endpoint, &tree)?;
    Ok(tree)
}

fn check_marker(endpoint: EndpointKind, tree: &DecodedTree) -> Result<(), DecodeError> {
    let marker = required_marker(endpoint);
    let mut node = tree;
    for segment in marker.split('.') {
        let Some(entries) = node.as_map() else {
            return Err(DecodeError::malformed(
                endpoint,
                format!("'{marker}' crosses a {} node", node.kind_name()),
            ));
        };
        match entries.get(segment) {
            Some(child) if !child.is_null() => node = child,
            _ => {
                return Err(DecodeError::UnexpectedSchema {
                    endpoint,
                    marker,
                    hint: provider_hint(tree, marker),
                });
            }
        }
    }

    if node.as_seq().is_none() {
        return Err(DecodeError::malformed(
            endpoint,
            format!("'{marker}' is {}, expected array", node.kind_name()),
        ));
    }
    Ok(())
}

/// The provider reports failures as `<root>.error.description`.
fn provider_hint(tree: &DecodedTree, marker: &str) -> Option<String> {
    let root = marker.split('.').next()?;
    let error = tree.get(root)?.get("error")?;
    error
        .get("description")
        .or_else(|| error.get("code"))
        .and_then(DecodedTree::as_text)
        .map(str::to_owned)
}
