//! Operation signatures and parameter binding.
//!
//! Requests are matched against a fixed, ordered table of signatures. Each
//! signature is identified by a token that must appear in the request body.
//! The first signature whose token is present wins, so a token that contains
//! another one (`driverPositionsByRoute` contains `driverPosition`) must be
//! listed before it. A matched signature whose parameters cannot be bound
//! does not fall back to a later data signature; only introspection is
//! still checked.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::model::DriverPositionInput;

/// Inline `"routeId": "<value>"` literal.
static ROUTE_ID_LITERAL: LazyLock<Regex> = LazyLock::new(|| literal_pattern(ROUTE_ID_PARAM));
/// Inline `"driverId": "<value>"` literal.
static DRIVER_ID_LITERAL: LazyLock<Regex> = LazyLock::new(|| literal_pattern(DRIVER_ID_PARAM));

const ROUTE_ID_PARAM: &str = "routeId";
const DRIVER_ID_PARAM: &str = "driverId";
const INPUT_PARAM: &str = "input";

/// An incoming operation request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    /// Operation body text.
    #[serde(default, alias = "operationBody")]
    pub query: String,
    /// Named variables.
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
    /// Accepted for client compatibility, not used for routing.
    #[serde(default)]
    pub operation_name: Option<String>,
}

impl OperationRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_variable(mut self, name: &str, value: Value) -> Self {
        self.variables
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), value);
        self
    }

    fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.as_ref().and_then(|vars| vars.get(name))
    }

    /// Parameter from an inline literal, falling back to a string variable.
    fn string_param(&self, name: &str, literal: &Regex) -> Option<String> {
        literal
            .captures(&self.query)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .or_else(|| {
                self.variable(name)
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .filter(|v| !v.trim().is_empty())
    }

    fn route_id(&self) -> Option<String> {
        self.string_param(ROUTE_ID_PARAM, &ROUTE_ID_LITERAL)
    }

    fn driver_id(&self) -> Option<String> {
        self.string_param(DRIVER_ID_PARAM, &DRIVER_ID_LITERAL)
    }
}

/// The closed set of operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    ListActiveByRoute,
    ListByRoute,
    ListAll,
    Save,
    Delete,
    GetOne,
    Introspect,
}

/// Signature table in match order.
pub const SIGNATURES: [OperationKind; 7] = [
    OperationKind::ListActiveByRoute,
    OperationKind::ListByRoute,
    OperationKind::ListAll,
    OperationKind::Save,
    OperationKind::Delete,
    OperationKind::GetOne,
    OperationKind::Introspect,
];

impl OperationKind {
    /// Substrings identifying this operation in a request body.
    pub fn tokens(self) -> &'static [&'static str] {
        match self {
            OperationKind::ListActiveByRoute => &["activeDriverPositionsByRoute"],
            OperationKind::ListByRoute => &["driverPositionsByRoute"],
            OperationKind::ListAll => &["allDriverPositions"],
            OperationKind::Save => &["saveDriverPosition"],
            OperationKind::Delete => &["deleteDriverPosition"],
            OperationKind::GetOne => &["driverPosition"],
            OperationKind::Introspect => &["__schema", "IntrospectionQuery"],
        }
    }

    /// Key of the result in the response `data` map.
    pub fn field_name(self) -> &'static str {
        match self {
            OperationKind::Introspect => "__schema",
            other => other.tokens()[0],
        }
    }

    fn matches(self, body: &str) -> bool {
        self.tokens().iter().any(|token| body.contains(token))
    }

    fn bind(self, request: &OperationRequest) -> Option<Operation> {
        let operation = match self {
            OperationKind::ListAll => Operation::ListAll,
            OperationKind::ListByRoute => Operation::ListByRoute {
                route_id: request.route_id()?,
            },
            OperationKind::ListActiveByRoute => Operation::ListActiveByRoute {
                route_id: request.route_id()?,
            },
            OperationKind::GetOne => Operation::GetOne {
                route_id: request.route_id()?,
                driver_id: request.driver_id()?,
            },
            OperationKind::Save => {
                let input = request.variable(INPUT_PARAM)?;
                Operation::Save(DriverPositionInput::deserialize(input).ok()?)
            }
            OperationKind::Delete => Operation::Delete {
                route_id: request.route_id()?,
                driver_id: request.driver_id()?,
            },
            OperationKind::Introspect => Operation::Introspect,
        };
        Some(operation)
    }
}

/// A resolved operation with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ListAll,
    ListByRoute { route_id: String },
    ListActiveByRoute { route_id: String },
    GetOne { route_id: String, driver_id: String },
    Save(DriverPositionInput),
    Delete { route_id: String, driver_id: String },
    Introspect,
}

impl Operation {
    /// Resolve a request against the signature table.
    ///
    /// A matched operation that lacks parameters does not fall back to a
    /// later data operation, but an introspection request in the same body
    /// is still answered. `None` means the request is not supported.
    pub fn resolve(request: &OperationRequest) -> Option<Self> {
        let bound = SIGNATURES
            .iter()
            .find(|kind| kind.matches(&request.query))
            .and_then(|kind| kind.bind(request));

        bound.or_else(|| {
            OperationKind::Introspect
                .matches(&request.query)
                .then_some(Operation::Introspect)
        })
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::ListAll => OperationKind::ListAll,
            Operation::ListByRoute { .. } => OperationKind::ListByRoute,
            Operation::ListActiveByRoute { .. } => OperationKind::ListActiveByRoute,
            Operation::GetOne { .. } => OperationKind::GetOne,
            Operation::Save(_) => OperationKind::Save,
            Operation::Delete { .. } => OperationKind::Delete,
            Operation::Introspect => OperationKind::Introspect,
        }
    }
}

fn literal_pattern(name: &str) -> Regex {
    let pattern = format!(r#""{}"\s*:\s*"([^"]+)""#, regex::escape(name));
    Regex::new(&pattern).expect("Invalid parameter literal regex")
}
