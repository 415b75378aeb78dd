//! Operation dispatcher.
//!
//! Maps a request body to one of a closed set of position operations,
//! executes it against the [`PositionService`] and wraps the result in a
//! response envelope. Successful saves are published to the route's topic.

mod operation;

pub use operation::{Operation, OperationKind, OperationRequest, SIGNATURES};

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::handlers::stream::TopicRegistry;
use crate::services::PositionService;

/// Message returned for requests that resolve to no operation.
pub const UNSUPPORTED_MESSAGE: &str = "operation not supported";

/// Single error entry in an error envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMessage {
    pub message: String,
}

/// Response envelope: `{data: {<operation>: <result>}}` or `{errors: [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OperationResponse {
    Data { data: Map<String, Value> },
    Errors { errors: Vec<ErrorMessage> },
}

impl OperationResponse {
    /// Data envelope holding `value` under `field`.
    pub fn data<T: Serialize>(field: &str, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                let mut data = Map::new();
                data.insert(field.to_string(), value);
                OperationResponse::Data { data }
            }
            Err(e) => Self::error(format!("failed to encode {field}: {e}")),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        OperationResponse::Errors {
            errors: vec![ErrorMessage {
                message: message.into(),
            }],
        }
    }

    pub fn unsupported() -> Self {
        Self::error(UNSUPPORTED_MESSAGE)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, OperationResponse::Errors { .. })
    }

    /// Result stored under `field`, if this is a data envelope.
    pub fn field(&self, field: &str) -> Option<&Value> {
        match self {
            OperationResponse::Data { data } => data.get(field),
            OperationResponse::Errors { .. } => None,
        }
    }

    /// First error message, if this is an error envelope.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            OperationResponse::Errors { errors } => errors.first().map(|e| e.message.as_str()),
            OperationResponse::Data { .. } => None,
        }
    }
}

/// Static schema type listing returned for introspection requests.
fn schema_types() -> Value {
    json!({
        "types": [
            { "name": "Query", "kind": "OBJECT" },
            { "name": "Mutation", "kind": "OBJECT" },
            { "name": "DriverPositionType", "kind": "OBJECT" },
            { "name": "DriverPositionInput", "kind": "INPUT_OBJECT" },
            { "name": "DriverPositionResult", "kind": "OBJECT" }
        ]
    })
}

/// Executes resolved operations and publishes successful saves.
pub struct OperationDispatcher {
    service: Arc<PositionService>,
    topics: Arc<TopicRegistry>,
}

impl OperationDispatcher {
    pub fn new(service: Arc<PositionService>, topics: Arc<TopicRegistry>) -> Self {
        Self { service, topics }
    }

    pub fn topics(&self) -> &Arc<TopicRegistry> {
        &self.topics
    }

    /// Resolve and execute a request.
    ///
    /// Store failures on reads become an error envelope. Save and delete
    /// always answer with a data envelope carrying the mutation result.
    #[tracing::instrument(name = "dispatcher.execute", skip_all, fields(operation))]
    pub async fn execute(&self, request: &OperationRequest) -> OperationResponse {
        let Some(operation) = Operation::resolve(request) else {
            warn!(query_len = request.query.len(), "Unsupported operation");
            return OperationResponse::unsupported();
        };

        let field = operation.kind().field_name();
        tracing::Span::current().record("operation", field);
        debug!("Dispatching operation");

        match operation {
            Operation::ListAll => match self.service.list_all().await {
                Ok(positions) => OperationResponse::data(field, &positions),
                Err(e) => OperationResponse::error(e.to_string()),
            },
            Operation::ListByRoute { route_id } => {
                match self.service.list_by_route(&route_id).await {
                    Ok(positions) => OperationResponse::data(field, &positions),
                    Err(e) => OperationResponse::error(e.to_string()),
                }
            }
            Operation::ListActiveByRoute { route_id } => {
                match self.service.list_active_by_route(&route_id).await {
                    Ok(positions) => OperationResponse::data(field, &positions),
                    Err(e) => OperationResponse::error(e.to_string()),
                }
            }
            Operation::GetOne {
                route_id,
                driver_id,
            } => match self.service.get(&route_id, &driver_id).await {
                Ok(position) => OperationResponse::data(field, &position),
                Err(e) => OperationResponse::error(e.to_string()),
            },
            Operation::Save(input) => {
                let result = self.service.save(input).await;
                if let (true, Some(position)) = (result.success, &result.driver_position) {
                    self.topics.publish(&position.route_id, position).await;
                }
                OperationResponse::data(field, &result)
            }
            Operation::Delete {
                route_id,
                driver_id,
            } => {
                let result = self.service.remove(&route_id, &driver_id).await;
                OperationResponse::data(field, &result)
            }
            Operation::Introspect => OperationResponse::data(field, &schema_types()),
        }
    }
}
