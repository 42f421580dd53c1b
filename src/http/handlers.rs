//! Axum HTTP handlers for the web server
//!
//! Provides the JSON-RPC endpoint, connection teardown and general metadata endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::http::CONNECTION_ID_HEADER;
use crate::rpc::error_code::ErrorCode;
use crate::{errors::AppError, AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub rpc_endpoint: &'static str,
    pub protocols: Vec<&'static str>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn discovery(State(state): State<AppState>) -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        rpc_endpoint: "/rpc",
        protocols: state.protocols.names(),
    })
}

pub async fn rpc_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return (
                StatusCode::OK,
                Json(ErrorCode::ParseError.message_response(Value::Null, "Parse error")),
            )
                .into_response()
        }
    };

    if payload.as_array().is_some_and(Vec::is_empty) {
        return (
            StatusCode::OK,
            Json(vec![
                ErrorCode::InvalidRequest.message_response(Value::Null, "Invalid Request"),
            ]),
        )
            .into_response();
    }

    let connection_id = headers
        .get(CONNECTION_ID_HEADER)
        .and_then(|value| value.to_str().ok());
    let resolved = state.connections.resolve(connection_id);
    let connection = resolved.connection();

    let reply = state.protocols.dispatch(&payload, connection).await;
    let mut response = match reply.into_payload() {
        Some(payload) => (StatusCode::OK, Json(payload)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };

    if resolved.is_transient() {
        state.protocols.connection_destroyed(connection);
    } else if let Ok(value) = connection.id().parse::<HeaderValue>() {
        response.headers_mut().insert(CONNECTION_ID_HEADER, value);
    }
    response
}

pub async fn close_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let connection = state.connections.remove(&id).ok_or_else(|| {
        AppError::not_found("unknown_connection", format!("no connection with id {id}"))
    })?;

    state.protocols.connection_destroyed(&connection);
    let age_ms = (Utc::now() - connection.created_at()).num_milliseconds();
    info!(connection = %id, age_ms, "connection closed");
    Ok(StatusCode::NO_CONTENT)
}
