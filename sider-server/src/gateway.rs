//! HTTP/JSON gateway
//!
//! Translates REST calls onto the gRPC service by acting as a gRPC client of
//! the RPC listener. The gateway performs no authentication of its own: it
//! forwards the `Login` and `Password` headers as `login`/`password` metadata
//! and the RPC side's interceptor decides. No other header is forwarded.

use crate::auth::{LOGIN_METADATA, PASSWORD_METADATA};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sider_core::NEVER_EXPIRES;
use sider_proto::sider_client::SiderClient;
use sider_proto::{
    DeleteExpiredRequest, FlushRequest, GetRequest, KeysRequest, RemoveRequest, SetRequest,
    SnapshotRequest, TtlRequest, UpdateRequest,
};
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::Channel;

/// HTTP header carrying the client identifier
pub const LOGIN_HEADER: &str = "login";

/// HTTP header carrying the client secret
pub const PASSWORD_HEADER: &str = "password";

/// Header → metadata pairs copied onto every forwarded call
const FORWARDED_HEADERS: [(&str, &str); 2] = [
    (LOGIN_HEADER, LOGIN_METADATA),
    (PASSWORD_HEADER, PASSWORD_METADATA),
];

#[derive(Clone)]
struct GatewayState {
    client: SiderClient<Channel>,
}

/// Builds the gateway router on top of a client of the RPC listener
pub fn router(client: SiderClient<Channel>) -> Router {
    Router::new()
        .route("/v1/keys", get(keys))
        .route(
            "/v1/keys/{key}",
            get(get_key).put(set_key).patch(update_key).delete(remove_key),
        )
        .route("/v1/keys/{key}/ttl", get(ttl))
        .route("/v1/admin/flush", post(flush))
        .route("/v1/admin/sweep", post(delete_expired))
        .route("/v1/admin/snapshot", post(snapshot))
        .with_state(GatewayState { client })
}

/// Wraps a message in a gRPC request carrying the forwarded credential headers
fn forward<T>(headers: &HeaderMap, message: T) -> tonic::Request<T> {
    let mut request = tonic::Request::new(message);
    for (header, key) in FORWARDED_HEADERS {
        let value: Option<MetadataValue<Ascii>> = headers
            .get(header)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| MetadataValue::try_from(v).ok());
        if let Some(value) = value {
            request.metadata_mut().insert(key, value);
        }
    }
    request
}

/// Error response body: the gRPC status code and message
#[derive(Debug)]
pub struct GatewayError {
    status: StatusCode,
    code: i32,
    message: String,
}

impl GatewayError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: tonic::Code::InvalidArgument as i32,
            message: message.into(),
        }
    }
}

fn http_status(code: tonic::Code) -> StatusCode {
    match code {
        tonic::Code::Ok => StatusCode::OK,
        tonic::Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        tonic::Code::NotFound => StatusCode::NOT_FOUND,
        tonic::Code::InvalidArgument => StatusCode::BAD_REQUEST,
        tonic::Code::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
        tonic::Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<tonic::Status> for GatewayError {
    fn from(status: tonic::Status) -> Self {
        Self {
            status: http_status(status.code()),
            code: status.code() as i32,
            message: status.message().to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "code": self.code, "message": self.message }));
        (self.status, body).into_response()
    }
}

fn decode_value(encoded: &str) -> Result<Vec<u8>, GatewayError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| GatewayError::bad_request(format!("value is not valid base64: {}", e)))
}

fn never_expires() -> i64 {
    NEVER_EXPIRES
}

#[derive(Debug, Deserialize)]
struct SetBody {
    value: String,
    #[serde(default = "never_expires")]
    expires: i64,
}

#[derive(Debug, Deserialize)]
struct UpdateBody {
    value: String,
}

#[derive(Debug, Deserialize)]
struct KeysQuery {
    #[serde(default)]
    pattern: String,
}

#[derive(Debug, Serialize)]
struct EntryBody {
    value: String,
    expires: i64,
}

async fn set_key(
    State(mut state): State<GatewayState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SetBody>,
) -> Result<Json<Value>, GatewayError> {
    let value = decode_value(&body.value)?;
    let request = forward(
        &headers,
        SetRequest {
            key,
            value: value.into(),
            expires: body.expires,
        },
    );
    state.client.set(request).await?;
    Ok(Json(json!({})))
}

async fn get_key(
    State(mut state): State<GatewayState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Json<EntryBody>, GatewayError> {
    let response = state
        .client
        .get(forward(&headers, GetRequest { key }))
        .await?
        .into_inner();
    Ok(Json(EntryBody {
        value: STANDARD.encode(&response.value),
        expires: response.expires,
    }))
}

async fn update_key(
    State(mut state): State<GatewayState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UpdateBody>,
) -> Result<Json<Value>, GatewayError> {
    let value = decode_value(&body.value)?;
    let request = forward(
        &headers,
        UpdateRequest {
            key,
            value: value.into(),
        },
    );
    state.client.update(request).await?;
    Ok(Json(json!({})))
}

async fn remove_key(
    State(mut state): State<GatewayState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    state
        .client
        .remove(forward(&headers, RemoveRequest { key }))
        .await?;
    Ok(Json(json!({})))
}

async fn keys(
    State(mut state): State<GatewayState>,
    Query(query): Query<KeysQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    let response = state
        .client
        .keys(forward(&headers, KeysRequest { pattern: query.pattern }))
        .await?
        .into_inner();
    Ok(Json(json!({ "keys": response.keys })))
}

async fn ttl(
    State(mut state): State<GatewayState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    let response = state
        .client
        .ttl(forward(&headers, TtlRequest { key }))
        .await?
        .into_inner();
    Ok(Json(json!({ "time": response.time })))
}

async fn flush(
    State(mut state): State<GatewayState>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    let response = state
        .client
        .flush(forward(&headers, FlushRequest {}))
        .await?
        .into_inner();
    Ok(Json(json!({ "removed": response.removed })))
}

async fn delete_expired(
    State(mut state): State<GatewayState>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    let response = state
        .client
        .delete_expired(forward(&headers, DeleteExpiredRequest {}))
        .await?
        .into_inner();
    Ok(Json(json!({ "removed": response.removed })))
}

async fn snapshot(
    State(mut state): State<GatewayState>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    let response = state
        .client
        .snapshot(forward(&headers, SnapshotRequest {}))
        .await?
        .into_inner();
    Ok(Json(json!({ "path": response.path, "entries": response.entries })))
}
