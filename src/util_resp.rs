use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

pub type StandardResponse = Result<SuccessResponse, FailureResponse>;

pub fn success<T: Serialize>(body: T) -> StandardResponse {
    Ok(SuccessResponse::Success(serde_json::to_value(body)?))
}

pub fn created<T: Serialize>(body: T) -> StandardResponse {
    Ok(SuccessResponse::Created(serde_json::to_value(body)?))
}

pub fn message(msg: &str) -> StandardResponse {
    success(json!({ "message": msg }))
}

pub fn bad_request(msg: impl Into<String>) -> StandardResponse {
    Err(FailureResponse::BadRequest(msg.into()))
}

pub fn err_not_found(msg: impl Into<String>) -> StandardResponse {
    Err(FailureResponse::NotFound(msg.into()))
}

#[derive(Debug)]
pub enum SuccessResponse {
    Success(Value),
    Created(Value),
}

impl IntoResponse for SuccessResponse {
    fn into_response(self) -> Response {
        match self {
            SuccessResponse::Success(body) => {
                (StatusCode::OK, Json(body)).into_response()
            }
            SuccessResponse::Created(body) => {
                (StatusCode::CREATED, Json(body)).into_response()
            }
        }
    }
}

#[derive(Debug)]
pub enum FailureResponse {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    ServerError(String),
}

impl FailureResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            FailureResponse::BadRequest(_) => StatusCode::BAD_REQUEST,
            FailureResponse::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            FailureResponse::NotFound(_) => StatusCode::NOT_FOUND,
            FailureResponse::ServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for FailureResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match self {
            FailureResponse::BadRequest(msg)
            | FailureResponse::Unauthorized(msg)
            | FailureResponse::NotFound(msg)
            | FailureResponse::ServerError(msg) => msg,
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

// Internal failures are logged here, so that handlers can just use `?` and
// the client only ever sees a generic message.
impl From<diesel::result::Error> for FailureResponse {
    fn from(e: diesel::result::Error) -> Self {
        tracing::error!("database error: {e}");
        FailureResponse::ServerError("Database error".to_string())
    }
}

impl From<diesel::r2d2::PoolError> for FailureResponse {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        tracing::error!("could not get a connection from the pool: {e}");
        FailureResponse::ServerError("Database error".to_string())
    }
}

impl From<serde_json::Error> for FailureResponse {
    fn from(e: serde_json::Error) -> Self {
        tracing::error!("failed to serialize response: {e}");
        FailureResponse::ServerError("Internal error".to_string())
    }
}

impl From<JsonRejection> for FailureResponse {
    fn from(rejection: JsonRejection) -> Self {
        FailureResponse::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for FailureResponse {
    fn from(rejection: QueryRejection) -> Self {
        FailureResponse::BadRequest(rejection.body_text())
    }
}

/// A JSON request body whose rejection is reported in the same
/// `{"error": ...}` shape as every other failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(FailureResponse))]
pub struct JsonBody<T>(pub T);

/// Query string counterpart of [`JsonBody`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(FailureResponse))]
pub struct QueryParams<T>(pub T);
