use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Raw feed message that cannot become an `UpdateRecord`.
/// Always recovered locally: the message is dropped and ingestion goes on.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed ticker message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("ticker message has an empty symbol")]
    EmptySymbol,

    #[error("non-finite price {price} for {symbol}")]
    NonFinitePrice { symbol: String, price: f64 },

    #[error("negative event time {event_time} for {symbol}")]
    NegativeEventTime { symbol: String, event_time: i64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The consumer side went away while the producer was still running.
    /// Never happens in a correctly wired pipeline.
    #[error("ingestion queue closed while the receive loop was still producing")]
    Closed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("symbol parameter is required")]
    MissingSymbol,
}

/// HTTP-facing errors of the query route.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("price not found for symbol {0}")]
    NotFound(String),
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        };

        let body = Json(json!({
            "error": code,
            "message": self.to_string()
        }));

        (status, body).into_response()
    }
}
