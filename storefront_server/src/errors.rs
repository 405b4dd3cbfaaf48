use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use serde_json::json;
use storefront_engine::OrderFlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Missing or unreadable {0} header")]
    MissingIdentityHeader(&'static str),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("{0}")]
    OrderFlow(#[from] OrderFlowError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingIdentityHeader(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::OrderFlow(e) => match e {
                OrderFlowError::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
                OrderFlowError::PendingOrderExists { .. } => StatusCode::PAYMENT_REQUIRED,
                OrderFlowError::NotCancellable { .. } => StatusCode::BAD_REQUEST,
                OrderFlowError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                OrderFlowError::UnknownPaymentStatus(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::StoreError(_) | OrderFlowError::TransportError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                },
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            // Conflict and state errors carry enough context for the client to act on.
            Self::OrderFlow(OrderFlowError::PendingOrderExists { order_id, status }) => json!({
                "error": self.to_string(),
                "details": {
                    "order_id": order_id,
                    "status": status,
                    "next_steps": "Pay for or cancel the existing order before checking out again.",
                },
            }),
            Self::OrderFlow(OrderFlowError::NotCancellable { order_id, current }) => json!({
                "error": self.to_string(),
                "details": {
                    "order_id": order_id,
                    "status": current,
                    "next_steps": "Orders that are past the pending state can only be reversed with a refund.",
                },
            }),
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}
