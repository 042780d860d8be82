use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use glimpse_common::GlimpseError;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// HTTP server errors
#[derive(Debug, Error, Diagnostic)]
pub enum ServerError {
    #[error("failed to bind to {addr}")]
    #[diagnostic(
        code(glimpse::server::bind),
        help("is another glimpse already running? change [server] listen_addr")
    )]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server terminated unexpectedly")]
    #[diagnostic(code(glimpse::server::serve))]
    Serve {
        #[source]
        source: std::io::Error,
    },
}

/// Errors a handler can answer with.
#[derive(Error, Debug, Diagnostic)]
pub enum ApiError {
    #[error("Invalid payload.")]
    #[diagnostic(code(glimpse::server::invalid_json))]
    InvalidJsonBody(#[from] JsonRejection),

    #[error("A settings error has occurred.")]
    #[diagnostic(transparent)]
    Settings(#[from] GlimpseError),

    #[error("The preview session has stopped.")]
    #[diagnostic(code(glimpse::server::session_closed))]
    SessionClosed,
}

#[derive(Serialize, Deserialize)]
pub struct ApiErrorResp {
    pub message: String,
}

// Log the detailed cause; answer with the short message only.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_to_log = match &self {
            ApiError::InvalidJsonBody(err) => match err {
                JsonRejection::JsonDataError(e) => e.body_text(),
                JsonRejection::JsonSyntaxError(e) => e.body_text(),
                JsonRejection::MissingJsonContentType(_) => {
                    "Missing `Content-Type: application/json` header".to_string()
                }
                JsonRejection::BytesRejection(_) => "Failed to buffer request body".to_string(),
                _ => "Unknown error".to_string(),
            },
            ApiError::Settings(err) => match std::error::Error::source(err) {
                Some(cause) => format!("{err}: {cause}"),
                None => err.to_string(),
            },
            ApiError::SessionClosed => self.to_string(),
        };
        error!("{}", error_to_log);

        let status = match &self {
            ApiError::InvalidJsonBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Settings(GlimpseError::NotTex { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Settings(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::SessionClosed => StatusCode::SERVICE_UNAVAILABLE,
        };
        let resp = ApiErrorResp {
            message: match &self {
                ApiError::Settings(err) => err.to_string(),
                other => other.to_string(),
            },
        };
        (status, Json(resp)).into_response()
    }
}
