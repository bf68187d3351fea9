use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// User-fixable input problem. Raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no files")]
    NoFiles,
    #[error("invalid budget")]
    InvalidBudget,
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
}

/// Failure of the AI call or of the shape of its answer.
///
/// A "this is not a flyer" answer is not an error, it is
/// `AnalysisResult { is_flyer: false, .. }`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("analysis service error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("malformed analysis response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("flyer save request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("flyer save rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("flyer save failed: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("flyer history request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("flyer history unavailable ({status}): {message}")]
    Server { status: u16, message: String },
}

/// Why `submit_analysis` did not produce a result.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("analysis already in progress")]
    AnalysisInFlight,

    #[error("reset before starting a new analysis")]
    ResultPending,
}

/// Local durable slot could not be written.
#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("local store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("local store encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// HTTP-facing error for the server routes. Rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Unavailable(&'static str),

    #[error("{public}")]
    Internal {
        public: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn internal(public: &'static str, source: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal {
            public,
            source: source.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { public, source } => {
                tracing::error!(error = ?source, public = %public, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
