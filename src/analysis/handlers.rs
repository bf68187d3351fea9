use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::AnalysisResult;
use crate::{
    errors::{AnalysisError, ApiError, ValidationError},
    flyers::handlers::{read_file, read_text, MAX_UPLOAD_BYTES},
    preferences::Preferences,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// POST /api/analyze (multipart)
/// Fields: files (repeated), preferences (JSON, optional)
#[instrument(skip(state, mp))]
pub async fn analyze(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    let mut files = Vec::new();
    let mut prefs = Preferences::default();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("files") | Some("files[]") => files.push(read_file(field).await?),
            Some("preferences") => {
                let raw = read_text(field).await?;
                prefs = serde_json::from_str(&raw)
                    .map_err(|e| ApiError::BadRequest(format!("invalid preferences: {e}")))?;
            }
            other => warn!(field = ?other, "unknown multipart field ignored"),
        }
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest(ValidationError::NoFiles.to_string()));
    }
    prefs
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let analyzer = state
        .analyzer
        .clone()
        .ok_or(ApiError::Unavailable("analysis is not configured"))?;
    let result = analyzer.analyze(&files, &prefs).await.map_err(|e| match e {
        AnalysisError::Transport(e) => ApiError::internal("Failed to analyze flyer", e),
        other => ApiError::Upstream(other.to_string()),
    })?;
    info!(
        is_flyer = result.is_flyer,
        recipes = result.recipes.len(),
        "analysis complete"
    );
    Ok(Json(result))
}
