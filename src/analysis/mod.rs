//! Flyer analysis: the client contract, the Gemini-backed implementation,
//! an HTTP client for this crate's own `/api/analyze` route, and that route.

pub mod dto;
pub mod gemini;
pub mod handlers;
pub mod http;
mod prompt;

use axum::async_trait;
use tracing::warn;
use uuid::Uuid;

pub use dto::AnalysisResult;
pub use gemini::GeminiAnalyzer;
pub use http::HttpAnalyzer;
pub use prompt::build_prompt;

use crate::{errors::AnalysisError, files::FlyerFile, preferences::Preferences};
use dto::ModelAnswer;

pub const EXPECTED_RECIPES: usize = 3;

#[async_trait]
pub trait FlyerAnalyzer: Send + Sync {
    /// One analysis run over `files` (at least one) with a preferences snapshot.
    async fn analyze(
        &self,
        files: &[FlyerFile],
        prefs: &Preferences,
    ) -> Result<AnalysisResult, AnalysisError>;
}

/// Parses the model's JSON text into a strict [`AnalysisResult`].
///
/// Recipe ids are assigned here. Any missing field the branch needs is an error.
pub fn parse_model_answer(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let answer: ModelAnswer = serde_json::from_str(text)
        .map_err(|e| AnalysisError::MalformedResponse(format!("not the expected JSON: {e}")))?;

    if !answer.is_flyer {
        let joke = answer
            .joke
            .filter(|j| !j.trim().is_empty())
            .ok_or_else(|| AnalysisError::MalformedResponse("non-flyer answer without joke".into()))?;
        return Ok(AnalysisResult {
            is_flyer: false,
            joke: Some(joke),
            recipes: Vec::new(),
            detected_deals: Vec::new(),
        });
    }

    let model_recipes = answer
        .recipes
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AnalysisError::MalformedResponse("flyer answer without recipes".into()))?;
    if model_recipes.len() != EXPECTED_RECIPES {
        warn!(count = model_recipes.len(), "unexpected recipe count");
    }

    let recipes = model_recipes
        .into_iter()
        .map(|r| r.into_recipe(Uuid::new_v4().to_string()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(AnalysisError::MalformedResponse)?;

    Ok(AnalysisResult {
        is_flyer: true,
        joke: None,
        recipes,
        detected_deals: answer.detected_deals.unwrap_or_default(),
    })
}

/// Checks the branch invariants of a result that arrived already typed,
/// e.g. from this crate's own `/api/analyze`.
pub fn check_result(result: &AnalysisResult) -> Result<(), AnalysisError> {
    if !result.is_flyer {
        if result.joke.as_deref().map_or(true, |j| j.trim().is_empty()) {
            return Err(AnalysisError::MalformedResponse(
                "non-flyer answer without joke".into(),
            ));
        }
        return Ok(());
    }
    if result.recipes.is_empty() {
        return Err(AnalysisError::MalformedResponse(
            "flyer answer without recipes".into(),
        ));
    }
    if let Some(bad) = result.recipes.iter().find(|r| {
        r.cooking_time_minutes == 0 || r.nutrition.as_ref().is_some_and(|n| !n.is_valid())
    }) {
        return Err(AnalysisError::MalformedResponse(format!(
            "invalid recipe \"{}\"",
            bad.title
        )));
    }
    Ok(())
}
