use axum::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::instrument;

use super::{check_result, AnalysisResult, FlyerAnalyzer};
use crate::{errors::AnalysisError, files::FlyerFile, preferences::Preferences};

/// Analyzer that delegates to a running server's `POST /api/analyze`,
/// so the AI key never leaves the server.
pub struct HttpAnalyzer {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl HttpAnalyzer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn form(files: &[FlyerFile], prefs: &Preferences) -> Result<Form, AnalysisError> {
        let mut form = Form::new();
        for f in files {
            let part = Part::bytes(f.body.to_vec())
                .file_name(f.file_name.clone())
                .mime_str(&f.content_type)?;
            form = form.part("files", part);
        }
        let prefs = serde_json::to_string(prefs)
            .map_err(|e| AnalysisError::MalformedResponse(format!("encode preferences: {e}")))?;
        Ok(form.text("preferences", prefs))
    }
}

#[async_trait]
impl FlyerAnalyzer for HttpAnalyzer {
    #[instrument(skip_all, fields(files = files.len()))]
    async fn analyze(
        &self,
        files: &[FlyerFile],
        prefs: &Preferences,
    ) -> Result<AnalysisResult, AnalysisError> {
        let response = self
            .client
            .post(format!("{}/api/analyze", self.base_url))
            .multipart(Self::form(files, prefs)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| status.to_string());
            return Err(AnalysisError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let result = response
            .json::<AnalysisResult>()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
        check_result(&result)?;
        Ok(result)
    }
}
