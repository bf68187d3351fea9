use axum::async_trait;
use base64ct::{Base64, Encoding};
use tracing::{debug, info, instrument};

use super::{
    build_prompt,
    dto::{
        response_schema, AnalysisResult, Content, GenerateContentRequest, GenerateContentResponse,
        GenerationConfig, InlineData, Part,
    },
    parse_model_answer, FlyerAnalyzer,
};
use crate::{
    config::GeminiConfig, errors::AnalysisError, files::FlyerFile, preferences::Preferences,
};

/// Analyzer backed by the Gemini `generateContent` REST endpoint.
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiAnalyzer {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request_body(files: &[FlyerFile], prefs: &Preferences) -> GenerateContentRequest {
        let mut parts: Vec<Part> = files
            .iter()
            .map(|f| Part::InlineData {
                inline_data: InlineData {
                    mime_type: f.content_type.clone(),
                    data: Base64::encode_string(&f.body),
                },
            })
            .collect();
        parts.push(Part::Text {
            text: build_prompt(prefs, files.len()),
        });

        GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        }
    }
}

#[async_trait]
impl FlyerAnalyzer for GeminiAnalyzer {
    #[instrument(skip_all, fields(files = files.len(), model = %self.config.model))]
    async fn analyze(
        &self,
        files: &[FlyerFile],
        prefs: &Preferences,
    ) -> Result<AnalysisResult, AnalysisError> {
        let body = Self::request_body(files, prefs);
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AnalysisError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let raw: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(format!("generateContent body: {e}")))?;
        let text = raw
            .first_text()
            .ok_or_else(|| AnalysisError::MalformedResponse("no text candidate".into()))?;
        debug!(len = text.len(), "model answer received");

        let result = parse_model_answer(text)?;
        info!(
            is_flyer = result.is_flyer,
            recipes = result.recipes.len(),
            deals = result.detected_deals.len(),
            "flyer analyzed"
        );
        Ok(result)
    }
}
