//! Client side of flyer persistence: multipart upload to `/api/save-flyer`
//! and history reads from `/api/get-flyers`.

use axum::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use time::Date;
use tracing::{debug, instrument};

use super::dto::{FlyerItem, FlyerRecord, FlyersResponse, SaveFlyerResponse};
use crate::{
    errors::{FetchError, PersistenceError},
    files::FlyerFile,
};

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFlyer {
    pub flyer_id: i32,
    pub image_urls: Vec<String>,
}

#[async_trait]
pub trait FlyerPersistence: Send + Sync {
    async fn persist_flyer(
        &self,
        files: &[FlyerFile],
        store_name: &str,
        flyer_date: Date,
        items: &[FlyerItem],
    ) -> Result<SavedFlyer, PersistenceError>;

    /// Newest first, at most `limit` (the server caps it at 50).
    async fn list_flyers(&self, limit: u32) -> Result<Vec<FlyerRecord>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub struct HttpFlyerClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFlyerClient {
    /// * `base_url` - server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn form(
        files: &[FlyerFile],
        store_name: &str,
        flyer_date: Date,
        items: &[FlyerItem],
    ) -> Result<Form, PersistenceError> {
        let mut form = Form::new();
        for f in files {
            let part = Part::bytes(f.body.to_vec())
                .file_name(f.file_name.clone())
                .mime_str(&f.content_type)?;
            form = form.part("files", part);
        }
        let items = serde_json::to_string(items)
            .map_err(|e| PersistenceError::Storage(format!("encode items: {e}")))?;
        Ok(form
            .text("storeName", store_name.to_string())
            .text("flyerDate", flyer_date.to_string())
            .text("items", items))
    }
}

/// Pulls `{"error": ".."}` out of a failed response, falling back to `fallback`.
async fn error_message(response: reqwest::Response, fallback: &str) -> String {
    response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| fallback.to_string())
}

#[async_trait]
impl FlyerPersistence for HttpFlyerClient {
    #[instrument(skip(self, files, items), fields(files = files.len(), items = items.len()))]
    async fn persist_flyer(
        &self,
        files: &[FlyerFile],
        store_name: &str,
        flyer_date: Date,
        items: &[FlyerItem],
    ) -> Result<SavedFlyer, PersistenceError> {
        let form = Self::form(files, store_name, flyer_date, items)?;
        let response = self
            .client
            .post(self.url("save-flyer"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PersistenceError::Rejected {
                status: status.as_u16(),
                message: error_message(response, "failed to save flyer").await,
            });
        }

        let body: SaveFlyerResponse = response.json().await?;
        debug!(flyer_id = body.flyer_id, "flyer persisted");
        Ok(SavedFlyer {
            flyer_id: body.flyer_id,
            image_urls: body.image_urls,
        })
    }

    #[instrument(skip(self))]
    async fn list_flyers(&self, limit: u32) -> Result<Vec<FlyerRecord>, FetchError> {
        let response = self
            .client
            .get(self.url("get-flyers"))
            .query(&[("limit", limit)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Server {
                status: status.as_u16(),
                message: error_message(response, "failed to fetch flyer history").await,
            });
        }

        let body: FlyersResponse = response.json().await?;
        Ok(body.flyers)
    }
}
