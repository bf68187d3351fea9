use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    /// `None` when `GEMINI_API_KEY` is not set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty())?;
        Some(Self {
            api_key,
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.into()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.into()),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlobConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Prefix for the public URL of an uploaded object; `{base}/{key}`.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub blob: BlobConfig,
    pub gemini: Option<GeminiConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;

        let endpoint = std::env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT")?;
        let bucket = std::env::var("MINIO_BUCKET").context("MINIO_BUCKET")?;
        let public_base_url = std::env::var("BLOB_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
        let blob = BlobConfig {
            access_key: std::env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY")?,
            secret_key: std::env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY")?,
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
            endpoint,
            bucket,
            public_base_url,
        };

        Ok(Self {
            database_url,
            blob,
            gemini: GeminiConfig::from_env(),
        })
    }
}

/// Settings for the client-side workflow (API location, local data dir).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub api_url: String,
    pub data_dir: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("FLYERCHEF_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            data_dir: std::env::var("FLYERCHEF_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".flyerchef")),
        }
    }
}
