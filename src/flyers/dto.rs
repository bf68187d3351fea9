use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Store name used when the user did not enter one.
pub const UNKNOWN_STORE: &str = "不明な店舗";
pub const MAX_HISTORY: i64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlyerItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i32>,
    pub is_discounted: bool,
}

impl FlyerItem {
    /// A detected deal: discounted, price unknown.
    pub fn deal(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            price: None,
            is_discounted: true,
        }
    }
}

/// A persisted flyer with its items. Record fields are snake_case on the
/// wire, item fields camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlyerRecord {
    pub id: i32,
    pub store_name: String,
    #[serde(with = "iso_date")]
    pub flyer_date: Date,
    pub image_urls: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub items: Vec<FlyerItem>,
}

impl FlyerRecord {
    pub fn discounted_items(&self) -> impl Iterator<Item = &FlyerItem> {
        self.items.iter().filter(|i| i.is_discounted)
    }

    pub fn regular_items(&self) -> impl Iterator<Item = &FlyerItem> {
        self.items.iter().filter(|i| !i.is_discounted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFlyerResponse {
    pub success: bool,
    pub flyer_id: i32,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FlyersResponse {
    pub flyers: Vec<FlyerRecord>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    MAX_HISTORY
}

impl HistoryQuery {
    pub fn clamped(&self) -> i64 {
        self.limit.clamp(1, MAX_HISTORY)
    }
}

#[derive(Debug, Serialize)]
pub struct InitDbResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Everything needed to persist one flyer, already validated.
#[derive(Debug, Clone)]
pub struct FlyerUpload {
    pub files: Vec<crate::files::FlyerFile>,
    pub store_name: String,
    pub flyer_date: Date,
    pub items: Vec<FlyerItem>,
}
