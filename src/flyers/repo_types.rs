use sqlx::{types::Json, FromRow};
use time::{Date, OffsetDateTime};

use super::dto::{FlyerItem, FlyerRecord};

/// Row of the history query: one flyer with its items aggregated to JSON.
#[derive(Debug, FromRow)]
pub struct FlyerRow {
    pub id: i32,
    pub store_name: String,
    pub flyer_date: Date,
    pub image_urls: Json<Vec<String>>,
    pub created_at: OffsetDateTime,
    pub items: Json<Vec<FlyerItem>>,
}

impl From<FlyerRow> for FlyerRecord {
    fn from(r: FlyerRow) -> Self {
        Self {
            id: r.id,
            store_name: r.store_name,
            flyer_date: r.flyer_date,
            image_urls: r.image_urls.0,
            created_at: r.created_at,
            items: r.items.0,
        }
    }
}

/// Insert payload for one flyer and its items.
#[derive(Debug)]
pub struct NewFlyer<'a> {
    pub store_name: &'a str,
    pub flyer_date: Date,
    pub image_urls: &'a [String],
    pub items: &'a [FlyerItem],
}
