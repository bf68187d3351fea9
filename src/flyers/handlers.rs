use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Query, State},
    routing::{get, post},
    Json, Router,
};
use time::{macros::format_description, Date, OffsetDateTime};
use tracing::{instrument, warn};

use super::dto::{
    FlyerItem, FlyerUpload, FlyersResponse, HistoryQuery, InitDbResponse, SaveFlyerResponse,
    UNKNOWN_STORE,
};
use super::services;
use crate::{errors::ApiError, files::FlyerFile, state::AppState};

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/get-flyers", get(get_flyers))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/init-db", post(init_db))
        .route("/save-flyer", post(save_flyer))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn init_db(State(state): State<AppState>) -> Result<Json<InitDbResponse>, ApiError> {
    state
        .flyers
        .ensure_schema()
        .await
        .map_err(|e| ApiError::internal("Failed to create tables", e))?;
    Ok(Json(InitDbResponse {
        success: true,
        message: "Tables created",
    }))
}

/// POST /api/save-flyer (multipart)
/// Fields: files (repeated), storeName, flyerDate (YYYY-MM-DD), items (JSON array)
#[instrument(skip(state, mp))]
pub async fn save_flyer(
    State(state): State<AppState>,
    mp: Multipart,
) -> Result<Json<SaveFlyerResponse>, ApiError> {
    let upload = read_upload(mp, OffsetDateTime::now_utc().date()).await?;
    let saved = services::save_flyer(&state, upload)
        .await
        .map_err(|e| ApiError::internal("Failed to save flyer", e))?;
    Ok(Json(saved))
}

#[instrument(skip(state))]
pub async fn get_flyers(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<FlyersResponse>, ApiError> {
    let flyers = services::list_flyers(&state, q.clamped())
        .await
        .map_err(|e| ApiError::internal("Failed to fetch flyers", e))?;
    Ok(Json(FlyersResponse { flyers }))
}

// --- multipart parsing ---

async fn read_upload(mut mp: Multipart, today: Date) -> Result<FlyerUpload, ApiError> {
    let mut files = Vec::new();
    let mut store_name = None;
    let mut flyer_date = None;
    let mut items = Vec::new();

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("files") | Some("files[]") => files.push(read_file(field).await?),
            Some("storeName") => store_name = Some(read_text(field).await?),
            Some("flyerDate") => flyer_date = Some(read_text(field).await?),
            Some("items") => {
                let raw = read_text(field).await?;
                if !raw.trim().is_empty() {
                    items = parse_items(&raw)?;
                }
            }
            other => warn!(field = ?other, "unknown multipart field ignored"),
        }
    }

    Ok(FlyerUpload {
        files,
        store_name: store_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_STORE.to_string()),
        flyer_date: parse_flyer_date(flyer_date.as_deref(), today)?,
        items,
    })
}

pub(crate) async fn read_file(field: Field<'_>) -> Result<FlyerFile, ApiError> {
    let file_name = field.file_name().unwrap_or("flyer").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let body = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable file part: {e}")))?;
    FlyerFile::new(file_name, content_type, body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub(crate) async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable text part: {e}")))
}

fn parse_items(raw: &str) -> Result<Vec<FlyerItem>, ApiError> {
    let items: Vec<FlyerItem> = serde_json::from_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("invalid items: {e}")))?;
    if let Some(bad) = items.iter().find(|i| i.price.is_some_and(|p| p < 0)) {
        return Err(ApiError::BadRequest(format!("negative price for {}", bad.name)));
    }
    if items.iter().any(|i| i.name.trim().is_empty()) {
        return Err(ApiError::BadRequest("item name must not be empty".into()));
    }
    Ok(items)
}

fn parse_flyer_date(raw: Option<&str>, today: Date) -> Result<Date, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(today),
        Some(s) => Date::parse(s, format_description!("[year]-[month]-[day]"))
            .map_err(|_| ApiError::BadRequest(format!("invalid flyerDate: {s}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn flyer_date_defaults_to_today() {
        let today = date!(2024 - 06 - 10);
        assert_eq!(parse_flyer_date(None, today).unwrap(), today);
        assert_eq!(parse_flyer_date(Some("  "), today).unwrap(), today);
        assert_eq!(
            parse_flyer_date(Some("2024-01-31"), today).unwrap(),
            date!(2024 - 01 - 31)
        );
        assert!(matches!(
            parse_flyer_date(Some("31/01/2024"), today),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn items_are_validated() {
        let items = parse_items(r#"[{"name":"鶏肉","isDiscounted":true},{"name":"米","price":1980,"isDiscounted":false}]"#)
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].price, Some(1980));

        assert!(parse_items(r#"[{"name":"鶏肉","price":-5,"isDiscounted":true}]"#).is_err());
        assert!(parse_items(r#"[{"name":" ","isDiscounted":true}]"#).is_err());
        assert!(parse_items("{oops").is_err());
    }
}
