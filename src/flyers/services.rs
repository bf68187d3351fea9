use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;
use uuid::Uuid;

use super::dto::{FlyerRecord, FlyerUpload, SaveFlyerResponse};
use super::repo_types::NewFlyer;
use crate::state::AppState;

/// Uploads every file, then writes the flyer row and its item rows.
///
/// Blobs already uploaded stay in place if the database write fails.
pub async fn save_flyer(st: &AppState, upload: FlyerUpload) -> anyhow::Result<SaveFlyerResponse> {
    let mut image_urls = Vec::with_capacity(upload.files.len());
    for file in upload.files {
        let key = object_key(&file.file_name, Uuid::new_v4());
        st.storage
            .put_object(&key, file.body, &file.content_type)
            .await
            .with_context(|| format!("put_object {}", key))?;
        image_urls.push(st.storage.public_url(&key));
    }

    let flyer_id = st
        .flyers
        .insert_flyer(NewFlyer {
            store_name: &upload.store_name,
            flyer_date: upload.flyer_date,
            image_urls: &image_urls,
            items: &upload.items,
        })
        .await?;

    info!(
        flyer_id,
        store = %upload.store_name,
        images = image_urls.len(),
        items = upload.items.len(),
        "flyer saved"
    );
    Ok(SaveFlyerResponse {
        success: true,
        flyer_id,
        image_urls,
    })
}

pub async fn list_flyers(st: &AppState, limit: i64) -> anyhow::Result<Vec<FlyerRecord>> {
    st.flyers.list_recent(limit).await
}

fn object_key(file_name: &str, id: Uuid) -> String {
    lazy_static! {
        static ref UNSAFE: Regex = Regex::new(r"[^A-Za-z0-9._-]+").unwrap();
    }
    let cleaned = UNSAFE.replace_all(file_name.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        format!("flyers/{}", id)
    } else {
        format!("flyers/{}-{}", id, cleaned)
    }
}
