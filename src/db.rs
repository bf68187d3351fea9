use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")
}

const CREATE_FLYERS: &str = r#"
    CREATE TABLE IF NOT EXISTS flyers (
        id SERIAL PRIMARY KEY,
        store_name TEXT NOT NULL DEFAULT '不明な店舗',
        flyer_date DATE NOT NULL,
        image_urls JSONB NOT NULL DEFAULT '[]',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_FLYER_ITEMS: &str = r#"
    CREATE TABLE IF NOT EXISTS flyer_items (
        id SERIAL PRIMARY KEY,
        flyer_id INTEGER NOT NULL REFERENCES flyers(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        price INTEGER,
        is_discounted BOOLEAN NOT NULL DEFAULT false
    )
"#;

const CREATE_FLYER_ITEMS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS flyer_items_flyer_id_idx ON flyer_items (flyer_id)";

/// Idempotent schema bootstrap for the flyer tables.
pub async fn ensure_schema(db: &PgPool) -> anyhow::Result<()> {
    for (name, stmt) in [
        ("flyers", CREATE_FLYERS),
        ("flyer_items", CREATE_FLYER_ITEMS),
        ("flyer_items_flyer_id_idx", CREATE_FLYER_ITEMS_INDEX),
    ] {
        sqlx::query(stmt)
            .execute(db)
            .await
            .with_context(|| format!("create {name}"))?;
    }
    info!("flyer schema ready");
    Ok(())
}
