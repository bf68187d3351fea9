use anyhow::Context;
use axum::async_trait;
use sqlx::{types::Json, PgPool, Postgres, Transaction};

use super::{
    dto::{FlyerItem, FlyerRecord},
    repo_types::{FlyerRow, NewFlyer},
};
use crate::db;

#[async_trait]
pub trait FlyerRepository: Send + Sync {
    /// Creates the backing tables if they do not exist yet.
    async fn ensure_schema(&self) -> anyhow::Result<()>;
    /// Inserts the flyer row and one row per item. Returns the new flyer id.
    async fn insert_flyer(&self, flyer: NewFlyer<'_>) -> anyhow::Result<i32>;
    /// Up to `limit` flyers, newest first, items aggregated.
    async fn list_recent(&self, limit: i64) -> anyhow::Result<Vec<FlyerRecord>>;
}

#[derive(Clone)]
pub struct PgFlyerRepository {
    db: PgPool,
}

impl PgFlyerRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FlyerRepository for PgFlyerRepository {
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        db::ensure_schema(&self.db).await
    }

    async fn insert_flyer(&self, flyer: NewFlyer<'_>) -> anyhow::Result<i32> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let flyer_id = insert_flyer_tx(&mut tx, &flyer).await?;
        for item in flyer.items {
            insert_item_tx(&mut tx, flyer_id, item).await?;
        }
        tx.commit().await.context("commit tx")?;
        Ok(flyer_id)
    }

    async fn list_recent(&self, limit: i64) -> anyhow::Result<Vec<FlyerRecord>> {
        list_recent(&self.db, limit).await
    }
}

/// Insert the flyer row within a transaction.
pub async fn insert_flyer_tx(
    tx: &mut Transaction<'_, Postgres>,
    flyer: &NewFlyer<'_>,
) -> anyhow::Result<i32> {
    let id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO flyers (store_name, flyer_date, image_urls, created_at)
        VALUES ($1, $2, $3, NOW())
        RETURNING id
        "#,
    )
    .bind(flyer.store_name)
    .bind(flyer.flyer_date)
    .bind(Json(flyer.image_urls))
    .fetch_one(&mut **tx)
    .await
    .context("insert flyer")?;

    Ok(id)
}

/// Insert one item row referencing `flyer_id` within a transaction.
pub async fn insert_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    flyer_id: i32,
    item: &FlyerItem,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO flyer_items (flyer_id, name, price, is_discounted)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(flyer_id)
    .bind(&item.name)
    .bind(item.price)
    .bind(item.is_discounted)
    .execute(&mut **tx)
    .await
    .context("insert flyer item")?;

    Ok(())
}

// ---- Queries ----

pub async fn list_recent(db: &PgPool, limit: i64) -> anyhow::Result<Vec<FlyerRecord>> {
    let rows = sqlx::query_as::<_, FlyerRow>(
        r#"
        SELECT
            f.id,
            f.store_name,
            f.flyer_date,
            f.image_urls,
            f.created_at,
            COALESCE(
                json_agg(
                    json_build_object(
                        'id', fi.id,
                        'name', fi.name,
                        'price', fi.price,
                        'isDiscounted', fi.is_discounted
                    ) ORDER BY fi.id
                ) FILTER (WHERE fi.id IS NOT NULL),
                '[]'
            ) AS items
          FROM flyers f
          LEFT JOIN flyer_items fi ON fi.flyer_id = f.id
         GROUP BY f.id
         ORDER BY f.created_at DESC, f.id DESC
         LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await
    .context("list flyers")?;

    Ok(rows.into_iter().map(FlyerRecord::from).collect())
}
