use sqlx::PgPool;

use crate::db::Centre;
use crate::error::{Error, Result};
use crate::storage;

pub async fn create(pool: &PgPool, name: &str, city: &str) -> Result<Centre> {
    if name.trim().is_empty() {
        return Err(Error::validation("centre name must not be empty"));
    }
    let id = storage::generate_id("ctr");
    sqlx::query_as::<_, Centre>(
        "INSERT INTO centres (id, name, city) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&id)
    .bind(name.trim())
    .bind(city.trim())
    .fetch_one(pool)
    .await
    .map_err(|e| Error::on_unique(e, "centre name"))
}

pub async fn list(pool: &PgPool) -> Result<Vec<Centre>> {
    let rows = sqlx::query_as::<_, Centre>("SELECT * FROM centres ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
