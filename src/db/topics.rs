use sqlx::PgPool;

use crate::db::Topic;
use crate::error::{Error, Result};
use crate::storage;

pub async fn create(pool: &PgPool, name: &str) -> Result<Topic> {
    if name.trim().is_empty() {
        return Err(Error::validation("topic name must not be empty"));
    }
    let id = storage::generate_id("top");
    sqlx::query_as::<_, Topic>("INSERT INTO topics (id, name) VALUES ($1, $2) RETURNING *")
        .bind(&id)
        .bind(name.trim())
        .fetch_one(pool)
        .await
        .map_err(|e| Error::on_unique(e, "topic name"))
}

pub async fn list(pool: &PgPool) -> Result<Vec<Topic>> {
    let rows = sqlx::query_as::<_, Topic>("SELECT * FROM topics ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
