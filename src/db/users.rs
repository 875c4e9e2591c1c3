use regex::Regex;
use sqlx::PgPool;
use std::sync::OnceLock;

use crate::auth::Role;
use crate::db::User;
use crate::error::{Error, Result};
use crate::storage;

// Sanity check only; the auth provider owns real address verification.
fn email_looks_valid(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
        .is_match(email)
}

pub async fn create(
    pool: &PgPool,
    email: &str,
    full_name: &str,
    role: Role,
    centre_id: Option<&str>,
) -> Result<User> {
    let email = email.trim().to_lowercase();
    if !email_looks_valid(&email) {
        return Err(Error::validation("email address is not plausible"));
    }
    if full_name.trim().is_empty() {
        return Err(Error::validation("full name must not be empty"));
    }

    let id = storage::generate_id("usr");
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, full_name, role, centre_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&email)
    .bind(full_name.trim())
    .bind(role.as_str())
    .bind(centre_id)
    .fetch_one(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => Error::AlreadyExists {
            what: "user email",
        },
        _ => Error::on_fk(e, "unknown centre reference"),
    })
}

pub async fn get(pool: &PgPool, id: &str) -> Result<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("user", id))
}

pub async fn list(pool: &PgPool, role: Option<Role>) -> Result<Vec<User>> {
    let rows = match role {
        Some(role) => {
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = $1 ORDER BY full_name")
                .bind(role.as_str())
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY full_name")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(rows)
}
