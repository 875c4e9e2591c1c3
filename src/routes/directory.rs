//! Admin directory: users, centres, topics.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::{AuthContext, Role};
use crate::db::{self, Centre, Topic, User};
use crate::error::{Error, Result};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub centre_id: Option<String>,
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(payload): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>)> {
    auth.require_admin()?;
    let role = Role::parse(&payload.role)
        .ok_or_else(|| Error::validation(format!("unknown role: {}", payload.role)))?;
    let user = db::users::create(
        state.pool.as_ref(),
        &payload.email,
        &payload.full_name,
        role,
        payload.centre_id.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<String>,
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<User>>> {
    auth.require_admin()?;
    let role = query
        .role
        .as_deref()
        .map(|s| Role::parse(s).ok_or_else(|| Error::validation(format!("unknown role: {s}"))))
        .transpose()?;
    let users = db::users::list(state.pool.as_ref(), role).await?;
    Ok(Json(users))
}

#[derive(Deserialize)]
pub struct CreateCentre {
    pub name: String,
    #[serde(default)]
    pub city: String,
}

pub async fn create_centre(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(payload): Json<CreateCentre>,
) -> Result<(StatusCode, Json<Centre>)> {
    auth.require_admin()?;
    let centre = db::centres::create(state.pool.as_ref(), &payload.name, &payload.city).await?;
    Ok((StatusCode::CREATED, Json(centre)))
}

pub async fn list_centres(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> Result<Json<Vec<Centre>>> {
    auth.require_admin()?;
    let centres = db::centres::list(state.pool.as_ref()).await?;
    Ok(Json(centres))
}

#[derive(Deserialize)]
pub struct CreateTopic {
    pub name: String,
}

pub async fn create_topic(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(payload): Json<CreateTopic>,
) -> Result<(StatusCode, Json<Topic>)> {
    auth.require_admin()?;
    let topic = db::topics::create(state.pool.as_ref(), &payload.name).await?;
    Ok((StatusCode::CREATED, Json(topic)))
}

pub async fn list_topics(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> Result<Json<Vec<Topic>>> {
    auth.require_admin()?;
    let topics = db::topics::list(state.pool.as_ref()).await?;
    Ok(Json(topics))
}
