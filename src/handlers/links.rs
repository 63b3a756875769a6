use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::link::{format_timestamp, Link, LinkPatch};
use crate::services::NewLink;
use crate::AppContext;

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub favicon: String,
    pub is_favorite: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Link> for LinkResponse {
    fn from(link: Link) -> Self {
        LinkResponse {
            id: link.id,
            url: link.url,
            title: link.title,
            description: link.description,
            favicon: link.favicon,
            is_favorite: link.is_favorite,
            created_at: format_timestamp(&link.created_at),
            updated_at: format_timestamp(&link.updated_at),
        }
    }
}

fn to_responses(links: Vec<Link>) -> Vec<LinkResponse> {
    links.into_iter().map(Into::into).collect()
}

pub async fn list_links(State(context): State<AppContext>) -> AppResult<Json<Vec<LinkResponse>>> {
    let links = context.links.get_all().await?;
    Ok(Json(to_responses(links)))
}

pub async fn list_favorites(
    State(context): State<AppContext>,
) -> AppResult<Json<Vec<LinkResponse>>> {
    let links = context.links.get_favorites().await?;
    Ok(Json(to_responses(links)))
}

pub async fn create_link(
    State(context): State<AppContext>,
    Json(req): Json<NewLink>,
) -> AppResult<(StatusCode, Json<LinkResponse>)> {
    let link = context.links.add(req).await?;
    Ok((StatusCode::CREATED, Json(link.into())))
}

pub async fn get_link(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> AppResult<Json<LinkResponse>> {
    let link = context.links.get_by_id(id).await?;
    Ok(Json(link.into()))
}

/// Exact match on the stored (normalized) URL.
pub async fn lookup_link(
    State(context): State<AppContext>,
    Query(query): Query<LookupQuery>,
) -> AppResult<Json<LinkResponse>> {
    let link = context.links.get_by_url(&query.url).await?;
    Ok(Json(link.into()))
}

pub async fn update_link(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
    Json(patch): Json<LinkPatch>,
) -> AppResult<Json<LinkResponse>> {
    let link = context.links.update(id, patch).await?;
    Ok(Json(link.into()))
}

pub async fn toggle_favorite(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> AppResult<Json<LinkResponse>> {
    let link = context.links.toggle_favorite(id).await?;
    Ok(Json(link.into()))
}

pub async fn delete_link(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    context.links.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
