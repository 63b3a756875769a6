use axum::{extract::State, Json};
use serde::Serialize;

use crate::version::{GIT_VERSION, PKG_VERSION};
use crate::AppContext;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    git_version: &'static str,
    store_open: bool,
}

pub async fn health_check(State(context): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: PKG_VERSION,
        git_version: GIT_VERSION,
        store_open: context.store.is_open(),
    })
}
