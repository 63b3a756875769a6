use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::db::StorageError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid URL")]
    InvalidUrl,

    #[error("This link already exists")]
    DuplicateLink,

    #[error("Link not found")]
    LinkNotFound,

    #[error("Failed to add link")]
    LinkAddFailed(#[source] StorageError),

    #[error("Failed to update link")]
    LinkUpdateFailed(#[source] StorageError),

    #[error("Failed to delete link")]
    LinkDeleteFailed(#[source] StorageError),

    #[error("Failed to connect to the database")]
    StorageConnectionFailed(#[source] StorageError),

    #[error("Failed to load the link list")]
    ListLoadFailed(#[source] StorageError),

    #[error("Failed to load favorites")]
    FavoritesLoadFailed(#[source] StorageError),

    #[error("Please enter a URL")]
    UrlRequired,

    #[error("Select a link to delete")]
    NoLinkSelected,

    #[error("Storage error: {0}")]
    Storage(#[source] StorageError),
}

/// Discriminant of [`AppError`], carried by `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    DuplicateLink,
    LinkNotFound,
    LinkAddFailed,
    LinkUpdateFailed,
    LinkDeleteFailed,
    StorageConnectionFailed,
    ListLoadFailed,
    FavoritesLoadFailed,
    UrlRequired,
    NoLinkSelected,
    Storage,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidUrl => ErrorKind::InvalidUrl,
            AppError::DuplicateLink => ErrorKind::DuplicateLink,
            AppError::LinkNotFound => ErrorKind::LinkNotFound,
            AppError::LinkAddFailed(_) => ErrorKind::LinkAddFailed,
            AppError::LinkUpdateFailed(_) => ErrorKind::LinkUpdateFailed,
            AppError::LinkDeleteFailed(_) => ErrorKind::LinkDeleteFailed,
            AppError::StorageConnectionFailed(_) => ErrorKind::StorageConnectionFailed,
            AppError::ListLoadFailed(_) => ErrorKind::ListLoadFailed,
            AppError::FavoritesLoadFailed(_) => ErrorKind::FavoritesLoadFailed,
            AppError::UrlRequired => ErrorKind::UrlRequired,
            AppError::NoLinkSelected => ErrorKind::NoLinkSelected,
            AppError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Maps a storage failure, keeping connection failures distinct from the
    /// operation-specific error.
    pub fn from_storage(err: StorageError, wrap: fn(StorageError) -> AppError) -> AppError {
        match err {
            StorageError::Connection(_) => AppError::StorageConnectionFailed(err),
            other => wrap(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidUrl
            | AppError::UrlRequired
            | AppError::NoLinkSelected => StatusCode::BAD_REQUEST,
            AppError::DuplicateLink => StatusCode::CONFLICT,
            AppError::LinkNotFound => StatusCode::NOT_FOUND,
            AppError::StorageConnectionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::LinkAddFailed(_)
            | AppError::LinkUpdateFailed(_)
            | AppError::LinkDeleteFailed(_)
            | AppError::ListLoadFailed(_)
            | AppError::FavoritesLoadFailed(_)
            | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "Request failed");
        }

        (
            status,
            Json(json!({ "error": self.to_string(), "kind": self.kind() })),
        )
            .into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
