//! Quote CRUD handlers
//!
//! Each handler performs exactly one store operation on the blocking pool.

use crate::server::error::ApiError;
use crate::server::AppState;
use crate::storage::{NewQuote, QuoteRecord, QuoteStore, StorageResult};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Body returned by `DELETE /quotes/{id}`
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Runs one store operation without tying up an async worker
async fn with_store<T, F>(store: Arc<dyn QuoteStore>, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn QuoteStore) -> StorageResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {}", e)))?
        .map_err(ApiError::from)
}

pub async fn list_quotes(State(state): State<AppState>) -> Result<Json<Vec<QuoteRecord>>, ApiError> {
    let quotes = with_store(state.store, |store| store.list_quotes()).await?;
    Ok(Json(quotes))
}

pub async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<QuoteRecord>, ApiError> {
    let quote = with_store(state.store, move |store| store.get_quote(id)).await?;
    Ok(Json(quote))
}

pub async fn create_quote(
    State(state): State<AppState>,
    Json(quote): Json<NewQuote>,
) -> Result<Json<QuoteRecord>, ApiError> {
    let created = with_store(state.store, move |store| {
        let id = store.insert_quote(&quote)?;
        Ok(quote.with_id(id))
    })
    .await?;

    tracing::debug!("Created quote {}", created.id);
    Ok(Json(created))
}

pub async fn update_quote(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(quote): Json<NewQuote>,
) -> Result<Json<QuoteRecord>, ApiError> {
    let updated = with_store(state.store, move |store| store.update_quote(id, &quote)).await?;
    Ok(Json(updated))
}

pub async fn delete_quote(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    with_store(state.store, move |store| store.delete_quote(id)).await?;
    Ok(Json(DeleteResponse {
        message: "deleted".to_string(),
    }))
}

/// Health check: the store answers a count query
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match with_store(state.store, |store| store.count_quotes()).await {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "quotes": count })),
        ),
        Err(e) => {
            let message = match e {
                ApiError::NotFound(id) => format!("quote {} not found", id),
                ApiError::Internal(message) => message,
            };
            tracing::warn!("Health check failed: {}", message);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "error": message })),
            )
        }
    }
}
