//! Operator endpoints for inspecting and refreshing the stack cache.

use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::error::ApiError;
use crate::store::{CacheStats, FlashcardRepository};

/// Current cache statistics. Does not trigger a rebuild.
#[openapi(tag = "Admin")]
#[get("/admin/cache")]
pub async fn cache_stats(repo: &State<FlashcardRepository>) -> Json<CacheStats> {
    Json(repo.cache().stats())
}

/// Force a rebuild from the database, e.g. after out-of-band edits.
#[openapi(tag = "Admin")]
#[post("/admin/cache/rebuild")]
pub async fn rebuild_cache(
    repo: &State<FlashcardRepository>,
) -> Result<Json<CacheStats>, ApiError> {
    repo.cache().rebuild().await?;
    log::info!("stack cache rebuilt on request");
    Ok(Json(repo.cache().stats()))
}
