//! Lightweight service health endpoint used for readiness checks and tests.

use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::store::FlashcardRepository;

/// Basic response payload describing API health.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    /// Static status string reporting application readiness.
    pub status: String,
    /// Whether the stack cache has been built at least once.
    pub cache_ready: bool,
}

/// Health check endpoint; never touches the database.
#[openapi(tag = "Health")]
#[get("/health")]
pub fn health_check(repo: &State<FlashcardRepository>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        cache_ready: repo.cache().is_initialized(),
    })
}
