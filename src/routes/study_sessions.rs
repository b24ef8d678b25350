//! Study session endpoints.

use chrono::Utc;
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::error::ApiError;
use crate::models::{CreateStudySessionRequest, CreatedResponse, DataResponse, StudySessionInfo};
use crate::routes::helpers::{require_stack, validated};
use crate::store::FlashcardRepository;

/// List every recorded study session with the name of its stack.
#[openapi(tag = "Study Sessions")]
#[get("/study-sessions")]
pub async fn list_study_sessions(
    repo: &State<FlashcardRepository>,
) -> Result<Json<DataResponse<Vec<StudySessionInfo>>>, ApiError> {
    let sessions = repo.list_study_sessions().await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// Record a finished study session.
#[openapi(tag = "Study Sessions")]
#[post("/study-sessions", data = "<request>")]
pub async fn create_study_session(
    request: Json<CreateStudySessionRequest>,
    repo: &State<FlashcardRepository>,
) -> Result<Json<CreatedResponse>, ApiError> {
    validated(request.validate())?;
    require_stack(repo, request.stack_id).await?;

    let study_time = request.study_time.unwrap_or_else(Utc::now);
    let id = repo
        .create_study_session(request.stack_id, study_time, request.score)
        .await?;
    Ok(Json(CreatedResponse { id }))
}
