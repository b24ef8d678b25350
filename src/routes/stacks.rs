//! Stack endpoints: listing, lookup, the play view, and stack writes.

use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::error::ApiError;
use crate::models::{
    CreateStackRequest, CreatedResponse, DataResponse, MessageResponse, NewFlashcard, PlayStack,
    StackId, StackInfo, UpdateStackRequest,
};
use crate::routes::helpers::validated;
use crate::store::FlashcardRepository;

/// List every stack in cache order.
#[openapi(tag = "Stacks")]
#[get("/stacks")]
pub async fn list_stacks(
    repo: &State<FlashcardRepository>,
) -> Result<Json<DataResponse<Vec<StackInfo>>>, ApiError> {
    let stacks = repo.list_stacks().await?;
    Ok(Json(DataResponse { data: stacks }))
}

/// Get a single stack by id.
#[openapi(tag = "Stacks")]
#[get("/stacks/<stack_id>")]
pub async fn get_stack(
    stack_id: StackId,
    repo: &State<FlashcardRepository>,
) -> Result<Json<StackInfo>, ApiError> {
    repo.get_stack_by_id(stack_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Stack {stack_id} not found")))
}

/// Stack with its flashcards, ready for a study run.
#[openapi(tag = "Stacks")]
#[get("/stacks/<stack_id>/play")]
pub async fn play_stack(
    stack_id: StackId,
    repo: &State<FlashcardRepository>,
) -> Result<Json<PlayStack>, ApiError> {
    let stack = repo.get_playable_stack(stack_id).await?;
    Ok(Json(stack))
}

/// Create a stack, optionally with an initial set of flashcards.
#[openapi(tag = "Stacks")]
#[post("/stacks", data = "<request>")]
pub async fn create_stack(
    request: Json<CreateStackRequest>,
    repo: &State<FlashcardRepository>,
) -> Result<Json<CreatedResponse>, ApiError> {
    validated(request.validate())?;

    let flashcards: Vec<NewFlashcard> =
        request.flashcards.iter().map(NewFlashcard::trimmed).collect();
    let id = repo.create_stack(request.name.trim(), &flashcards).await?;
    Ok(Json(CreatedResponse { id }))
}

/// Rename a stack.
#[openapi(tag = "Stacks")]
#[put("/stacks/<stack_id>", data = "<request>")]
pub async fn update_stack(
    stack_id: StackId,
    request: Json<UpdateStackRequest>,
    repo: &State<FlashcardRepository>,
) -> Result<Json<StackInfo>, ApiError> {
    validated(request.validate())?;

    if !repo.update_stack(stack_id, request.name.trim()).await? {
        return Err(ApiError::NotFound(format!("Stack {stack_id} not found")));
    }

    repo.get_stack_by_id(stack_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Stack {stack_id} not found")))
}

/// Delete a stack together with its flashcards and study sessions.
#[openapi(tag = "Stacks")]
#[delete("/stacks/<stack_id>")]
pub async fn delete_stack(
    stack_id: StackId,
    repo: &State<FlashcardRepository>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !repo.delete_stack(stack_id).await? {
        return Err(ApiError::NotFound(format!("Stack {stack_id} not found")));
    }

    Ok(Json(MessageResponse::new(format!(
        "Stack {stack_id} has been deleted"
    ))))
}
