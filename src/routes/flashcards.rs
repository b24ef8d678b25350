//! Flashcard endpoints, nested under their stack for reads and creation.

use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::error::ApiError;
use crate::models::{
    CreatedResponse, DataResponse, FlashcardId, FlashcardInfo, MessageResponse, NewFlashcard,
    StackId, UpdateFlashcardRequest,
};
use crate::routes::helpers::{require_stack, validated};
use crate::store::FlashcardRepository;

/// List the flashcards of a stack.
#[openapi(tag = "Flashcards")]
#[get("/stacks/<stack_id>/flashcards")]
pub async fn list_stack_flashcards(
    stack_id: StackId,
    repo: &State<FlashcardRepository>,
) -> Result<Json<DataResponse<Vec<FlashcardInfo>>>, ApiError> {
    let flashcards = repo.list_stack_flashcards(stack_id).await?;
    Ok(Json(DataResponse { data: flashcards }))
}

/// Get one flashcard of a stack.
#[openapi(tag = "Flashcards")]
#[get("/stacks/<stack_id>/flashcards/<flashcard_id>")]
pub async fn get_flashcard(
    stack_id: StackId,
    flashcard_id: FlashcardId,
    repo: &State<FlashcardRepository>,
) -> Result<Json<FlashcardInfo>, ApiError> {
    repo.get_flashcard(stack_id, flashcard_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Flashcard {flashcard_id} not found in stack {stack_id}"
            ))
        })
}

/// Add a flashcard to an existing stack.
#[openapi(tag = "Flashcards")]
#[post("/stacks/<stack_id>/flashcards", data = "<request>")]
pub async fn create_flashcard(
    stack_id: StackId,
    request: Json<NewFlashcard>,
    repo: &State<FlashcardRepository>,
) -> Result<Json<CreatedResponse>, ApiError> {
    validated(request.validate())?;
    require_stack(repo, stack_id).await?;

    let card = request.trimmed();
    let id = repo
        .create_flashcard(stack_id, &card.front, &card.back)
        .await?;
    Ok(Json(CreatedResponse { id }))
}

/// Replace the front and back of a flashcard.
#[openapi(tag = "Flashcards")]
#[put("/flashcards/<flashcard_id>", data = "<request>")]
pub async fn update_flashcard(
    flashcard_id: FlashcardId,
    request: Json<UpdateFlashcardRequest>,
    repo: &State<FlashcardRepository>,
) -> Result<Json<MessageResponse>, ApiError> {
    validated(request.validate())?;

    if !repo
        .update_flashcard(flashcard_id, request.front.trim(), request.back.trim())
        .await?
    {
        return Err(ApiError::NotFound(format!(
            "Flashcard {flashcard_id} not found"
        )));
    }

    Ok(Json(MessageResponse::new(format!(
        "Flashcard {flashcard_id} has been updated"
    ))))
}

/// Delete a flashcard.
#[openapi(tag = "Flashcards")]
#[delete("/flashcards/<flashcard_id>")]
pub async fn delete_flashcard(
    flashcard_id: FlashcardId,
    repo: &State<FlashcardRepository>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !repo.delete_flashcard(flashcard_id).await? {
        return Err(ApiError::NotFound(format!(
            "Flashcard {flashcard_id} not found"
        )));
    }

    Ok(Json(MessageResponse::new(format!(
        "Flashcard {flashcard_id} has been deleted"
    ))))
}
