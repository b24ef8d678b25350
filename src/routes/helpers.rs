//! Shared helper functions for Rocket route handlers.

use crate::error::ApiError;
use crate::models::{StackId, StackInfo};
use crate::store::FlashcardRepository;

/// Resolve a stack id against the cache.
///
/// Returns [`ApiError::NotFound`] when the stack does not exist.
pub async fn require_stack(
    repo: &FlashcardRepository,
    stack_id: StackId,
) -> Result<StackInfo, ApiError> {
    repo.get_stack_by_id(stack_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Stack {stack_id} not found")))
}

/// Turn a payload validation failure into a 400.
pub fn validated(result: Result<(), String>) -> Result<(), ApiError> {
    result.map_err(ApiError::BadRequest)
}
