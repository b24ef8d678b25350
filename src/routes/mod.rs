//! HTTP route handlers grouped by resource.
//!
//! Each submodule exposes typed Rocket handlers annotated with `#[openapi]`
//! so `rocket_okapi` can derive an OpenAPI document automatically. Handlers
//! only validate and translate; all data access goes through
//! [`crate::store::FlashcardRepository`].

pub mod cache;
pub mod flashcards;
pub mod health;
pub(crate) mod helpers;
pub mod stacks;
pub mod study_sessions;
