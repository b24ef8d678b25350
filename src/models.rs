use chrono::{DateTime, Utc};
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub type StackId = i32;
pub type FlashcardId = i32;
pub type StudySessionId = i32;

// ===== Cached Aggregates =====

/// A named collection of flashcards together with its recorded study sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub id: StackId,
    pub name: String,
    pub flashcards: Vec<Flashcard>,
    pub study_sessions: Vec<StudySession>,
}

impl Stack {
    /// Aggregate with no children yet.
    pub fn new(id: StackId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            flashcards: Vec::new(),
            study_sessions: Vec::new(),
        }
    }

    pub fn flashcard(&self, flashcard_id: FlashcardId) -> Option<&Flashcard> {
        self.flashcards.iter().find(|card| card.id == flashcard_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: FlashcardId,
    pub stack_id: StackId,
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: StudySessionId,
    pub stack_id: StackId,
    pub study_time: DateTime<Utc>,
    pub score: i32,
}

// ===== Response Views =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StackInfo {
    pub id: StackId,
    pub name: String,
}

impl From<&Stack> for StackInfo {
    fn from(stack: &Stack) -> Self {
        Self {
            id: stack.id,
            name: stack.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FlashcardInfo {
    pub id: FlashcardId,
    pub front: String,
    pub back: String,
}

impl From<&Flashcard> for FlashcardInfo {
    fn from(card: &Flashcard) -> Self {
        Self {
            id: card.id,
            front: card.front.clone(),
            back: card.back.clone(),
        }
    }
}

/// Stack projection handed to the study (play) screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlayStack {
    pub id: StackId,
    pub name: String,
    pub flashcards: Vec<FlashcardInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StudySessionInfo {
    pub id: StudySessionId,
    pub stack_id: StackId,
    pub stack_name: String,
    pub study_time: DateTime<Utc>,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CreatedResponse {
    pub id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ===== Request Payloads =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NewFlashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateStackRequest {
    pub name: String,
    #[serde(default)]
    pub flashcards: Vec<NewFlashcard>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateStackRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateFlashcardRequest {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateStudySessionRequest {
    pub stack_id: StackId,
    /// Defaults to the time the request is handled.
    #[serde(default)]
    pub study_time: Option<DateTime<Utc>>,
    pub score: i32,
}

fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} must not be empty"))
    } else {
        Ok(())
    }
}

impl NewFlashcard {
    pub fn validate(&self) -> Result<(), String> {
        require_text("front", &self.front)?;
        require_text("back", &self.back)
    }

    /// Copy with surrounding whitespace removed from both sides.
    pub fn trimmed(&self) -> Self {
        Self {
            front: self.front.trim().to_string(),
            back: self.back.trim().to_string(),
        }
    }
}

impl CreateStackRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)?;
        self.flashcards.iter().try_for_each(NewFlashcard::validate)
    }
}

impl UpdateStackRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)
    }
}

impl UpdateFlashcardRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_text("front", &self.front)?;
        require_text("back", &self.back)
    }
}

impl CreateStudySessionRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.score < 0 {
            return Err("score must not be negative".to_string());
        }
        Ok(())
    }
}
