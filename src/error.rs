use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse, Responses};
use rocket_okapi::response::OpenApiResponderInner;
use serde::Serialize;
use std::io::Cursor;

use crate::store::StoreError;

#[derive(Debug)]
pub enum ApiError {
    StorageUnavailable(String),
    DatabaseError(String),
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, error_type, message) = match self {
            ApiError::StorageUnavailable(msg) => {
                log::error!("storage unavailable: {}", msg);
                (Status::ServiceUnavailable, "StorageUnavailable", msg)
            }
            ApiError::DatabaseError(msg) => {
                log::error!("database error: {}", msg);
                (Status::InternalServerError, "DatabaseError", msg)
            }
            ApiError::NotFound(msg) => {
                log::debug!("not found: {}", msg);
                (Status::NotFound, "NotFound", msg)
            }
            ApiError::BadRequest(msg) => {
                log::debug!("bad request: {}", msg);
                (Status::BadRequest, "BadRequest", msg)
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                (Status::InternalServerError, "InternalError", msg)
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        let json = serde_json::to_string(&error_response)
            .unwrap_or_else(|_| r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string());

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl OpenApiResponderInner for ApiError {
    fn responses(_generator: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = Responses::default();
        for (code, description) in [
            ("400", "The request body failed validation."),
            ("404", "The requested stack or flashcard does not exist."),
            ("500", "The database rejected the statement or returned a malformed row."),
            ("503", "The database could not be reached."),
        ] {
            responses.responses.insert(
                code.to_string(),
                RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    ..Default::default()
                }),
            );
        }
        Ok(responses)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::StorageUnavailable(msg) => ApiError::StorageUnavailable(msg),
            StoreError::Database(e) => ApiError::DatabaseError(e.to_string()),
            err @ StoreError::MalformedRow { .. } => ApiError::InternalError(err.to_string()),
            StoreError::NotFound(msg) => ApiError::NotFound(msg),
        }
    }
}
