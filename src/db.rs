use rocket_db_pools::{sqlx, Database};

#[derive(Database)]
#[database("flashcards_db")]
pub struct FlashcardsDb(sqlx::PgPool);
