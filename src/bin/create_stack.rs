use std::io::{self, Write};

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use flashcards_api::config::CacheConfig;
use flashcards_api::models::{CreateStackRequest, NewFlashcard};

#[derive(Parser, Debug)]
#[command(name = "create_stack", about = "Create a flashcard stack from the command line")]
struct Args {
    /// Name of the new stack.
    #[arg(long)]
    name: String,

    /// Flashcard in `FRONT::BACK` form. Repeat for more cards.
    #[arg(long = "card", value_name = "FRONT::BACK")]
    cards: Vec<String>,
}

fn parse_card(raw: &str) -> Option<NewFlashcard> {
    let (front, back) = raw.split_once("::")?;
    Some(NewFlashcard {
        front: front.trim().to_string(),
        back: back.trim().to_string(),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let mut flashcards = Vec::with_capacity(args.cards.len());
    for raw in &args.cards {
        match parse_card(raw) {
            Some(card) => flashcards.push(card),
            None => {
                writeln!(io::stderr(), "error: card '{raw}' must look like FRONT::BACK")?;
                std::process::exit(1);
            }
        }
    }

    let request = CreateStackRequest {
        name: args.name.trim().to_string(),
        flashcards,
    };
    if let Err(message) = request.validate() {
        writeln!(io::stderr(), "error: {message}")?;
        std::process::exit(1);
    }

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    flashcards_api::run_migrations(&pool).await?;

    let config = CacheConfig {
        warm_on_start: false,
        ..CacheConfig::default()
    };
    let repository = flashcards_api::build_repository(pool, config);
    let stack_id = repository
        .create_stack(&request.name, &request.flashcards)
        .await?;

    println!(
        "Created stack '{}' with id {} and {} flashcards",
        request.name,
        stack_id,
        request.flashcards.len()
    );
    Ok(())
}
