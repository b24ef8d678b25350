#[macro_use]
extern crate rocket;

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;
pub mod store;

use crate::config::CacheConfig;
use crate::db::FlashcardsDb;
use crate::request_logger::RequestLogger;
use crate::store::{CacheStore, FlashcardRepository, PgStore};
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket, Route};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_db_pools::sqlx::{self, PgPool};
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::{Arc, Once};

static LOGGER: Once = Once::new();

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

/// Apply the bundled schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Wire a Postgres-backed repository: one [`PgStore`] serves as both the
/// cache's row source and the repository's statement sink.
pub fn build_repository(pool: PgPool, config: CacheConfig) -> FlashcardRepository {
    let store = Arc::new(PgStore::new(pool));
    let cache = Arc::new(CacheStore::new(store.clone(), config));
    FlashcardRepository::new(store, cache)
}

/// Every API route, with the OpenAPI document at `openapi.json`.
pub fn api_routes() -> Vec<Route> {
    openapi_get_routes![
        // Health routes
        routes::health::health_check,
        // Stack routes
        routes::stacks::list_stacks,
        routes::stacks::get_stack,
        routes::stacks::play_stack,
        routes::stacks::create_stack,
        routes::stacks::update_stack,
        routes::stacks::delete_stack,
        // Flashcard routes
        routes::flashcards::list_stack_flashcards,
        routes::flashcards::get_flashcard,
        routes::flashcards::create_flashcard,
        routes::flashcards::update_flashcard,
        routes::flashcards::delete_flashcard,
        // Study session routes
        routes::study_sessions::list_study_sessions,
        routes::study_sessions::create_study_session,
        // Admin routes
        routes::cache::cache_stats,
        routes::cache::rebuild_cache,
    ]
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Put, Method::Delete]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(FlashcardsDb::init())
        .attach(cors)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite(
            "Run Migrations",
            |rocket| async move {
                match FlashcardsDb::fetch(&rocket) {
                    Some(db) => match run_migrations(db).await {
                        Ok(_) => {
                            log::info!("database migrations successful");
                            Ok(rocket)
                        }
                        Err(e) => {
                            log::error!("database migrations failed: {}", e);
                            Err(rocket)
                        }
                    },
                    None => {
                        log::error!("database pool not available for migrations");
                        Err(rocket)
                    }
                }
            },
        ))
        // Build the cache and repository on top of the managed pool
        .attach(AdHoc::try_on_ignite(
            "Manage Flashcard Repository",
            |rocket| async move {
                match FlashcardsDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();
                        let config = CacheConfig::from_env();
                        log::info!(
                            "stack cache configured (warm on start: {}, slow rebuild threshold: {:?})",
                            config.warm_on_start,
                            config.slow_rebuild_threshold
                        );
                        let repository = build_repository(pool, config);
                        Ok(rocket.manage(repository))
                    }
                    None => Err(rocket),
                }
            },
        ))
        .attach(AdHoc::on_liftoff("Warm Stack Cache", |rocket| {
            Box::pin(async move {
                let Some(repository) = rocket.state::<FlashcardRepository>() else {
                    log::error!("failed to warm stack cache: repository not managed");
                    return;
                };

                if !repository.cache().config().warm_on_start {
                    return;
                }

                match repository.cache().ensure_ready().await {
                    Ok(()) => {
                        let stats = repository.cache().stats();
                        log::info!(
                            "stack cache warmed: {} stacks, {} flashcards, {} study sessions",
                            stats.stack_count,
                            stats.flashcard_count,
                            stats.study_session_count
                        );
                    }
                    Err(err) => {
                        log::warn!("stack cache warm-up failed, first read will retry: {}", err);
                    }
                }
            })
        }))
        .mount("/api/v1", api_routes())
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Flashcards API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client as BlockingClient;
    use rocket::{Build, Rocket, Route};
    use rocket_db_pools::sqlx::{self, PgPool};
    use std::sync::Arc;

    use crate::config::CacheConfig;
    use crate::store::{CacheStore, FlashcardRepository};

    pub use database::{TestDatabase, TestDatabaseError};
    pub use memory::MemoryStore;

    /// Repository whose cache and statements both run against a fresh [`MemoryStore`].
    pub fn memory_repository() -> (Arc<MemoryStore>, FlashcardRepository) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(CacheStore::new(store.clone(), CacheConfig::default()));
        let repository = FlashcardRepository::new(store.clone(), cache);
        (store, repository)
    }

    /// Convenience helpers for seeding flashcard tables behind the cache's back.
    pub struct TestFixtures<'a> {
        pool: &'a PgPool,
    }

    impl<'a> TestFixtures<'a> {
        /// Create a fixture helper bound to the provided pool.
        pub fn new(pool: &'a PgPool) -> Self {
            Self { pool }
        }

        /// Insert a stack row, returning the new stack id.
        pub async fn insert_stack(&self, name: &str) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar("INSERT INTO stacks (name) VALUES ($1) RETURNING id")
                .bind(name)
                .fetch_one(self.pool)
                .await
        }

        /// Insert a flashcard row for an existing stack.
        pub async fn insert_flashcard(
            &self,
            stack_id: i32,
            front: &str,
            back: &str,
        ) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                "INSERT INTO flashcards (stack_id, front, back) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(stack_id)
            .bind(front)
            .bind(back)
            .fetch_one(self.pool)
            .await
        }

        /// Insert a study session row stamped with the current time.
        pub async fn insert_study_session(
            &self,
            stack_id: i32,
            score: i32,
        ) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                "INSERT INTO study_sessions (stack_id, score) VALUES ($1, $2) RETURNING id",
            )
            .bind(stack_id)
            .bind(score)
            .fetch_one(self.pool)
            .await
        }
    }

    pub mod memory {
        use chrono::{DateTime, Utc};
        use parking_lot::Mutex;
        use rocket_db_pools::sqlx;
        use std::collections::BTreeMap;
        use std::sync::atomic::{AtomicUsize, Ordering};

        use crate::models::{Flashcard, FlashcardId, StackId, StudySession, StudySessionId};
        use crate::store::{JoinRow, RowSource, StoreError, StoreResult, WriteStore};

        #[derive(Default)]
        struct MemoryState {
            stacks: BTreeMap<StackId, String>,
            flashcards: BTreeMap<FlashcardId, Flashcard>,
            study_sessions: BTreeMap<StudySessionId, StudySession>,
            next_stack_id: i32,
            next_flashcard_id: i32,
            next_study_session_id: i32,
            fail_next_fetch: bool,
            flashcard_inserts_allowed: Option<usize>,
        }

        fn next_id(counter: &mut i32) -> i32 {
            *counter += 1;
            *counter
        }

        fn foreign_key_violation(table: &str, stack_id: StackId) -> StoreError {
            StoreError::Database(sqlx::Error::Protocol(format!(
                "insert on table \"{table}\" violates foreign key: stack {stack_id} does not exist"
            )))
        }

        impl MemoryState {
            /// Rows shaped exactly like the left join, ordered by stack, flashcard, session id.
            fn join_rows(&self) -> Vec<JoinRow> {
                let mut rows = Vec::new();

                for (&stack_id, name) in &self.stacks {
                    let cards: Vec<&Flashcard> = self
                        .flashcards
                        .values()
                        .filter(|card| card.stack_id == stack_id)
                        .collect();
                    let sessions: Vec<&StudySession> = self
                        .study_sessions
                        .values()
                        .filter(|session| session.stack_id == stack_id)
                        .collect();

                    let card_slots: Vec<Option<&Flashcard>> = if cards.is_empty() {
                        vec![None]
                    } else {
                        cards.into_iter().map(Some).collect()
                    };
                    let session_slots: Vec<Option<&StudySession>> = if sessions.is_empty() {
                        vec![None]
                    } else {
                        sessions.into_iter().map(Some).collect()
                    };

                    for card in &card_slots {
                        for session in &session_slots {
                            let mut row = JoinRow::stack_only(stack_id, name.clone());
                            if let Some(card) = card {
                                row = row.with_flashcard(
                                    card.id,
                                    card.front.clone(),
                                    card.back.clone(),
                                );
                            }
                            if let Some(session) = session {
                                row = row.with_study_session(
                                    session.id,
                                    session.study_time,
                                    session.score,
                                );
                            }
                            rows.push(row);
                        }
                    }
                }

                rows
            }
        }

        /// In-memory stand-in for the relational store.
        ///
        /// Emits the same fanned-out rows the SQL join would, cascades stack
        /// deletes, and can inject failures.
        #[derive(Default)]
        pub struct MemoryStore {
            state: Mutex<MemoryState>,
            fetches: AtomicUsize,
        }

        impl MemoryStore {
            pub fn new() -> Self {
                Self::default()
            }

            /// Insert a stack and its flashcards directly, without touching any cache.
            pub fn seed_stack(&self, name: &str, flashcards: &[(&str, &str)]) -> StackId {
                let mut state = self.state.lock();
                let stack_id = next_id(&mut state.next_stack_id);
                state.stacks.insert(stack_id, name.to_string());
                for (front, back) in flashcards {
                    let id = next_id(&mut state.next_flashcard_id);
                    state.flashcards.insert(
                        id,
                        Flashcard {
                            id,
                            stack_id,
                            front: front.to_string(),
                            back: back.to_string(),
                        },
                    );
                }
                stack_id
            }

            pub fn seed_study_session(
                &self,
                stack_id: StackId,
                study_time: DateTime<Utc>,
                score: i32,
            ) -> StudySessionId {
                let mut state = self.state.lock();
                let id = next_id(&mut state.next_study_session_id);
                state.study_sessions.insert(
                    id,
                    StudySession {
                        id,
                        stack_id,
                        study_time,
                        score,
                    },
                );
                id
            }

            /// Number of join queries served so far.
            pub fn fetch_count(&self) -> usize {
                self.fetches.load(Ordering::SeqCst)
            }

            /// Make the next join query fail as if the database were unreachable.
            pub fn fail_next_fetch(&self) {
                self.state.lock().fail_next_fetch = true;
            }

            /// Let `allowed` more flashcard inserts succeed, then reject the rest.
            pub fn fail_flashcard_inserts_after(&self, allowed: usize) {
                self.state.lock().flashcard_inserts_allowed = Some(allowed);
            }
        }

        #[rocket::async_trait]
        impl RowSource for MemoryStore {
            async fn fetch_rows(&self) -> StoreResult<Vec<JoinRow>> {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                let mut state = self.state.lock();
                if std::mem::take(&mut state.fail_next_fetch) {
                    return Err(StoreError::StorageUnavailable(
                        "connection refused".to_string(),
                    ));
                }
                Ok(state.join_rows())
            }
        }

        #[rocket::async_trait]
        impl WriteStore for MemoryStore {
            async fn insert_stack(&self, name: &str) -> StoreResult<StackId> {
                let mut state = self.state.lock();
                let id = next_id(&mut state.next_stack_id);
                state.stacks.insert(id, name.to_string());
                Ok(id)
            }

            async fn update_stack(&self, stack_id: StackId, name: &str) -> StoreResult<bool> {
                let mut state = self.state.lock();
                Ok(match state.stacks.get_mut(&stack_id) {
                    Some(existing) => {
                        *existing = name.to_string();
                        true
                    }
                    None => false,
                })
            }

            async fn delete_stack(&self, stack_id: StackId) -> StoreResult<bool> {
                let mut state = self.state.lock();
                if state.stacks.remove(&stack_id).is_none() {
                    return Ok(false);
                }
                state.flashcards.retain(|_, card| card.stack_id != stack_id);
                state
                    .study_sessions
                    .retain(|_, session| session.stack_id != stack_id);
                Ok(true)
            }

            async fn insert_flashcard(
                &self,
                stack_id: StackId,
                front: &str,
                back: &str,
            ) -> StoreResult<FlashcardId> {
                let mut state = self.state.lock();
                if let Some(allowed) = state.flashcard_inserts_allowed.as_mut() {
                    if *allowed == 0 {
                        return Err(StoreError::Database(sqlx::Error::Protocol(
                            "flashcard insert rejected".to_string(),
                        )));
                    }
                    *allowed -= 1;
                }
                if !state.stacks.contains_key(&stack_id) {
                    return Err(foreign_key_violation("flashcards", stack_id));
                }

                let id = next_id(&mut state.next_flashcard_id);
                state.flashcards.insert(
                    id,
                    Flashcard {
                        id,
                        stack_id,
                        front: front.to_string(),
                        back: back.to_string(),
                    },
                );
                Ok(id)
            }

            async fn update_flashcard(
                &self,
                flashcard_id: FlashcardId,
                front: &str,
                back: &str,
            ) -> StoreResult<bool> {
                let mut state = self.state.lock();
                Ok(match state.flashcards.get_mut(&flashcard_id) {
                    Some(card) => {
                        card.front = front.to_string();
                        card.back = back.to_string();
                        true
                    }
                    None => false,
                })
            }

            async fn delete_flashcard(&self, flashcard_id: FlashcardId) -> StoreResult<bool> {
                let mut state = self.state.lock();
                Ok(state.flashcards.remove(&flashcard_id).is_some())
            }

            async fn insert_study_session(
                &self,
                stack_id: StackId,
                study_time: DateTime<Utc>,
                score: i32,
            ) -> StoreResult<StudySessionId> {
                let mut state = self.state.lock();
                if !state.stacks.contains_key(&stack_id) {
                    return Err(foreign_key_violation("study_sessions", stack_id));
                }

                let id = next_id(&mut state.next_study_session_id);
                state.study_sessions.insert(
                    id,
                    StudySession {
                        id,
                        stack_id,
                        study_time,
                        score,
                    },
                );
                Ok(id)
            }
        }
    }

    pub mod database {
        use log::LevelFilter;
        use rocket_db_pools::sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use rocket_db_pools::sqlx::{self, ConnectOptions, PgPool};
        use testcontainers::ImageExt;
        use testcontainers_modules::postgres::Postgres;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use tokio::runtime::Handle;
        use uuid::Uuid;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("TEST_DATABASE_URL not set and TEST_USE_CONTAINERS disabled")]
            MissingUrl,
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database factory for integration tests.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            admin_options: PgConnectOptions,
            database_name: String,
            container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            /// Provision a fresh database from `TEST_DATABASE_URL`, or from a
            /// disposable Postgres container when `TEST_USE_CONTAINERS` is set.
            pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
                if let Ok(url) = std::env::var("TEST_DATABASE_URL") {
                    let base_options: PgConnectOptions = url.parse()?;
                    return Self::provision(base_options, None).await;
                }

                let use_containers = std::env::var("TEST_USE_CONTAINERS")
                    .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false);
                if !use_containers {
                    return Err(TestDatabaseError::MissingUrl);
                }

                Self::new().await
            }

            /// Provision a fresh database by launching a disposable Postgres container.
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let container = Postgres::default().with_tag("16-alpine").start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
                let base_options: PgConnectOptions = admin_url.parse()?;

                Self::provision(base_options, Some(container)).await
            }

            async fn provision(
                base_options: PgConnectOptions,
                container: Option<ContainerAsync<Postgres>>,
            ) -> Result<Self, TestDatabaseError> {
                let base_options = base_options.log_statements(LevelFilter::Off);

                let base_name = base_options
                    .get_database()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "postgres".to_string());

                let admin_options = base_options.clone().database("postgres");
                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(admin_options.clone())
                    .await?;

                let new_db_name = format!("{}_{}", base_name, Uuid::new_v4().simple());
                let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", new_db_name);
                sqlx::query(&create_sql).execute(&admin_pool).await?;
                admin_pool.close().await;

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(base_options.clone().database(&new_db_name))
                    .await?;

                crate::run_migrations(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    admin_options,
                    database_name: new_db_name,
                    container,
                })
            }

            /// Cloneable connection pool for use in tests and Rocket state.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            /// Convenience method returning a clone of the pooled connection handle.
            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and drop the ephemeral database.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }

                drop_database_with_fallback(self.admin_options.clone(), &self.database_name)
                    .await?;

                if let Some(container) = self.container.take() {
                    drop(container);
                }

                Ok(())
            }
        }

        async fn drop_database_with_fallback(
            admin_options: PgConnectOptions,
            database_name: &str,
        ) -> Result<(), sqlx::Error> {
            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options)
                .await?;

            let drop_force = format!("DROP DATABASE \"{}\" WITH (FORCE)", database_name);
            match sqlx::query(&drop_force).execute(&admin_pool).await {
                Ok(_) => Ok(()),
                Err(err) if force_drop_unsupported(&err) => {
                    let drop_sql = format!("DROP DATABASE \"{}\"", database_name);
                    sqlx::query(&drop_sql).execute(&admin_pool).await?;
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }

        fn force_drop_unsupported(err: &sqlx::Error) -> bool {
            matches!(
                err,
                sqlx::Error::Database(db_err)
                    if db_err
                        .code()
                        .map(|code| code == "42601" || code == "0A000")
                        .unwrap_or(false)
            )
        }

        impl Drop for TestDatabase {
            fn drop(&mut self) {
                if let Some(pool) = self.pool.take() {
                    let admin_options = self.admin_options.clone();
                    let db_name = self.database_name.clone();
                    if let Ok(handle) = Handle::try_current() {
                        handle.spawn(async move {
                            pool.close().await;
                            let _ = drop_database_with_fallback(admin_options, &db_name).await;
                        });
                    } else {
                        std::thread::spawn(move || {
                            if let Ok(rt) = tokio::runtime::Runtime::new() {
                                rt.block_on(async move {
                                    pool.close().await;
                                    let _ =
                                        drop_database_with_fallback(admin_options, &db_name).await;
                                });
                            }
                        });
                    }
                }

                if let Some(container) = self.container.take() {
                    drop(container);
                }
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        repository: Option<FlashcardRepository>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                repository: None,
            }
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        /// Manage a repository for routes that read or write stacks.
        pub fn manage_repository(mut self, repository: FlashcardRepository) -> Self {
            self.repository = Some(repository);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(repository) = self.repository {
                rocket = rocket.manage(repository);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> BlockingClient {
            BlockingClient::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
