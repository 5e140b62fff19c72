//! services/web/src/bin/web.rs

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware as axum_middleware, routing::get, Router, ServiceExt};
use sqlx::postgres::PgPoolOptions;
use tower::Layer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use web_lib::{
    adapters::{Argon2Credentials, PgStore},
    auth::AuthService,
    config::Config,
    error::WebError,
    posts::PostService,
    web::{
        auth as auth_routes, method_override, posts as post_routes, require_login,
        resolve_identity, AppState,
    },
};

#[tokio::main]
async fn main() -> Result<(), WebError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    // Explicit connect-before-serve: nothing lazily initializes a global
    // handle, and a pool acquire that times out surfaces as a 500 on the
    // request that hit it.
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStore::new(db_pool, config.session_ttl_days));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Build the Services and Shared AppState ---
    let auth = AuthService::new(store.clone(), store.clone(), Arc::new(Argon2Credentials));
    let posts = PostService::new(store.clone());
    let app_state = Arc::new(AppState {
        auth,
        posts,
        sessions: store,
        config: config.clone(),
    });

    // --- 4. Create the Web Router ---
    // /add sits behind the login guard; /{id} mutations carry the guard
    // inline because the same path serves anonymous reads.
    let protected_routes = Router::new()
        .route(
            "/add",
            get(post_routes::add_form).post(post_routes::add_submit),
        )
        .route_layer(axum_middleware::from_fn(require_login));

    let router = Router::new()
        .route("/", get(post_routes::index))
        .route(
            "/signup",
            get(auth_routes::signup_form).post(auth_routes::signup_submit),
        )
        .route(
            "/login",
            get(auth_routes::login_form).post(auth_routes::login_submit),
        )
        .route("/logout", get(auth_routes::logout))
        .route(
            "/{id}",
            get(post_routes::show)
                .put(post_routes::update)
                .delete(post_routes::delete),
        )
        .route("/{id}/edit", get(post_routes::edit_form))
        .merge(protected_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            resolve_identity,
        ))
        .with_state(app_state);

    // Method override has to run before route matching, so it wraps the
    // router itself rather than being a route layer.
    let app = axum_middleware::from_fn(method_override).layer(router);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(
        listener,
        ServiceExt::<axum::extract::Request>::into_make_service(app),
    )
    .await?;

    Ok(())
}
