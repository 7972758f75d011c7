//! Serapeu backend server.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use serapeu_backend::auth::hash_password;
use serapeu_backend::config::Config;
use serapeu_backend::db::{self, Repository};
use serapeu_backend::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Serapeu backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if !config.require_email_verification {
        tracing::warn!("E-mail verification is disabled (SERAPEU_REQUIRE_EMAIL_VERIFICATION)");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Seed the bootstrap administrator
    match &config.admin_seed {
        Some(seed) => {
            let password_hash = hash_password(&seed.password, config.password_cost).await?;
            repo.seed_admin(&seed.email, &seed.name, &password_hash)
                .await?;
            tracing::info!("Administrator account ready: {}", seed.email);
        }
        None => tracing::warn!("No administrator configured (SERAPEU_ADMIN_EMAIL)"),
    }

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
