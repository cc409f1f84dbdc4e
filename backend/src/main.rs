use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cleanvit::api::router;
use cleanvit::config::AppConfig;
use cleanvit::notify::{LogMailer, OtpMailer, WebhookMailer};
use cleanvit::services::StaleAssignmentReaper;
use cleanvit::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "cleanvit=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let mailer: Arc<dyn OtpMailer> = match &config.mail_webhook_url {
        Some(url) => Arc::new(WebhookMailer::new(url.clone())?),
        None => Arc::new(LogMailer),
    };

    let state = AppState::new(pool, &config, mailer);

    let reaper = StaleAssignmentReaper::new(state.lifecycle.clone(), config.reaper_interval_secs);
    tokio::spawn(reaper.start());

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
