use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Import our modules
use leadline_controller::{
    api::{rate_limiter::RateLimiter, routes},
    config::Config,
    orchestrator::ConversationOrchestrator,
    services::{responder::AiResponder, sms_client::TwilioClient},
    storage::{self, repository::SeaOrmLeadRepository},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadline_controller=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let config = Config::load()?;

    // Initialize database
    let db_conn = storage::init_db(&config.database_url).await?;
    let repository = Arc::new(SeaOrmLeadRepository::new(db_conn));

    // Outbound clients
    let sms_client = TwilioClient::new(
        config.twilio_api_url.clone(),
        config.twilio_account_sid.clone(),
        config.twilio_auth_token.clone(),
    );
    let responder = AiResponder::new(
        config.ai_api_url.clone(),
        config.ai_api_key.clone(),
        config.ai_model.clone(),
    );

    let orchestrator = Arc::new(ConversationOrchestrator::new(
        repository.clone(),
        sms_client,
        responder,
        config.greeting_delay_cap_secs,
    ));

    let limiter = RateLimiter::new(config.effective_rate_limit());

    // Periodic cleanup of expired rate-limit windows
    let cleanup_limiter = limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup_expired().await;
        }
    });

    let port = config.server_port;
    let twilio_api_url = config.twilio_api_url.clone();
    let ai_api_url = config.ai_api_url.clone();

    // Create application state
    let state = routes::AppState {
        config: Arc::new(RwLock::new(config)),
        repo: repository,
        orchestrator,
    };

    let app = routes::create_router(state, limiter);

    // Start server
    let addr_str = format!("0.0.0.0:{}", port);
    let addr: SocketAddr = addr_str.parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Twilio API URL: {}", twilio_api_url);
    tracing::info!("AI endpoint: {}", ai_api_url);

    axum::serve(listener, app).await?;

    Ok(())
}
