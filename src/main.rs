use axum::http::{HeaderValue, Method};
use edis_server::config::Config;
use edis_server::db::{create_pool, run_migrations};
use edis_server::http::{create_router, AppState};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    match dotenvy::dotenv() {
        Ok(path) => eprintln!("✅ .env loaded from: {:?}", path),
        Err(e) => eprintln!("⚠️  .env not found: {}", e),
    }

    // Logging setup
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,edis_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 e-Distribuzione load-curve server starting...");

    let config = Config::from_env()?;
    tracing::info!("✅ Config loaded");
    tracing::info!("   HTTP Addr: {}", config.http_addr);
    tracing::info!("   WebDriver URL: {}", config.webdriver_url);
    tracing::info!("   Headless: {}", config.headless);
    tracing::info!("   Start URL: {}", config.start_url);
    tracing::info!("   Storage State: {}", config.storage_state_path);

    tracing::info!("📊 Connecting to database: {}", config.database_url);
    let db_pool = create_pool(&config.database_url)
        .await
        .expect("❌ Database connection failed!");
    tracing::info!("✅ Database connected");

    if let Err(e) = run_migrations(&db_pool).await {
        tracing::error!("❌ Migration error: {}", e);
        panic!("Migration failed!");
    }
    tracing::info!("✅ Migrations applied");

    let http_addr = config.http_addr.clone();
    let cors = build_cors(&config.allow_origins);
    let state = AppState::new(config, db_pool);

    let app = create_router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("🌐 Server listening: http://{}", http_addr);
    tracing::info!("📋 Endpoints:");
    tracing::info!("   GET  /healthz");
    tracing::info!("   GET  /diag");
    tracing::info!("   GET  /data");
    tracing::info!("   POST /refresh");

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_cors(allow_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(86400));

    if allow_origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allow_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
