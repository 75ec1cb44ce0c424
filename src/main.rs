mod api;
mod tui;
mod websocket;

use axum::{routing::get, Router};
use space_surfer::{sources, Config, GameEngine};
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<GameEngine>,
}

const TUI_LOG_FILE: &str = "space-surfer.log";

fn init_tracing(tui_mode: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "space_surfer=debug,tower_http=debug".into());

    if tui_mode {
        // The terminal belongs to the console, so logs go to a file.
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(TUI_LOG_FILE)?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let tui_mode = std::env::args().any(|arg| arg == "--tui");
    init_tracing(tui_mode)?;

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Starting Space Surfer server on {}:{}", config.host, config.port);

    // Create the engine and wire the feed into it
    let transport = sources::from_config(&config);
    info!("Using {} price transport", transport.name());
    let (engine, feed_rx) = GameEngine::new(config.clone(), transport);

    tokio::spawn(engine.clone().run(feed_rx));
    let _frame_loop = engine.spawn_frame_loop();
    engine.start_feed();

    // Create application state
    let state = AppState {
        config: config.clone(),
        engine: engine.clone(),
    };

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = Router::new()
        .merge(api::router())
        .route("/ws", get(websocket::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Space Surfer server listening on {}", addr);

    if tui_mode {
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Server error: {}", e);
            }
        });
        tui::run_tui(Arc::new(state)).await?;
    } else {
        axum::serve(listener, app).await?;
    }

    engine.shutdown();
    Ok(())
}
