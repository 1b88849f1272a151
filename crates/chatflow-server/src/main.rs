#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod api;
mod config;

use axum::http::{Method, header};
use chatflow_ai::LlmProvider;
use config::ServerConfig;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    // Initialize tracing logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chatflow_server=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting ChatFlow relay server");

    let config = ServerConfig::load().expect("Failed to load server config");
    let provider = LlmProvider::parse(&config.llm_provider).expect("Unknown LLM provider");
    let api_key = std::env::var("GEMINI_API_KEY").ok();
    let llm = chatflow_ai::create_client(provider, Some(&config.llm_model), api_key.as_deref())
        .expect("Failed to build LLM client");

    tracing::info!(
        "Relaying to {} ({})",
        llm.provider(),
        llm.model()
    );

    // The browser front-end runs on another origin in development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let state = api::state::AppState::new(llm);
    let app = api::router(state).layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|err| panic!("Failed to bind to {}: {}", addr, err));

    tracing::info!("ChatFlow relay running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
