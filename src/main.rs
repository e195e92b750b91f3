use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smartbuilding::{app, config::AppConfig, db::LogOnError, state::AppState};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "smartbuilding=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = AppConfig::load();
  let state = AppState::from_config(config).expect("Failed to initialize application state");

  let purged = state
    .sessions
    .purge_expired()
    .log_warn_default("Failed to purge expired sessions");
  if purged > 0 {
    tracing::info!("Purged {} expired sessions", purged);
  }

  let bind_addr = state.config.bind_addr();
  let port = state.config.server.port;
  let app = app::build_router(state);

  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://localhost:{}", port);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
