mod config;
mod event;
mod routes;
mod services;
mod state;

use crate::services::gate::AccessGate;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env();
    let gate = AccessGate::new(config.host_pass.clone(), config.user_pass.clone());
    let state = state::AppState::new(gate);

    let app = routes::app(state, &config.static_dir);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "buzzboard listening");
    axum::serve(listener, app).await.expect("server failed");
}
