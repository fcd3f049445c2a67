/// GapDash dashboard server
///
/// Serves the gapminder table and its continent bar chart. Each browser tab
/// gets its own table state over a WebSocket.

use gapdash::config::Config;
use gapdash::context::DashboardContext;
use gapdash::server::run_server;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(config.log_filter()));

    // Fail fast on a missing or malformed dataset
    let ctx = match DashboardContext::load(&config) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            log::error!("Failed to load dataset: {}", e);
            std::process::exit(1);
        }
    };

    run_server(&config, ctx).await
}
