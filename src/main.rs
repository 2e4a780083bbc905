use vigil::{
    api::{start_api_server, ApiState},
    config::AppConfig,
    observability::{init_observability, log_config_info},
    startup::start_secret_manager,
    Result, APP_NAME, VERSION,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (optional - won't fail if missing)
    // This must happen before any config is read from environment
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let config = AppConfig::from_env()?;
    init_observability(&config.observability)?;

    info!(app_name = APP_NAME, version = VERSION, "Starting secret lifecycle service");
    log_config_info(&config);

    let manager = start_secret_manager(&config.secrets).await?;
    let state = ApiState::new(manager.clone(), config.debug);

    let served = start_api_server(&config.server, state).await;
    manager.shutdown();

    if let Err(e) = &served {
        error!(error = %e, "API server stopped with an error");
    }
    info!("Shutdown complete");
    served
}
