use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port = match std::env::var("REPOGALLERY_HTTP_PORT") {
        Ok(v) => v.trim().parse::<u16>()?,
        Err(_) => repogallery::server::DEFAULT_HTTP_PORT,
    };
    let settings_path = std::env::var("REPOGALLERY_SETTINGS")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| repogallery::settings::default_settings_path());
    info!(
        target: "repogallery",
        "repogallery viewer starting: RUST_LOG='{}', http_port={}, settings='{}'",
        rust_log, http_port, settings_path.display()
    );

    repogallery::server::run_with_port(http_port, settings_path).await
}
