//! Urban-heat dashboard API service.
//!
//! Serves heat-island diagnostics, planting recommendations and climate
//! plans over satellite layers, plus city and user administration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dashboard_api::config::{ProviderKind, Settings};
use dashboard_api::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "dashboard-api")]
#[command(about = "Urban heat dashboard API server")]
struct Args {
    /// Listen address
    #[arg(short, long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Directory holding layers.yaml
    #[arg(long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Document store location
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://dashboard.db")]
    database_url: String,

    /// Earth-observation backend
    #[arg(long, env = "EO_PROVIDER", value_enum, default_value = "earth-engine")]
    provider: ProviderKind,

    /// Catalog directory for the local provider
    #[arg(long, env = "LOCAL_RASTER_DIR", default_value = "data/rasters")]
    local_data_dir: PathBuf,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = genai::gemini::DEFAULT_MODEL)]
    gemini_model: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: String,

    /// IBGE API base URL
    #[arg(long, env = "IBGE_URL", default_value = gazetteer::DEFAULT_IBGE_URL)]
    ibge_url: String,

    /// ViaCEP API base URL
    #[arg(long, env = "VIACEP_URL", default_value = gazetteer::DEFAULT_VIACEP_URL)]
    viacep_url: String,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            config_dir: self.config_dir.clone(),
            database_url: self.database_url.clone(),
            provider: self.provider,
            local_data_dir: self.local_data_dir.clone(),
            gemini_model: self.gemini_model.clone(),
            gemini_api_key: self.gemini_api_key.clone(),
            ibge_url: self.ibge_url.clone(),
            viacep_url: self.viacep_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).json().finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;
    dashboard_api::metrics::describe();
    info!("Prometheus metrics exporter initialized");

    info!(provider = ?args.provider, "Starting dashboard API server");
    let state = Arc::new(AppState::new(&args.settings()).await?);
    let app = dashboard_api::router(state, prometheus_handle);

    let addr: SocketAddr = args.listen.parse().context("parsing listen address")?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
