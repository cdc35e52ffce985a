use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sa_domain::config::{Config, ConfigSeverity};
use sa_providers::ProviderRegistry;
use sa_registry::ServiceRegistry;

use mandrake::{cors, init::InitService, AppState};

fn load_config(path: &str) -> Config {
    match std::fs::read_to_string(path) {
        Ok(raw) => toml::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, path, "failed to parse config, using defaults");
            Config::default()
        }),
        Err(_) => {
            tracing::info!(path, "no config file found, using defaults");
            Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,mandrake=debug")))
        .json()
        .init();

    tracing::info!("mandrake starting");

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".into());
    let config = load_config(&config_path);

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    let config = Arc::new(config);

    let providers = Arc::new(ProviderRegistry::from_config(&config.llm)?);
    let registry = Arc::new(ServiceRegistry::new(config.root.path.clone(), providers));

    let init_service = Arc::new(InitService::new());
    init_service.ensure(Arc::clone(&registry));

    let state = AppState {
        config: Arc::clone(&config),
        registry: Arc::clone(&registry),
    };

    let app = mandrake::api::router()
        .layer(cors::build_cors_layer(&config.server.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .expect("invalid server address");

    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown_registry = Arc::clone(&registry);
    let shutdown_init = Arc::clone(&init_service);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            InitService::wait_for_shutdown_signal().await;
            shutdown_init.shutdown(&shutdown_registry).await;
        })
        .await?;

    Ok(())
}
