//! Assistant Gateway Entry Point

use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use assistant_config::{load_settings, RuntimeEnvironment, Settings};
use assistant_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("ASSISTANT_ENV").ok();
    let runtime_env = env
        .as_deref()
        .map(RuntimeEnvironment::from_name)
        .unwrap_or_default();
    let explicit_path = std::env::var("ASSISTANT_CONFIG").ok();

    let loaded = match explicit_path.as_deref() {
        Some(path) => Settings::from_yaml_file(path),
        None => load_settings(env.as_deref()),
    };
    let config = match loaded {
        Ok(settings) => {
            // Tracing not yet initialized, use eprintln for early logging
            eprintln!(
                "Loaded configuration (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) if runtime_env.is_production() => {
            eprintln!("Failed to load configuration in production: {}", e);
            return Err(e.into());
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings {
                environment: runtime_env,
                ..Settings::default()
            }
        }
    };

    init_tracing(&config);

    tracing::info!("Starting Assistant Gateway v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        max_history = config.sessions.max_history,
        allowed_users = config.valid_user_ids.len(),
        "Configuration loaded"
    );

    let mut state = AppState::from_settings(config.clone())?;
    match init_metrics() {
        Ok(handle) => {
            state = state.with_metrics(handle);
            tracing::info!("Initialized Prometheus metrics at /metrics");
        }
        Err(e) => tracing::warn!(error = %e, "Metrics recorder not installed"),
    }

    let sweep_shutdown = state.sessions().start_sweep_task(
        config.sessions.sweep_interval(),
        config.sessions.max_age(),
    );

    // Startup health is informational only
    let health = state.health.check().await;
    for backend in &health.backends {
        tracing::info!(
            backend = %backend.backend_name,
            status = ?backend.status,
            latency_ms = backend.latency.map(|l| l.as_millis() as u64),
            "Startup health check"
        );
    }
    tracing::info!(status = %health.status, "Backends checked");

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = sweep_shutdown.send(true);
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!(
            "assistant={level},assistant_server={level},assistant_agent={level},\
             assistant_clients={level},assistant_config={level},tower_http=debug"
        )
        .into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
