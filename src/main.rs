use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;

use mediarouter::config::Config;
use mediarouter::loadbalancing::{LbStrategyFactory, LoadBalancer};
use mediarouter::media::HttpConnector;
use mediarouter::media_service::MediaService;
use mediarouter::state::AppState;

#[derive(Parser)]
#[command(name = "mediarouter", version, about = "Media node selection service")]
struct Cli {
    /// Listen port, overrides PORT.
    #[arg(long)]
    port: Option<u16>,
    /// Validate configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediarouter=debug,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(port) = cli.port {
        config.port = port;
    }

    let factory = match LbStrategyFactory::new(&config.strategies[..]) {
        Ok(factory) => factory.with_geo_settings(config.geo),
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    let load_balancer = LoadBalancer::new(&factory);

    let media_nodes = config.media_nodes.clone().unwrap_or_default();
    let media = match MediaService::create(
        load_balancer,
        Some(media_nodes.as_slice()),
        Arc::new(HttpConnector::new()),
    ) {
        Ok(media) => media.with_settings(config.acquisition),
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    print_banner(&config, &media);

    if cli.check {
        eprintln!("  \x1b[32mconfiguration ok\x1b[0m");
        return;
    }

    let state = AppState::new(media);
    let app = mediarouter::routes::router(state.clone());

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("failed to bind");
    eprintln!("  \x1b[32m→ listening on 0.0.0.0:{}\x1b[0m", config.port);
    eprintln!();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("shutting down");
    state.media.close().await;
}

fn print_banner(config: &Config, media: &MediaService) {
    let version = env!("CARGO_PKG_VERSION");
    let strategies = if config.strategies.is_empty() {
        "sticky, load".to_string()
    } else {
        format!("sticky, {}, load", config.strategies.join(", "))
    };

    eprintln!();
    eprintln!("  \x1b[1;36mmediarouter\x1b[0m \x1b[2mv{version}\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mport\x1b[0m         {}", config.port);
    eprintln!("  \x1b[2mmedia nodes\x1b[0m  {}", media.nodes().len());
    eprintln!("  \x1b[2mstrategies\x1b[0m   {strategies}");
    eprintln!(
        "  \x1b[2mtimeout\x1b[0m      {:?} per attempt",
        config.acquisition.router_timeout
    );

    if config.media_nodes.is_none() {
        eprintln!();
        eprintln!("  \x1b[33m! MEDIA_NODES not set, starting with an empty registry\x1b[0m");
    }

    eprintln!();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
