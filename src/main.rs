use bot_bridge::{
    AppState, Args, Providers, build_router,
    providers::Fixtures,
    server::{serve, shutdown_signal, spawn_janitor},
};
use clap::Parser; // for cli
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// small fixed worker pool - localhost, low traffic
#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();

    if args.uses_default_token() {
        warn!("=================================================");
        warn!("  Using the default API token!");
        warn!("  Set --token or BRIDGE_TOKEN before exposing the bridge.");
        warn!("=================================================");
    }

    let providers = match &args.fixtures {
        Some(path) => match Fixtures::load(path) {
            Ok(fixtures) => fixtures.into_providers(),
            Err(e) => {
                error!(error = %e, "failed to load provider fixtures");
                std::process::exit(1);
            }
        },
        None => Providers::unavailable(),
    };
    let integrations = providers.integrations();

    // creating shared state
    let state = Arc::new(AppState::new(&args, providers));
    let janitor = spawn_janitor(state.clone(), args.sweep_interval());
    let app = build_router(state);

    let addr = args.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "failed to bind HTTP API server");
            std::process::exit(1);
        }
    };

    info!(addr = %addr, "bridge API listening");
    info!(
        max_per_second = args.max_per_second,
        max_per_minute = args.max_per_minute,
        link_cache_ttl = args.link_cache_ttl,
        vote_cache_ttl = args.vote_cache_ttl,
        "limits configured"
    );
    info!(
        discordsrv = integrations.discordsrv,
        votingplugin = integrations.votingplugin,
        placeholderapi = integrations.placeholderapi,
        "integrations"
    );

    if let Err(e) = serve(listener, app, shutdown_signal(), args.shutdown_grace()).await {
        error!(error = %e, "server error");
        std::process::exit(1);
    }

    janitor.abort();
    info!("bridge API stopped");
}
