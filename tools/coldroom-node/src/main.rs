use std::sync::Arc;

use clap::Parser;
use coldroom_node::config::Cli;
use coldroom_node::payment::SimulatedGateway;
use coldroom_node::routes::router;
use coldroom_node::state::{run_settlement, AppState};
use coldroom_session_delegate::SessionDelegate;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let session = SessionDelegate::restore(cli.session_store());
    let gateway = Arc::new(SimulatedGateway::new(cli.payment_delay()));
    let state = AppState::spawn(session, gateway, !cli.no_seed);

    tokio::spawn(run_settlement(state.market.clone(), cli.settle_interval()));

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("coldroom node listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
