use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use gatewayd::config::{Cli, ServerConfig};
use gatewayd::error::LifecycleError;
use gatewayd::http::GatewayService;
use gatewayd::lifecycle::{signals, Orchestrator, Shutdown};
use gatewayd::observability::logging::{self, RequestLogger};
use gatewayd::rpc::RpcService;

#[tokio::main]
async fn main() -> ExitCode {
    let (config, (rpc_addr, gateway_addr)) = match Cli::parse()
        .into_config()
        .and_then(|config| config.bind_addresses().map(|addrs| (config, addrs)))
    {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("gatewayd: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability);

    tracing::info!(
        rpc_address = %config.rpc.bind_address,
        gateway_address = %config.gateway.bind_address,
        grace_period_secs = config.lifecycle.grace_period_secs,
        "gatewayd v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    match run(&config, rpc_addr, gateway_addr, &shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    config: &ServerConfig,
    rpc_addr: SocketAddr,
    gateway_addr: SocketAddr,
    shutdown: &Shutdown,
) -> Result<(), LifecycleError> {
    let logger = Arc::new(RequestLogger::new(
        config.observability.suppressed_paths.iter().cloned(),
    ));

    let mut orchestrator = Orchestrator::new(shutdown, config.lifecycle.grace_period());
    orchestrator.register(RpcService::new(rpc_addr, logger.clone()))?;
    orchestrator.register(GatewayService::new(
        gateway_addr,
        config.upstream_uri(),
        &config.gateway,
        logger,
    ))?;

    orchestrator.start().await?;
    orchestrator.wait().await
}
