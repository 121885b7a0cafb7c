//! Serve command - runs the gateway until Ctrl-C.

use std::net::SocketAddr;

use anyhow::Result;
use clap::Args;
use tollgate_config::LoadedConfig;
use tollgate_server::Server;
use tracing::{info, warn};

use super::Context;

/// Arguments for the serve command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context, loaded: LoadedConfig) -> Result<()> {
    let mut config = loaded.config;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    if ctx.verbose {
        println!("Backend:  {}", config.backend.endpoint);
        println!("Provider: {}", config.oauth.token_endpoint);
        println!("Frontend: {}", config.oauth.frontend_redirect);
    }

    let server = Server::new(config)?;
    println!("Tollgate listening on http://{}", server.bind_address());

    server.run_with_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested, draining connections"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
