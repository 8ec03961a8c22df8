use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use bale_bot::Orchestrator;
use bale_client::BaleClient;
use bale_core::{config::Config, ports::Hooks};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), bale_core::Error> {
    bale_core::logging::init("bale")?;

    let cfg = Arc::new(Config::load()?);
    let api = Arc::new(BaleClient::new(&cfg)?);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!(error = %e, "failed to listen for shutdown signal");
                return;
            }
            info!("shutdown requested");
            cancel.cancel();
        });
    }

    let mut bot = Orchestrator::new(cfg, api, Hooks::default());
    let result = bot.run(cancel).await;
    if let Err(e) = &result {
        error!(error = %e, "bot stopped with error");
    }
    bot.shutdown().await;
    result
}

/// Resolves on Ctrl-C, or on SIGTERM where the platform has it.
async fn shutdown_signal() -> bale_core::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}
