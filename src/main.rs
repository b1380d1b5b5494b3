use clap::Parser;
use mesh_weather_alerts::utils::error::ErrorSeverity;
use mesh_weather_alerts::utils::logger;
use mesh_weather_alerts::{
    AlertFetcher, BroadcastLoop, CliConfig, MeshOpener, Result, Settings, SystemPorts,
    TokioSleeper, TransportResolver,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting mesh-weather-alerts");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ Weather alerts system failed: {} (Kind: {:?}, Severity: {:?})",
            e,
            e.kind(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: CliConfig) -> Result<()> {
    let settings = Settings::load(&cli)?;
    tracing::debug!("Resolved settings: {:?}", settings);

    let fetcher = AlertFetcher::new(settings.feed.clone())?;
    let resolver = TransportResolver::new(
        SystemPorts,
        MeshOpener,
        TokioSleeper,
        settings.retry,
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let transport = tokio::select! {
        _ = shutdown.cancelled() => {
            tracing::info!("Interrupted before the radio was opened");
            return Ok(());
        }
        transport = resolver.resolve(&settings.transport) => transport?,
    };

    let broadcast = BroadcastLoop::new(
        fetcher,
        transport,
        settings.location.clone(),
        settings.poll_interval,
    );
    broadcast.run(shutdown).await?;

    Ok(())
}

async fn watch_signals(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            tracing::warn!("Unable to listen for Ctrl-C: {}", e);
                            terminate.recv().await;
                        }
                    }
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Unable to listen for SIGTERM: {}", e);
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;

    tracing::info!("Received shutdown signal");
    shutdown.cancel();
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
