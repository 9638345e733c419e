mod config;
mod render;
mod shell;
mod terminal;

use anyhow::Context;
use api::ApiClient;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Settings;
use shell::Shell;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::new().context("Failed to load configuration")?;
    let client = ApiClient::new(&settings.api.base_url, settings.request_timeout())
        .context("Failed to build HTTP client")?;

    let shell = Shell::new(client, settings);
    shell.bootstrap().await;

    // 退出：drop shell 会取消所有轮询和倒计时
    tokio::select! {
        result = shell.run() => result?,
        _ = shutdown_signal() => {}
    }
    drop(shell);
    info!("Bye");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}
