pub mod config;
pub mod downloader;
pub mod logging;
pub mod server;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use config::Config;
use downloader::{ToolManager, ToolType};
use server::AppState;

/// Build the download pipeline from `config` and serve it until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = prepare(&config).await?;

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!(
        address = %config.bind,
        output_dir = %state.orchestrator.output_dir().display(),
        sequential_fetch = config.sequential_fetch,
        "youtube downloader listening"
    );

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

/// Detect tools and wire the orchestrator. Tool probing spawns blocking
/// processes, so it runs off the async workers.
pub async fn prepare(config: &Config) -> anyhow::Result<AppState> {
    let setup = config.clone();
    let (tool_status, orchestrator) = tokio::task::spawn_blocking(move || {
        let tools = ToolManager::new();
        let status = vec![
            tools.get_tool_info(ToolType::YtDlp, setup.ytdlp.as_deref()),
            tools.get_tool_info(ToolType::Ffmpeg, setup.ffmpeg.as_deref()),
        ];
        (status, setup.build_orchestrator(&tools))
    })
    .await
    .context("tool detection task failed")?;

    for tool in &tool_status {
        if tool.is_available {
            tracing::info!(
                tool = %tool.name,
                version = tool.version.as_deref().unwrap_or("unknown"),
                path = ?tool.path,
                "tool found"
            );
        } else {
            tracing::warn!(tool = %tool.name, "tool not found; downloads needing it will fail");
        }
    }

    let orchestrator = orchestrator.context("failed to set up the stream catalog")?;

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        tools: Arc::new(tool_status),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::ffi::OsString;

    #[tokio::test(flavor = "current_thread")]
    async fn prepare_reports_missing_tools() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("videos");
        let args: Vec<OsString> = vec![
            "youtube-downloader-web".into(),
            "--output-dir".into(),
            output_dir.clone().into_os_string(),
            "--ffmpeg".into(),
            "/nonexistent/ffmpeg".into(),
            "--yt-dlp".into(),
            "/nonexistent/yt-dlp".into(),
        ];
        let config = Config::try_parse_from(args).unwrap();

        let state = prepare(&config).await.unwrap();

        assert_eq!(state.orchestrator.output_dir(), output_dir.as_path());
        assert_eq!(state.tools.len(), 2);
        assert!(state.tools.iter().all(|t| !t.is_available));
        assert_eq!(state.tools[0].name, "yt-dlp");
    }
}
