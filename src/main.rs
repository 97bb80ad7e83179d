use clap::Parser;
use youtube_downloader_lib::config::Config;
use youtube_downloader_lib::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    init_tracing(config.log_level.as_tracing_level(), config.log_file.as_deref())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    youtube_downloader_lib::run(config).await
}
