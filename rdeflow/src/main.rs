use clap::Parser;
use tracing_subscriber::EnvFilter;

use rdeflow::app;
use rdeflow::client::StaticTokenProvider;
use rdeflow::config::{ActionConfig, Cli, LogFormat};
use rdeflow::output::{GithubActionsSink, OutputSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match cli.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    let sink = GithubActionsSink::from_env();
    let config = match ActionConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            sink.set_failed(&e.to_string());
            return Err(e.into());
        }
    };

    let tokens = StaticTokenProvider::new(config.access_token.clone());
    app::run(&config, &tokens, &sink).await?;
    Ok(())
}
