use clap::Parser;
use nexus_agent::{AgentConfig, Cli, RunMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    nexus_agent::init_tracing(&cli.log_level);

    let config = AgentConfig::load(cli.config.as_deref())?;
    let mode = if cli.stdio { RunMode::Stdio } else { RunMode::Http };

    nexus_agent::run(config, mode).await
}
