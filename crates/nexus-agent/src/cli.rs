//! The process interface spec §6 names: a single binary, two run modes,
//! `--config`/`--log-level` overrides.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "nexus-agent", about = "NAS management agent", version)]
pub struct Cli {
    /// Path to a TOML config file. Falls back to built-in defaults and
    /// environment variables (`NEXUS__*`) if omitted or missing.
    #[arg(long, env = "NEXUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run the MCP core over stdio instead of mounting the HTTP server.
    /// Collectors still run so the cache stays live (spec §4.9).
    #[arg(long)]
    pub stdio: bool,

    /// `tracing-subscriber` env-filter directive, e.g. `info` or
    /// `nexus_collectors=debug,info`.
    #[arg(long, env = "NEXUS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_http() {
        let cli = Cli::parse_from(["nexus-agent"]);
        assert!(!cli.stdio);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn stdio_flag_parses() {
        let cli = Cli::parse_from(["nexus-agent", "--stdio", "--log-level", "debug"]);
        assert!(cli.stdio);
        assert_eq!(cli.log_level, "debug");
    }
}
