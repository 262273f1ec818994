//! framebus-inspect — screens a transcript of raw inbound messages.
//!
//! Feeds every line of a JSON Lines transcript through the same origin,
//! envelope and namespace gates a live bus applies, and prints what the bus
//! would have done with it.  Useful when a frame "never receives" a message
//! and you want to know which gate dropped it.
//!
//! # Usage
//!
//! ```text
//! framebus-inspect [OPTIONS] <TRANSCRIPT>
//!
//! Options:
//!   --config <FILE>         Bus configuration (TOML)
//!   --self-origin <ORIGIN>  Origin of the receiving context
//!   --allow <ORIGIN>        Trust an origin (repeatable)
//!   --listen <NS>           Listen on a namespace (repeatable)
//! ```
//!
//! `<TRANSCRIPT>` may be `-` to read standard input.
//!
//! # Environment variable overrides
//!
//! | Variable               | Description                         |
//! |------------------------|-------------------------------------|
//! | `FRAMEBUS_CONFIG`      | Path to the configuration file      |
//! | `FRAMEBUS_SELF_ORIGIN` | Origin of the receiving context     |
//! | `RUST_LOG`             | Log filter (default `info`)         |
//!
//! Flags are applied on top of the file: `--self-origin` replaces the file's
//! value, `--allow` and `--listen` add to the file's lists.
//!
//! With no namespace from either source the bus never attaches to its
//! channel, and every line is reported as `rejected not-listening`.

mod transcript;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use framebus_core::infrastructure::{load_config, FrameHandle, FrameHub, LocalEventBus};
use framebus_core::{BusConfig, MessageBus};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::transcript::screen_transcript;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Screens raw inbound messages against a framebus configuration.
#[derive(Debug, Parser)]
#[command(
    name = "framebus-inspect",
    about = "Screens a transcript of raw inbound messages against a framebus configuration",
    version
)]
struct Cli {
    /// Bus configuration file (TOML).  Defaults apply when omitted.
    #[arg(long, env = "FRAMEBUS_CONFIG")]
    config: Option<PathBuf>,

    /// Origin of the receiving context.  Messages from it are always trusted.
    #[arg(long, env = "FRAMEBUS_SELF_ORIGIN")]
    self_origin: Option<String>,

    /// Trust an additional origin.  `*` trusts every origin.
    #[arg(long = "allow", value_name = "ORIGIN")]
    allow: Vec<String>,

    /// Listen on an additional namespace.
    #[arg(long = "listen", value_name = "NS")]
    listen: Vec<String>,

    /// JSON Lines transcript, or `-` for standard input.
    transcript: PathBuf,
}

impl Cli {
    /// Builds the effective [`BusConfig`] from the config file and flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    fn bus_config(&self) -> anyhow::Result<BusConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => BusConfig::default(),
        };

        if let Some(origin) = &self.self_origin {
            config.self_origin = origin.clone();
        }
        config.allowed_origins.extend(self.allow.iter().cloned());
        config.namespaces.extend(self.listen.iter().cloned());
        Ok(config)
    }

    fn open_transcript(&self) -> anyhow::Result<Box<dyn BufRead>> {
        if self.transcript.as_os_str() == "-" {
            return Ok(Box::new(io::stdin().lock()));
        }
        let file = File::open(&self.transcript).with_context(|| {
            format!("failed to open transcript {}", self.transcript.display())
        })?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Builds a bus inside a single frame whose origin is the configured one.
fn build_bus(config: &BusConfig) -> anyhow::Result<MessageBus<FrameHandle>> {
    let hub = FrameHub::new();
    let frame = hub.open(config.self_origin.clone());
    MessageBus::from_config(Arc::new(frame), Arc::new(LocalEventBus::new()), config)
        .context("invalid bus configuration")
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // Logs go to stderr so verdicts on stdout stay machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.bus_config()?;
    let bus = build_bus(&config)?;

    info!(
        self_origin = %config.self_origin,
        origins = ?bus.allowed_origins(),
        namespaces = ?bus.namespaces(),
        "screening transcript {}",
        cli.transcript.display()
    );

    let input = cli.open_transcript()?;
    let summary = screen_transcript(&bus, input, io::stdout().lock())?;

    info!(
        admitted = summary.admitted,
        rejected = summary.rejected(),
        unreadable = summary.unreadable,
        "done"
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_transcript() {
        assert!(Cli::try_parse_from(["framebus-inspect"]).is_err());
    }

    #[test]
    fn test_cli_defaults_without_flags() {
        // Arrange: only the positional argument
        let cli = Cli::parse_from(["framebus-inspect", "t.jsonl"]);

        // Act
        let config = cli.bus_config().unwrap();

        // Assert: BusConfig defaults apply
        assert_eq!(cli.transcript, PathBuf::from("t.jsonl"));
        assert!(cli.allow.is_empty());
        assert!(cli.listen.is_empty());
        assert_eq!(config.allowed_origins, vec!["*".to_string()]);
        assert!(config.namespaces.is_empty());
    }

    #[test]
    fn test_cli_repeatable_flags() {
        let cli = Cli::parse_from([
            "framebus-inspect",
            "--allow",
            "ads.example.net",
            "--allow",
            "https://tags.example.org",
            "--listen",
            "dfp",
            "--listen",
            "gtm",
            "-",
        ]);
        assert_eq!(cli.allow, vec!["ads.example.net", "https://tags.example.org"]);
        assert_eq!(cli.listen, vec!["dfp", "gtm"]);
        assert_eq!(cli.transcript, PathBuf::from("-"));
    }

    #[test]
    fn test_bus_config_applies_flags_over_defaults() {
        // Arrange
        let cli = Cli {
            config: None,
            self_origin: Some("https://www.example.com".to_string()),
            allow: vec!["ads.example.net".to_string()],
            listen: vec!["dfp".to_string()],
            transcript: PathBuf::from("-"),
        };

        // Act
        let config = cli.bus_config().unwrap();
        let bus = build_bus(&config).unwrap();

        // Assert: the concrete origin replaced the default wildcard
        assert_eq!(config.self_origin, "https://www.example.com");
        assert_eq!(bus.allowed_origins(), vec!["ads.example.net".to_string()]);
        assert_eq!(bus.namespaces(), vec!["dfp".to_string()]);
    }

    #[test]
    fn test_bus_config_missing_file_is_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/definitely/not/here.toml")),
            self_origin: None,
            allow: Vec::new(),
            listen: Vec::new(),
            transcript: PathBuf::from("-"),
        };

        let err = cli.bus_config().unwrap_err();

        assert!(format!("{err:#}").contains("failed to load config"));
    }

    #[test]
    fn test_build_bus_rejects_empty_namespace() {
        let config = BusConfig {
            namespaces: vec![".".to_string()],
            ..BusConfig::default()
        };
        assert!(build_bus(&config).is_err());
    }
}
