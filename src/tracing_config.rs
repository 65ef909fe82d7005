//! Subscriber setup for processes embedding the host.
//!
//! The library only emits `tracing` events; whoever owns the process decides
//! where they go. [`init_tracing`] wires a subscriber from the environment:
//!
//! ```bash
//! # cache hits, misses and invalidations as an indented tree
//! TSZ_LOG=tsz_lshost=debug TSZ_LOG_FORMAT=tree my-editor-host
//!
//! # per-name decisions of the batch resolver, one JSON object per event
//! TSZ_LOG=tsz_lshost::resolution_cache=trace TSZ_LOG_FORMAT=json my-editor-host
//! ```
//!
//! Nothing is installed unless `TSZ_LOG` or `RUST_LOG` is set. Output goes to
//! stderr.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Output format, from `TSZ_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    /// Hierarchical output via `tracing-tree`
    Tree,
    /// Newline-delimited JSON
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Filter directives and format read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub directives: String,
    pub format: LogFormat,
}

impl TracingConfig {
    /// `TSZ_LOG` wins over `RUST_LOG`; `None` when neither is set.
    pub fn from_env() -> Option<Self> {
        let directives = std::env::var("TSZ_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok()?;
        let format = std::env::var("TSZ_LOG_FORMAT")
            .map(|value| LogFormat::parse(&value))
            .unwrap_or(LogFormat::Text);
        Some(Self { directives, format })
    }

    /// Install the global subscriber.
    ///
    /// Returns false when a subscriber was already installed.
    pub fn install(&self) -> bool {
        let filter = EnvFilter::builder().parse_lossy(&self.directives);

        match self.format {
            LogFormat::Tree => {
                let tree_layer = tracing_tree::HierarchicalLayer::default()
                    .with_indent_amount(2)
                    .with_indent_lines(true)
                    .with_targets(true);
                Registry::default()
                    .with(filter)
                    .with(tree_layer)
                    .try_init()
                    .is_ok()
            }
            LogFormat::Json => {
                let json_layer = fmt::layer().json().with_writer(std::io::stderr);
                Registry::default()
                    .with(filter)
                    .with(json_layer)
                    .try_init()
                    .is_ok()
            }
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .is_ok(),
        }
    }
}

/// Install a subscriber if the environment asks for one.
///
/// Safe to call repeatedly; only the first successful call has an effect.
pub fn init_tracing() {
    if let Some(config) = TracingConfig::from_env() {
        config.install();
    }
}
