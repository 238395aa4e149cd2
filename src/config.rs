//! Configuration and CLI argument handling

use std::time::Duration;

use clap::Parser;

use crate::{engine::EngineSettings, services::GatewayLatency};

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "timer-dashboard")]
#[command(about = "A timer dashboard served over HTTP, backed by an in-memory timer store")]
#[command(version = "1.0.0")]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Milliseconds between two ticks of a running timer
    #[arg(long, default_value = "1000")]
    pub tick_ms: u64,

    /// Persist elapsed time every this many ticks (0 disables)
    #[arg(long, default_value = "5")]
    pub flush_every: u64,

    /// Answer store calls immediately instead of simulating network latency
    #[arg(long)]
    pub no_latency: bool,

    /// Start with an empty store instead of the demo timers
    #[arg(long)]
    pub empty: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            tick_period: Duration::from_millis(self.tick_ms.max(1)),
            flush_every: self.flush_every,
        }
    }

    pub fn latency(&self) -> GatewayLatency {
        if self.no_latency {
            GatewayLatency::none()
        } else {
            GatewayLatency::default()
        }
    }
}
