use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::app::Config;

#[derive(Parser, Debug)]
#[command(name = "chat-relay")]
#[command(version)]
#[command(about = "Session-scoped chat proxy in front of a hosted RAG pipeline", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Address to bind (overrides config)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Pipeline base URL (overrides config)
    #[arg(long, global = true, env = "CHAT_RELAY_PIPELINE_URL")]
    pub pipeline_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.pipeline_url {
            config.pipeline.base_url = url.clone();
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the proxy server (default)
    Serve,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Check the local proxy and the remote pipeline
    Status,
    /// Print the effective component template and bindings
    Template {
        /// Print the template itself as JSON
        #[arg(long)]
        json: bool,
    },
}
