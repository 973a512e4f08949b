//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shadowscan")]
#[command(about = "AI-backed security analysis of source code and architecture diagrams")]
#[command(version)]
pub struct Cli {
    /// Path to a configuration file (defaults to the user config directory)
    #[arg(short, long, global = true, env = "SHADOWSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, global = true, default_value = "text")]
    pub format: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a source file for vulnerabilities, secrets and compliance issues
    Code {
        /// Source file to analyze
        file: PathBuf,

        /// Programming language (inferred from the file extension if omitted)
        #[arg(short, long)]
        language: Option<String>,

        /// Filename reported to the model (defaults to the file's name)
        #[arg(long)]
        filename: Option<String>,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Exit with status 1 if any finding is at or above this severity
        #[arg(long)]
        fail_on: Option<String>,
    },

    /// Analyze an architecture diagram image
    Diagram {
        /// Image file (png, jpeg or svg)
        file: PathBuf,

        /// MIME type (inferred from the file extension if omitted)
        #[arg(long)]
        mime: Option<String>,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show configured AI providers in priority order
    Providers,

    /// Pull a model on the local inference server
    Pull {
        /// Model to pull (defaults to the configured code model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Write a default configuration file
    Init {
        /// Output path for the config file
        #[arg(short, long, default_value = "shadowscan.toml")]
        output: PathBuf,
    },
}
