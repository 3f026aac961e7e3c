//! CLI argument parsing using clap v4

use clap::{Parser, Subcommand};

/// webrtc-widgets - Kernel-side WebRTC widget models
///
/// Hosts `WebRTCPeerModel` and `MediaStreamModel` widgets and speaks the
/// Jupyter widget comm protocol as line-delimited JSON over stdin/stdout.
#[derive(Parser, Debug)]
#[command(name = "webrtc-widgets")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the stdio comm host (JSON lines in on stdin, out on stdout)
    Run {
        /// Path to configuration file
        #[arg(short, long, env = "WEBRTC_WIDGETS_CONFIG")]
        config: Option<String>,

        /// Send `connect` to every peer as soon as it is created
        #[arg(long)]
        auto_connect: bool,
    },

    /// List the widget types this host can instantiate
    Widgets {
        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}
