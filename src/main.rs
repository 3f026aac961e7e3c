//! webrtc-widgets - WebRTC widget comm host
//!
//! Entry point for the `webrtc-widgets` binary. `run` bridges a kernel or
//! front-end process to the widget manager over stdin/stdout; the other
//! subcommands inspect the build, the widget registry and the configuration.

use clap::Parser;
use serde_json::json;
use tracing::{info, warn};

use webrtc_widgets::cli::{Cli, Commands, ConfigSubcommand};
use webrtc_widgets::config::{self, HostConfig};
use webrtc_widgets::error::{Error, Result};
use webrtc_widgets::{host, logging, version, WidgetRegistry};

fn main() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    let (config_path, auto_connect) = match cli.command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Widgets { json } => {
            return list_widgets(json);
        }
        Commands::Config { ref subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(subcommand.clone());
        }
        Commands::Run {
            ref config,
            auto_connect,
        } => (config.clone(), auto_connect),
    };

    let mut config = match HostConfig::load(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprint!("{}", e.format_for_terminal());
            std::process::exit(e.exit_code());
        }
    };

    // CLI flags take precedence over file and environment
    if auto_connect {
        config.peer.auto_connect = true;
    }

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    info!(
        version = %build.full_version(),
        target = %build.target,
        profile = %build.profile,
        "Starting webrtc-widgets host"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("webrtc-widgets")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    if let Err(e) = runtime.block_on(async_host_main(config)) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }

    Ok(())
}

/// Serve stdin/stdout until EOF or Ctrl+C
async fn async_host_main(config: HostConfig) -> Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();

    tokio::select! {
        result = host::run(&config, stdin, &mut stdout) => {
            let stats = result?;
            info!(
                requests = stats.requests,
                errors = stats.errors,
                lines_written = stats.lines_written,
                "Host stopped"
            );
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        }
    }

    Ok(())
}

/// Print the widget types the host can instantiate
fn list_widgets(as_json: bool) -> Result<()> {
    let registry = WidgetRegistry::with_builtin();
    let keys = registry.keys();

    if as_json {
        let entries: Vec<_> = keys
            .iter()
            .map(|key| {
                json!({
                    "model_module": key.model_module,
                    "model_name": key.model_name,
                    "view_module": key.view_module,
                    "view_name": key.view_name,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{:<18} {:<20} {}", "MODULE", "MODEL", "VIEW");
    for key in &keys {
        println!("{:<18} {:<20} {}", key.model_module, key.model_name, key.view_name);
    }

    Ok(())
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = HostConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            config::init_config(path.as_deref(), force)?;
        }
        ConfigSubcommand::Validate { config } => match HostConfig::load(config.as_deref()) {
            Ok(_) => println!("Configuration is valid."),
            Err(e) => {
                eprint!("{}", e.format_for_terminal());
                std::process::exit(e.exit_code());
            }
        },
    }

    Ok(())
}
