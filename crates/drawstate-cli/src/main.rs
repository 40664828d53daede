mod check;

use std::ffi::CStr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use drawstate_common::platform;
use drawstate_core::DrawStateConfig;
use drawstate_layer::proc_addr::{DEBUG_MARKER_ENTRY_POINTS, DEVICE_ENTRY_POINTS, INSTANCE_ENTRY_POINTS};
use drawstate_layer::properties;
use tracing::info;

#[derive(Parser)]
#[command(name = "drawstate")]
#[command(about = "DrawState - Vulkan draw-state validation layer tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or create the layer configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List the entry points the layer intercepts
    EntryPoints {
        /// Include the debug-marker entry points
        #[arg(long)]
        debug_marker: bool,
    },

    /// Show layer properties and where configuration is read from
    Info,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show {
        /// Configuration file path (default: search path)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write a configuration file with default settings
    Init {
        /// Where to write (default: ./drawstate.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check a configuration file and report problems
    Check {
        /// Configuration file path (default: search path)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    drawstate_common::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show { config } => {
                let path = config.unwrap_or_else(platform::default_config_path);
                let loaded = if path.exists() {
                    DrawStateConfig::load(&path)?
                } else {
                    info!("{} not found, showing defaults", path.display());
                    DrawStateConfig::default()
                };
                println!("# {}", path.display());
                print!("{}", loaded.to_toml_string()?);
            }

            ConfigAction::Init { config, force } => {
                let path = config.unwrap_or_else(|| PathBuf::from(platform::CONFIG_FILE_NAME));
                if path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists. Use --force to overwrite",
                        path.display()
                    );
                }
                let content = DrawStateConfig::default().to_toml_string()?;
                std::fs::write(&path, content)?;
                println!("Wrote default configuration to {}", path.display());
            }

            ConfigAction::Check { config } => {
                let path = config.unwrap_or_else(platform::default_config_path);
                if !check::run_check(&path) {
                    std::process::exit(1);
                }
            }
        },

        Commands::EntryPoints { debug_marker } => {
            println!("Instance ({}):", INSTANCE_ENTRY_POINTS.len());
            for name in INSTANCE_ENTRY_POINTS {
                println!("  {}", name);
            }
            println!();
            println!("Device ({}):", DEVICE_ENTRY_POINTS.len());
            for name in DEVICE_ENTRY_POINTS {
                println!("  {}", name);
            }
            if debug_marker {
                println!();
                println!(
                    "{} ({}):",
                    properties::DEBUG_MARKER_EXTENSION_NAME.to_string_lossy(),
                    DEBUG_MARKER_ENTRY_POINTS.len()
                );
                for name in DEBUG_MARKER_ENTRY_POINTS {
                    println!("  {}", name);
                }
            }
        }

        Commands::Info => {
            let props = properties::layer_properties();
            // SAFETY: layer_properties always NUL-terminates both strings.
            let (name, description) = unsafe {
                (
                    CStr::from_ptr(props.layer_name.as_ptr()),
                    CStr::from_ptr(props.description.as_ptr()),
                )
            };
            println!("Layer:        {}", name.to_string_lossy());
            println!("Description:  {}", description.to_string_lossy());
            println!("Version:      {}", format_version(props.implementation_version));
            println!("API version:  {}", format_version(props.spec_version));
            println!("Extensions:");
            for ext in properties::device_extension_properties() {
                // SAFETY: as above.
                let ext_name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
                println!("  {} (rev {})", ext_name.to_string_lossy(), ext.spec_version);
            }
            println!();
            println!("Platform:     {}", platform::platform_name());
            println!("Config file:  {}", platform::default_config_path().display());
            println!("  override with ${}", platform::CONFIG_ENV);
            println!("Log filter:   ${}", drawstate_common::logging::LOG_ENV);
        }
    }

    Ok(())
}

fn format_version(version: u32) -> String {
    format!(
        "{}.{}.{}",
        ash::vk::api_version_major(version),
        ash::vk::api_version_minor(version),
        ash::vk::api_version_patch(version)
    )
}
