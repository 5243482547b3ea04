//! Switchyard CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Single-message or interactive chat through the router
//! - `config`  — Show, locate or validate the configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "switchyard",
    about = "Switchyard — chat request router with tools, CRM bridge and image overlays",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat through the response strategy router
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Continue an existing thread
        #[arg(short, long)]
        thread: Option<String>,

        /// Reasoning mode: normal, thinking or fast
        #[arg(long, default_value = "normal")]
        mode: String,

        /// Attach an image URL to the message
        #[arg(long)]
        image: Option<String>,

        /// Enable an extension on the thread (repeatable)
        #[arg(short, long = "extension")]
        extensions: Vec<String>,

        /// Keep the thread in memory instead of ~/.switchyard/threads
        #[arg(long)]
        ephemeral: bool,

        /// Caller id used for thread ownership
        #[arg(long, env = "SWITCHYARD_USER", default_value = "local")]
        user: String,

        /// Caller email forwarded to the CRM gateway
        #[arg(long, env = "SWITCHYARD_USER_EMAIL")]
        email: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Print a default config file
    Default,
    /// Validate the config file and report warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Chat {
            message,
            thread,
            mode,
            image,
            extensions,
            ephemeral,
            user,
            email,
        } => {
            let options = commands::chat::ChatOptions {
                thread,
                mode,
                image,
                extensions,
                ephemeral,
                user,
                email,
            };
            commands::chat::run(message, options).await?
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Default => commands::config_cmd::default().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
    }

    Ok(())
}
