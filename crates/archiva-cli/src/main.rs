//! Archiva - directory authentication tooling
//!
//! Try a directory login, inspect the local users it provisions and check the
//! directory configuration.

mod commands;
mod utils;

use archiva_core::ArchivaConfig;
use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "archiva")]
#[command(author = "Archiva Team")]
#[command(version = archiva_core::VERSION)]
#[command(about = "Archiva directory authentication", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "ARCHIVA_CONFIG")]
    config: Option<String>,

    /// Database URL
    #[arg(long, global = true, env = "ARCHIVA_DATABASE_URL")]
    database_url: Option<String>,

    /// Directory server host or URL
    #[arg(long, global = true)]
    ldap_host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "ARCHIVA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate a user against the directory
    Login {
        /// Login name
        username: String,

        /// Password (prompted for, or read from piped stdin, when omitted)
        #[arg(long, env = "ARCHIVA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show a local user and its groups
    User {
        /// Login name
        login: String,
    },

    /// List local users
    Users,

    /// Validate the configuration
    CheckConfig {
        /// Also connect and bind to the directory server
        #[arg(long)]
        connect: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Load or create config
    let mut config = if let Some(config_path) = &cli.config {
        ArchivaConfig::from_file(config_path)?
    } else {
        ArchivaConfig::from_env()
    };

    // Override with CLI args
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if let Some(host) = cli.ldap_host {
        config.ldap.host = host;
        config.ldap.enabled = true;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config);
    debug!(
        database = %config.database.url,
        directory_enabled = config.ldap.enabled,
        server_type = %config.ldap.server_type,
        "Configuration loaded"
    );

    let ctx = CommandContext {
        config,
        output_format: cli.output,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Login { username, password } => {
            commands::login::execute(&ctx, &username, password).await
        }
        Commands::User { login } => commands::user::execute(&ctx, &login).await,
        Commands::Users => commands::users::execute(&ctx).await,
        Commands::CheckConfig { connect } => commands::check_config::execute(&ctx, connect).await,
        Commands::Version => {
            println!("archiva {}", archiva_core::VERSION);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(config: &ArchivaConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // logs go to stderr so JSON output on stdout stays parseable
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
