//! Bindgate - LDAP login bridge
//!
//! Answers `POST /login` by binding against an LDAP directory.

mod logging;

use bindgate_api::LoginServer;
use bindgate_core::config::{BindgateConfig, LogFormat};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "bindgate")]
#[command(author = "Bindgate Team")]
#[command(version = bindgate_core::VERSION)]
#[command(about = "LDAP login bridge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Bind address
    #[arg(long, env = "BINDGATE_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port number
    #[arg(short, long, env = "BINDGATE_PORT")]
    port: Option<u16>,

    /// LDAP server URL
    #[arg(long, env = "LDAP_URL")]
    ldap_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "BINDGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, env = "BINDGATE_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the login server
    Server,

    /// Validate the configuration and exit
    Check,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = if let Some(config_path) = &cli.config {
        BindgateConfig::from_file(config_path)?
    } else {
        BindgateConfig::from_env()
    };

    // Override with CLI args
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(url) = cli.ldap_url {
        config.ldap.server_url = url;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    match cli.command.unwrap_or(Commands::Server) {
        Commands::Version => print_banner(),
        Commands::Check => {
            config.validate()?;
            println!("Configuration OK");
            println!("  listen:      {}:{}", config.server.bind_address, config.server.port);
            println!("  directory:   {}", config.ldap.server_url);
            println!("  search base: {}", config.ldap.search_base);
            println!("  filter:      {}", config.ldap.user_filter);
        }
        Commands::Server => {
            logging::init(&config.logging)?;
            print_banner();
            run_server(config).await?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    _     _           _             _
   | |__ (_)_ __   __| | __ _  __ _| |_ ___
   | '_ \| | '_ \ / _` |/ _` |/ _` | __/ _ \
   | |_) | | | | | (_| | (_| | (_| | ||  __/
   |_.__/|_|_| |_|\__,_|\__, |\__,_|\__\___|
                        |___/
   LDAP Login Bridge
   Version: {}
"#,
        bindgate_core::VERSION
    );
}

async fn run_server(config: BindgateConfig) -> anyhow::Result<()> {
    info!("Starting Bindgate server...");
    info!("Directory: {}", config.ldap.server_url);
    if let Some(dir) = &config.logging.directory {
        info!("Log directory: {:?}", dir);
    }

    let server = LoginServer::new(config);
    server.run().await?;

    Ok(())
}
