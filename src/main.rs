/*!
 * RideHub CLI - admin API launcher
 */

use clap::{Parser, Subcommand};
use ridehub::{
    config::AppConfig,
    error::{health_outcome, Result, RideHubError, EXIT_SUCCESS},
    logging, LogLevel,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ridehub")]
#[command(version, about = "RideHub back-office admin API", long_about = None)]
struct Cli {
    /// Config file (default: ./ridehub.toml when present)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long = "log-level", value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the admin API server
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,

        /// Bind port
        #[arg(long)]
        port: Option<u16>,

        /// MySQL connection URL
        #[arg(long = "database-url", value_name = "URL")]
        database_url: Option<String>,
    },

    /// Run one on-demand health check and print it as JSON
    ///
    /// Exits 0 when healthy or warning, 1 on error, 2 when critical.
    Check,

    /// Print the effective configuration as TOML
    Config,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        use clap::CommandFactory;
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "ridehub", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level.into();
    }

    match cli.command {
        Commands::Serve {
            host,
            port,
            database_url,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(url) = database_url {
                config.server.database.url = url;
            }

            logging::init_logging(&config.logging)?;
            ridehub::serve(config)
        }
        Commands::Check => {
            logging::init_logging(&config.logging)?;
            let report = ridehub::check(config)?;
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| RideHubError::Config(format!("Failed to render report: {}", e)))?;
            println!("{}", json);
            health_outcome(report.overall_status)
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}
