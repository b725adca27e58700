pub mod toml_config;

pub use toml_config::LoanConfig;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

/// Arguments of the `loan-pipeline` binary.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "loan-pipeline")]
#[command(about = "Evaluates a loan application document through the remote decision services")]
pub struct CliConfig {
    #[arg(long, help = "Path of the application document (.txt, .md, .eml)")]
    pub document: PathBuf,

    #[arg(long, help = "TOML configuration file; built-in defaults when omitted")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Print the full outcome as JSON")]
    pub json: bool,

    #[arg(long, help = "Request id used in logs (defaults to loan_<timestamp>)")]
    pub request_id: Option<String>,
}

/// Arguments of the `loan-services` binary.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "loan-services")]
#[command(about = "Serves the extraction, solvency, property and approval services")]
pub struct ServeConfig {
    #[arg(long, help = "TOML configuration file; built-in defaults when omitted")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Overrides server.bind")]
    pub bind: Option<String>,
}

/// Loads the file when given, the defaults otherwise.
pub fn load_config(path: Option<&std::path::Path>) -> crate::utils::error::Result<LoanConfig> {
    match path {
        Some(path) => {
            tracing::info!("📋 Loading configuration from {}", path.display());
            LoanConfig::from_file(path)
        }
        None => {
            tracing::info!("📋 No configuration file given, using defaults");
            Ok(LoanConfig::default())
        }
    }
}
