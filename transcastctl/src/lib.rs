pub mod commands;

use std::io;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Serialize;
use thiserror::Error;
use transcast_core::{load_transcast_config, SqliteJobStore, TranscastConfig};

use commands::inspect::{ParseStatusArgs, TransportArgs, ValidateArgs};
use commands::session::{ResumeArgs, SubmitArgs};
use commands::state::StateCommands;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] transcast_core::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state store error: {0}")]
    Store(#[from] transcast_core::StoreError),
    #[error("{0}")]
    Coordinator(#[from] transcast_core::CoordinatorError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("transcoding failed: {0}")]
    JobFailed(String),
    #[error("invalid media source: {0}")]
    InvalidSource(String),
    #[error("required resource missing: {0}")]
    MissingResource(String),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Submit media for transcoding and play the result", long_about = None)]
pub struct Cli {
    /// Path to transcast.toml
    #[arg(long, default_value = "configs/transcast.toml")]
    pub config: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Log debug details to stderr (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a media URL or file and follow the job
    Submit(SubmitArgs),
    /// Resume monitoring of the persisted job
    Resume(ResumeArgs),
    /// Show the playback transport chosen for a stream URL
    Transport(TransportArgs),
    /// Check a media source against the upload rules
    Validate(ValidateArgs),
    /// Parse a status.txt document
    ParseStatus(ParseStatusArgs),
    /// Inspect or clear the persisted job
    #[command(subcommand)]
    State(StateCommands),
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Transport(args) => render(&commands::inspect::transport(args), cli.format),
        Commands::ParseStatus(args) => render(&commands::inspect::parse_status(args)?, cli.format),
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "transcastctl", &mut io::stdout());
            Ok(())
        }
        command => {
            let context = AppContext::new(&cli.config)?;
            run_with_context(&context, command, cli.format)
        }
    }
}

fn run_with_context(context: &AppContext, command: &Commands, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Validate(args) => {
            let report = commands::inspect::validate(args, &context.config.validation);
            render(&report, format)?;
            match report.error {
                Some(reason) => Err(AppError::InvalidSource(reason)),
                None => Ok(()),
            }
        }
        Commands::State(command) => {
            let store = context.store()?;
            render(&commands::state::run(command, &store)?, format)
        }
        Commands::Submit(args) => {
            let outcome = runtime()?.block_on(commands::session::submit(context, args, format))?;
            render(&outcome, format)
        }
        Commands::Resume(args) => {
            let outcome = runtime()?.block_on(commands::session::resume(context, args, format))?;
            render(&outcome, format)
        }
        Commands::Transport(_) | Commands::ParseStatus(_) | Commands::Completions { .. } => Ok(()),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

pub trait DisplayFallback {
    fn display(&self) -> String;
}

/// Loaded configuration plus the directory relative paths resolve against.
#[derive(Debug)]
pub struct AppContext {
    pub config: TranscastConfig,
    pub base_dir: PathBuf,
}

impl AppContext {
    pub fn new(config_path: &Path) -> Result<Self> {
        let config = load_transcast_config(config_path)?;
        let base_dir = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self { config, base_dir })
    }

    pub fn store(&self) -> Result<SqliteJobStore> {
        let path = self
            .config
            .resolve_path(&self.base_dir, &self.config.session.state_db);
        Ok(SqliteJobStore::new(path)?)
    }
}
