use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use webmention_fetch::app::App;
use webmention_fetch::cancel::CancelToken;
use webmention_fetch::client::WebmentionHttpClient;
use webmention_fetch::config::{Config, ConfigLoader};
use webmention_fetch::error::WebmentionError;
use webmention_fetch::output::{HumanOutput, JsonOutput, OutputMode};
use webmention_fetch::state::FetchState;
use webmention_fetch::store::JsonFileStore;

#[derive(Parser)]
#[command(name = "webmentions")]
#[command(about = "Fetch webmentions and merge them into per-page JSON files")]
#[command(version)]
struct Cli {
    /// Print the run report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch webmentions from the endpoint", visible_alias = "f")]
    Fetch(FetchArgs),
}

#[derive(Args, Clone)]
struct FetchArgs {
    #[arg(long, short = 't')]
    token: Option<String>,

    #[arg(long, short = 'd')]
    domain: Option<String>,

    /// Directory holding one <slug>.json file per target page
    #[arg(long, short = 'D')]
    destination: Option<Utf8PathBuf>,

    /// Checkpoint file holding the last fetched mention id
    #[arg(long, short = 's')]
    state_file: Option<Utf8PathBuf>,

    #[arg(long)]
    page_size: Option<u32>,

    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long)]
    timeout_secs: Option<u64>,

    /// JSON config file (defaults to ./webmentions.json when present)
    #[arg(long)]
    config: Option<String>,

    /// Stop fetching after this many seconds and persist what arrived
    #[arg(long)]
    cancel_after_secs: Option<u64>,
}

impl FetchArgs {
    fn overrides(&self) -> Config {
        Config {
            domain: self.domain.clone(),
            token: self.token.clone(),
            destination: self.destination.clone(),
            state_file: self.state_file.clone(),
            page_size: self.page_size,
            endpoint: self.endpoint.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<WebmentionError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &WebmentionError) -> u8 {
    match error {
        WebmentionError::InvalidConfig(_)
        | WebmentionError::ConfigRead(_)
        | WebmentionError::ConfigParse(_)
        | WebmentionError::StateRead(_)
        | WebmentionError::StateParse(_) => 2,
        WebmentionError::Http(_)
        | WebmentionError::Status { .. }
        | WebmentionError::Decode(_) => 3,
        WebmentionError::StorageRead { .. }
        | WebmentionError::StorageWrite { .. }
        | WebmentionError::Serialize(_)
        | WebmentionError::StateWrite(_) => 4,
        WebmentionError::Cancelled => 130,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Commands::Fetch(args) => run_fetch(args, output_mode),
    }
}

fn run_fetch(args: FetchArgs, output_mode: OutputMode) -> miette::Result<()> {
    let resolved = ConfigLoader::resolve(args.config.as_deref(), args.overrides())?;
    let mut state = FetchState::read(&resolved.state_file)?;

    let client = WebmentionHttpClient::new(resolved.client_settings(state.since_id))?;
    let store = Arc::new(JsonFileStore::new(resolved.destination.clone()));
    let app = App::new(store);

    let cancel = CancelToken::new();
    if let Some(secs) = args.cancel_after_secs {
        cancel.cancel_after(Duration::from_secs(secs));
    }

    let report = app.run(client, &cancel)?;

    if state.advance(report.metrics.max_id) {
        state.write(&resolved.state_file)?;
        tracing::info!(since_id = state.since_id, path = %resolved.state_file, "updated state");
    }

    match output_mode {
        OutputMode::Json => JsonOutput::print_report(&report).into_diagnostic()?,
        OutputMode::Human => HumanOutput::print_report(&report).into_diagnostic()?,
    }
    Ok(())
}
