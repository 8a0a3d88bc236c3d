use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cartera::controller::Controller;
use cartera::domain::{AppConfig, CarteraError, DEFAULT_PAGE_SIZE};
use cartera::model::{Model, Status};
use cartera::source::DirectorySource;
use cartera::ui::DashboardUI;

#[derive(Parser, Debug)]
#[command(
    name = "cartera",
    version,
    about = "Browse, filter and export a lending portfolio in the terminal."
)]
struct Args {
    /// Directory holding deudores, prestamos, pagos and usuarios (csv, json, parquet or arrow)
    #[arg(short, long, default_value = ".")]
    data_dir: String,

    /// Where exports are written, defaults to the data directory
    #[arg(short, long)]
    export_dir: Option<String>,

    #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Keyboard poll interval in milliseconds
    #[arg(long = "poll-ms", default_value_t = 100)]
    poll_ms: u64,

    #[arg(long, default_value = "~/.cartera.log")]
    log_file: String,

    /// Log filter, e.g. `debug` or `cartera=trace`; overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

fn expand_path(path: &str) -> Result<PathBuf, CarteraError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.into_owned()))
        .map_err(|e| CarteraError::InvalidPath(format!("{path}: {e}")))
}

fn init_logging(log_file: &Path, log_level: Option<&str>) -> Result<(), CarteraError> {
    let file = File::create(log_file)?;
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("cartera=info")),
    }
    .map_err(|e| CarteraError::Logging(e.to_string()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| CarteraError::Logging(e.to_string()))
}

fn build_config(args: &Args) -> Result<AppConfig, CarteraError> {
    let data_dir = expand_path(&args.data_dir)?;
    let export_dir = match &args.export_dir {
        Some(dir) => expand_path(dir)?,
        None => data_dir.clone(),
    };
    Ok(AppConfig::default()
        .data_dir(data_dir)
        .export_dir(export_dir)
        .page_size(args.page_size)
        .event_poll_time(args.poll_ms))
}

fn main() -> ExitCode {
    let args = Args::parse();
    let result = expand_path(&args.log_file)
        .and_then(|log_file| init_logging(&log_file, args.log_level.as_deref()))
        .and_then(|_| build_config(&args))
        .and_then(|config| {
            let mut terminal = ratatui::init();
            let result = run(&config, &mut terminal);
            ratatui::restore();
            result
        });

    match result {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(config: &AppConfig, terminal: &mut DefaultTerminal) -> Result<(), CarteraError> {
    info!("Starting cartera on {}", config.data_dir.display());

    let source = Arc::new(DirectorySource::new(config.data_dir.clone()));
    let mut model = Model::init(config, source);
    let mut ui = DashboardUI::new();
    let controller = Controller::new(config);

    model.reload_all();

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(&model, f))?;

        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    info!("Quitting cartera");
    Ok(())
}
