use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

mod controller;
mod domain;
mod inputter;
mod model;
mod query;
mod records;
mod seed;
mod store;
mod ui;
mod wizard;

use controller::Controller;
use domain::{DeskConfig, DeskError};
use model::{Model, Status};
use records::DeskView;
use store::DeskStore;
use ui::DeskUi;

/// Trading desk console: fixtures, odds alerts, margin rules, pricing
/// models and the audit trail in one keyboard driven table view.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// View to open first (fixtures, alerts, margins, models, audit)
    #[arg(short, long)]
    view: Option<String>,

    /// File the desk log is written to
    #[arg(long, default_value = "oddsdesk.log")]
    log_file: String,

    /// Terminal event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Name recorded in the audit trail for desk actions
    #[arg(long, default_value = "desk")]
    actor: String,
}

/// File logging. The guard must be held for the whole session or late
/// log lines are dropped.
fn init_logging(log_file: &str) -> Result<tracing_appender::non_blocking::WorkerGuard, DeskError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let expanded = shellexpand::full(log_file)
        .map_err(|err| DeskError::BadArgument(format!("bad log path {}: {}", log_file, err)))?;
    let path = PathBuf::from(expanded.as_ref());
    let directory = match path.parent() {
        Some(parent) if parent != Path::new("") => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&directory).ok();
    let file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "oddsdesk.log".into());

    let file_appender = tracing_appender::rolling::never(&directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,oddsdesk=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    Ok(guard)
}

fn main() -> ExitCode {
    match run() {
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run() -> Result<(), DeskError> {
    let args = Args::parse();
    let _log_guard = init_logging(&args.log_file)?;
    info!("oddsdesk {} starting", env!("CARGO_PKG_VERSION"));

    let start_view = match &args.view {
        Some(name) => DeskView::from_name(name).ok_or_else(|| {
            DeskError::BadArgument(format!(
                "unknown view '{}', expected one of fixtures, alerts, margins, models, audit",
                name
            ))
        })?,
        None => DeskView::Fixtures,
    };

    let config = DeskConfig::default()
        .event_poll_ms(args.poll_ms)
        .operator(args.actor)
        .start_view(start_view);

    // Everything that can fail to load does so before the terminal is
    // switched into raw mode.
    let store = DeskStore::load()?;

    let mut terminal = ratatui::init();
    let result = run_desk(&mut terminal, &config, store);
    ratatui::restore();
    result
}

fn run_desk(
    terminal: &mut ratatui::DefaultTerminal,
    config: &DeskConfig,
    store: DeskStore,
) -> Result<(), DeskError> {
    let size = terminal.size()?;
    let mut model = Model::new(config, store, size.width as usize, size.height as usize);
    let ui = DeskUi::new();
    let controller = Controller::new(config);

    while model.status != Status::Quitting {
        terminal.draw(|frame| ui.draw(&model, frame))?;
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        }
    }
    info!("Desk session closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn view_names_resolve_case_insensitively() {
        assert_eq!(DeskView::from_name("Alerts"), Some(DeskView::Alerts));
        assert_eq!(DeskView::from_name("margins"), Some(DeskView::Margins));
        assert_eq!(DeskView::from_name("nope"), None);
    }
}
