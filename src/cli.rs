//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::indicator_provider::IndicatorProvider;
use crate::domain::bar_table::BarTable;
use crate::domain::config_validation::DATA_SECTION;
use crate::domain::error::StratsafeError;
use crate::domain::reconcile::{Reconciliation, trade_events};
use crate::domain::runner;
use crate::domain::schema;
use crate::domain::strategy::Strategy;
use crate::domain::validator::{self, ValidationDefaults};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "stratsafe", about = "Strategy validator and signal backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct Source {
    /// Strategy expression text
    #[arg(short, long)]
    pub expr: Option<String>,
    /// File holding the strategy expression
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate and sanitize a strategy expression
    Validate {
        #[command(flatten)]
        source: Source,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a strategy, then evaluate and reconcile it over CSV bars
    Run {
        #[arg(short, long)]
        file: PathBuf,
        /// Directory of <TICKER>.csv files (overrides [data] directory)
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the signal table to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the schema registry
    Schema,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Validate {
            source,
            config,
            json,
        } => run_validate(&source, config.as_ref(), json),
        Command::Run {
            file,
            data,
            config,
            output,
        } => run_strategy(&file, data.as_ref(), config.as_ref(), output.as_ref()),
        Command::Schema => {
            print!("{}", schema::render_table());
            ExitCode::SUCCESS
        }
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = StratsafeError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn load_defaults(config: Option<&FileConfigAdapter>) -> Result<ValidationDefaults, StratsafeError> {
    match config {
        Some(adapter) => ValidationDefaults::from_config(adapter),
        None => Ok(ValidationDefaults::default()),
    }
}

fn read_source(source: &Source) -> Result<String, StratsafeError> {
    match (&source.expr, &source.file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => Ok(fs::read_to_string(path)?),
        (None, None) => Err(StratsafeError::Rejected {
            reason: "no strategy given".to_string(),
        }),
    }
}

fn run_validate(source: &Source, config_path: Option<&PathBuf>, json: bool) -> ExitCode {
    let adapter = match config_path.map(load_config).transpose() {
        Ok(a) => a,
        Err(code) => return code,
    };
    let defaults = match load_defaults(adapter.as_ref()) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let text = match read_source(source) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let outcome = validator::validate_with(&text, &defaults, chrono::Local::now().date_naive());

    if json {
        match serde_json::to_string_pretty(&outcome.report()) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(1);
            }
        }
    } else {
        if outcome.ok {
            println!("{}", outcome.sanitized);
        }
        print_changes(&outcome.changes);
    }

    if outcome.ok {
        ExitCode::SUCCESS
    } else {
        let err = StratsafeError::Rejected {
            reason: "validation failed".to_string(),
        };
        if !json {
            eprintln!("error: {err}");
        }
        (&err).into()
    }
}

fn print_changes(changes: &validator::ValidationChanges) {
    if changes.is_empty() {
        return;
    }
    eprintln!("{} change(s):", changes.len());
    for change in changes.iter() {
        eprintln!("  {}: {}", change.key, change.message);
    }
}

fn run_strategy(
    file: &Path,
    data_override: Option<&PathBuf>,
    config_path: Option<&PathBuf>,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: Load config
    let adapter = match config_path.map(load_config).transpose() {
        Ok(a) => a,
        Err(code) => return code,
    };

    match run_pipeline(file, data_override, adapter.as_ref(), output_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_pipeline(
    file: &Path,
    data_override: Option<&PathBuf>,
    config: Option<&FileConfigAdapter>,
    output_path: Option<&PathBuf>,
) -> Result<(), StratsafeError> {
    let defaults = load_defaults(config)?;

    // Stage 2: Validate and instantiate
    eprintln!("Validating strategy from {}", file.display());
    let text = fs::read_to_string(file)?;
    let outcome = validator::validate_with(&text, &defaults, chrono::Local::now().date_naive());
    print_changes(&outcome.changes);
    if !outcome.ok {
        return Err(StratsafeError::Rejected {
            reason: "validation failed".to_string(),
        });
    }
    let strategy = validator::instantiate(&outcome.sanitized)?;

    // Stage 3: Load bars, evaluate and reconcile
    let data_dir = resolve_data_dir(data_override, config)?;
    let data = CsvAdapter::new(data_dir);
    let start = strategy.start_date.unwrap_or(defaults.start_date);
    let end = strategy.end_date.unwrap_or(defaults.end_date);

    let (table, reconciliation) = run_with_data(&strategy, &data, start, end)?;
    let events = trade_events(&reconciliation);
    eprintln!("{} bars, {} trade events", table.len(), events.len());

    // Stage 4: Output
    match output_path {
        Some(path) => {
            CsvAdapter::write_signals(path, &table)?;
            eprintln!("Signals written to {}", path.display());
        }
        None => {
            for event in &events {
                println!("{}\t{}", table.bars[event.bar_index].date, event.kind);
            }
        }
    }
    Ok(())
}

/// Load bars for the strategy's ticker and every other ticker its conditions
/// read, then evaluate and reconcile it.
pub fn run_with_data(
    strategy: &Strategy,
    data: &dyn DataPort,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(BarTable, Reconciliation), StratsafeError> {
    eprintln!("Loading {} bars {} to {}", strategy.ticker, start, end);
    let bars = data.fetch_ohlcv(&strategy.ticker, start, end)?;
    if bars.is_empty() {
        return Err(StratsafeError::NoData {
            ticker: strategy.ticker.clone(),
        });
    }
    let mut table = BarTable::new(strategy.ticker.clone(), bars);

    let mut provider = IndicatorProvider::new();
    for ticker in referenced_tickers(strategy) {
        eprintln!("Loading {} bars for cross-ticker series", ticker);
        let bars = data.fetch_ohlcv(&ticker, start, end)?;
        provider = provider.with_ticker(ticker, bars);
    }

    let reconciliation = runner::run(strategy, &mut table, &provider);
    Ok((table, reconciliation))
}

fn resolve_data_dir(
    data_override: Option<&PathBuf>,
    config: Option<&FileConfigAdapter>,
) -> Result<PathBuf, StratsafeError> {
    if let Some(dir) = data_override {
        return Ok(dir.clone());
    }
    config
        .and_then(|c| c.get_string(DATA_SECTION, "directory"))
        .map(|d| PathBuf::from(d.trim()))
        .ok_or_else(|| StratsafeError::ConfigMissing {
            section: DATA_SECTION.to_string(),
            key: "directory".to_string(),
        })
}

/// Tickers other than the strategy's own that its conditions read.
fn referenced_tickers(strategy: &Strategy) -> BTreeSet<String> {
    strategy
        .buy_condition
        .series()
        .into_iter()
        .chain(strategy.sell_condition.series())
        .filter_map(|s| s.ticker())
        .filter(|t| *t != strategy.ticker)
        .map(str::to_string)
        .collect()
}
