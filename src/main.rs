use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use bizdash_lib::kpi::{self, KpiSummary};
use bizdash_lib::notice::{Action, Notice};
use bizdash_lib::sample::{self, SampleKind, DEFAULT_DAYS};
use bizdash_lib::store::{DashboardTable, RowStore, SqliteStore};
use bizdash_lib::transcode::FileFormat;
use bizdash_lib::{config, time, transfer, AppError, AppResult};

#[derive(Debug, Parser)]
#[command(name = "bizdash", about = "Business dashboard data transfer", version)]
struct Cli {
    /// Optional explicit DB path
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the dashboard tables with their row counts.
    Tables {
        #[arg(long)]
        json: bool,
    },
    /// Export a table to a CSV or JSON file.
    Export {
        #[arg(long, value_name = "TABLE")]
        table: DashboardTable,
        #[arg(long, default_value = "csv")]
        format: FileFormat,
        /// Directory to write into (defaults to the current directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Emit a machine-readable JSON object describing the written file.
        #[arg(long)]
        json: bool,
    },
    /// Import a `.csv` or `.json` file into a table.
    Import {
        file: PathBuf,
        #[arg(long, value_name = "TABLE")]
        table: DashboardTable,
        #[arg(long)]
        json: bool,
    },
    /// Generate or clear sample data.
    #[command(subcommand)]
    Sample(SampleCommand),
    /// Print KPI totals and averages for a table.
    Kpi {
        #[arg(long, value_name = "TABLE")]
        table: DashboardTable,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum SampleCommand {
    /// Insert sample rows for the last N days, ending yesterday.
    Generate {
        #[arg(long, default_value = "all")]
        kind: SampleKind,
        #[arg(long, default_value_t = DEFAULT_DAYS)]
        days: u32,
    },
    /// Delete every row from the selected tables.
    Clear {
        #[arg(long, default_value = "all")]
        kind: SampleKind,
    },
}

#[tokio::main]
async fn main() {
    bizdash_lib::init_logging();

    let cli = Cli::parse();
    process::exit(run(cli).await);
}

async fn run(cli: Cli) -> i32 {
    let store = match open_store(cli.db.as_deref()).await {
        Ok(store) => store,
        Err(err) => return fail(Action::OpenDatabase, &err),
    };

    let action = cli.command.action();
    let code = match dispatch(&store, cli.command).await {
        Ok(code) => code,
        Err(err) => fail(action, &AppError::from(err)),
    };
    store.close().await;
    code
}

async fn open_store(explicit: Option<&Path>) -> AppResult<SqliteStore> {
    let db_path = config::resolve_db_path(explicit)
        .map_err(|err| AppError::from(err).with_context("operation", "resolve_db_path"))?;
    SqliteStore::open(&db_path).await
}

impl Commands {
    fn action(&self) -> Action {
        match self {
            Commands::Tables { .. } => Action::ListTables,
            Commands::Export { .. } => Action::Export,
            Commands::Import { .. } => Action::Import,
            Commands::Sample(SampleCommand::Generate { .. }) => Action::GenerateSample,
            Commands::Sample(SampleCommand::Clear { .. }) => Action::ClearSample,
            Commands::Kpi { .. } => Action::Summarize,
        }
    }
}

async fn dispatch(store: &SqliteStore, command: Commands) -> Result<i32> {
    match command {
        Commands::Tables { json } => {
            let mut counts = Vec::new();
            for table in DashboardTable::ALL {
                match store.count_rows(table).await {
                    Ok(rows) => counts.push((table, rows)),
                    Err(err) => return Ok(fail(Action::ListTables, &err)),
                }
            }
            if json {
                let rows: Vec<_> = counts
                    .iter()
                    .map(|(table, rows)| json!({"table": table, "label": table.label(), "rows": rows}))
                    .collect();
                print_json(&rows)?;
            } else {
                println!("{:<22} {:<22} {:>8}", "Table", "Label", "Rows");
                for (table, rows) in counts {
                    println!("{:<22} {:<22} {:>8}", table.as_str(), table.label(), rows);
                }
            }
            Ok(0)
        }
        Commands::Export {
            table,
            format,
            out,
            json,
        } => {
            let artifact =
                match transfer::export_table(store, table, format, time::today()).await {
                    Ok(artifact) => artifact,
                    Err(err) => return Ok(fail(Action::Export, &err)),
                };
            let dir = match out {
                Some(dir) => dir,
                None => std::env::current_dir().context("resolve current directory")?,
            };
            let path = match artifact.write_to(&dir) {
                Ok(path) => path,
                Err(err) => return Ok(fail(Action::Export, &err)),
            };
            if json {
                print_json(&json!({
                    "fileName": artifact.file_name,
                    "mimeType": artifact.mime_type,
                    "recordCount": artifact.record_count,
                    "path": path,
                }))?;
            } else {
                println!("{}", Notice::exported(&artifact));
                println!("{}", path.display());
            }
            Ok(0)
        }
        Commands::Import { file, table, json } => {
            match transfer::import_path(store, table, &file).await {
                Ok(summary) => {
                    if json {
                        print_json(&summary)?;
                    } else {
                        println!("{}", Notice::imported(&summary));
                    }
                    Ok(0)
                }
                Err(err) => Ok(fail(Action::Import, &err)),
            }
        }
        Commands::Sample(SampleCommand::Generate { kind, days }) => {
            match sample::generate(store, kind, days, time::today()).await {
                Ok(report) => {
                    println!("{}", Notice::sample_generated(&report));
                    print_counts(&report.tables);
                    Ok(0)
                }
                Err(err) => Ok(fail(Action::GenerateSample, &err)),
            }
        }
        Commands::Sample(SampleCommand::Clear { kind }) => match sample::clear(store, kind).await {
            Ok(report) => {
                println!("{}", Notice::sample_cleared(&report));
                print_counts(&report.tables);
                Ok(0)
            }
            Err(err) => Ok(fail(Action::ClearSample, &err)),
        },
        Commands::Kpi { table, json } => {
            let summary = match kpi::load(store, table).await {
                Ok(summary) => summary,
                Err(err) => return Ok(fail(Action::Summarize, &err)),
            };
            if json {
                print_json(&summary)?;
            } else {
                println!("{}", Notice::summarized(&summary));
                print_kpis(&summary);
            }
            Ok(0)
        }
    }
}

fn fail(action: Action, err: &AppError) -> i32 {
    err.log_with_event("command_failed");
    eprintln!("{}", Notice::failure(action, err));
    1
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("serialize output")?
    );
    Ok(())
}

fn print_counts(tables: &[sample::TableCount]) {
    for entry in tables {
        println!("{:<22} {:>8}", entry.table.as_str(), entry.rows);
    }
}

fn print_kpis(summary: &KpiSummary) {
    match summary {
        KpiSummary::SalesData(k) => {
            println!("{:<24} {:>12}", "Days", k.days);
            println!("{:<24} {:>12.2}", "Total revenue", k.total_revenue);
            println!("{:<24} {:>12}", "Total orders", k.total_orders);
            println!("{:<24} {:>12.2}", "Avg conversion rate", k.avg_conversion_rate);
        }
        KpiSummary::TrafficData(k) => {
            println!("{:<24} {:>12}", "Days", k.days);
            println!("{:<24} {:>12}", "Total visitors", k.total_visitors);
            println!("{:<24} {:>12}", "Total page views", k.total_page_views);
            println!("{:<24} {:>12.2}", "Avg bounce rate", k.avg_bounce_rate);
            println!("{:<24} {:>12.1}", "Avg session duration", k.avg_session_duration);
        }
        KpiSummary::PerformanceMetrics { metrics } => {
            println!("{:<24} {:<12} {:>10} {:>10}", "Metric", "Date", "Value", "Target");
            for (name, snapshot) in metrics {
                println!(
                    "{:<24} {:<12} {:>10} {:>10}",
                    name,
                    snapshot.date,
                    display_number(snapshot.value),
                    display_number(snapshot.target)
                );
            }
        }
    }
}

fn display_number(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into())
}
