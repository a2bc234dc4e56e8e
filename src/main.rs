//! Work Request Planner command line.
//!
//! Loads the snapshot from SQLite, runs one command against it and saves the
//! result when the command changed anything.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use planner::config::Config;
use planner::db::{self, SnapshotStore, SqliteStore};
use planner::demo::demo_snapshot;
use planner::errors::Result;
use planner::export::{snapshot_to_json, topics_to_csv};
use planner::ids::{SequentialIds, UuidGenerator};
use planner::import::{parse_snapshot_str, resolve_import, ImportMode, ImportOptions};
use planner::models::{Cadence, LogDraft, Outcome, Priority, Snapshot, Status};
use planner::query::{self, FilterSpec};
use planner::store::{Action, History};
use planner::validation::validate_action;

#[derive(Parser, Debug)]
#[command(name = "planner")]
#[command(about = "Plan recurring work requests between teams and areas")]
#[command(version)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true, env = "PLANNER_DB_PATH")]
    db: Option<PathBuf>,

    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, global = true, env = "PLANNER_TODAY")]
    today: Option<NaiveDate>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, env = "PLANNER_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Default)]
struct FilterArgs {
    #[arg(long)]
    team: Option<String>,
    #[arg(long)]
    area: Option<String>,
    #[arg(long)]
    status: Option<Status>,
    #[arg(long)]
    cadence: Option<Cadence>,
    #[arg(long)]
    priority: Option<Priority>,
    #[arg(long)]
    tag: Option<String>,
    /// Earliest due date (inclusive)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Latest due date (inclusive)
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Substring of title, description or tags
    #[arg(long)]
    text: Option<String>,
}

impl From<FilterArgs> for FilterSpec {
    fn from(args: FilterArgs) -> Self {
        FilterSpec {
            team_id: args.team,
            area_id: args.area,
            status: args.status,
            cadence: args.cadence,
            priority: args.priority,
            tag: args.tag,
            due_from: args.from,
            due_to: args.to,
            text: args.text,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Due and overdue counts for the filtered topics
    Kpis {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Open topics per team and area, with the earliest due date
    Matrix,
    /// Monthly histograms, top areas and cadence share
    Report {
        #[arg(long, default_value = "10")]
        top: usize,
    },
    /// Topics due per day for one month
    Calendar {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
    /// Import a JSON snapshot
    Import {
        file: PathBuf,
        #[arg(long, default_value = "replace")]
        mode: ImportMode,
        /// Give every imported record a fresh id
        #[arg(long)]
        reassign_ids: bool,
        /// Refuse payloads with unresolved references instead of repairing them
        #[arg(long)]
        strict: bool,
    },
    /// Write the snapshot as pretty JSON
    ExportJson {
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Write topics as CSV
    ExportCsv {
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Recompute every topic's next request date
    Recalc,
    /// Revert the last saved change
    Undo,
    /// Replace everything with demo data
    LoadDemo,
    /// Remove all teams, areas, topics and logs
    Clear,
    /// Record a request sent for a topic
    Log {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        area: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        sent_by: Option<String>,
        #[arg(long)]
        outcome: Option<Outcome>,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(today) = cli.today {
        config.today = Some(today);
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Database path: {:?}", config.db_path);

    let pool = db::init_database(&config.db_path).await?;
    let store = SqliteStore::new(pool);
    let today = config.clock().today();

    run(cli.command, &store, &config, today).await?;
    Ok(())
}

async fn run(command: Command, store: &SqliteStore, config: &Config, today: NaiveDate) -> Result<()> {
    let snapshot = store.load().await?;

    match command {
        Command::Kpis { filter } => {
            let spec = FilterSpec::from(filter);
            let topics = query::filter_topics(&snapshot.topics, &spec);
            let kpis = query::compute_kpis(&topics, today);
            println!("{}", serde_json::to_string_pretty(&kpis)?);
        }
        Command::Matrix => print_matrix(&snapshot),
        Command::Report { top } => print_report(&snapshot, today, top),
        Command::Calendar { year, month } => {
            let topics: Vec<_> = snapshot.topics.iter().collect();
            for day in query::calendar_month(&topics, year, month)? {
                if !day.in_month || day.topics.is_empty() {
                    continue;
                }
                let titles: Vec<&str> = day.topics.iter().map(|t| t.title.as_str()).collect();
                println!("{}\t{}", day.date, titles.join(", "));
            }
        }
        Command::Import {
            file,
            mode,
            reassign_ids,
            strict,
        } => {
            let raw = tokio::fs::read_to_string(&file).await?;
            let incoming = parse_snapshot_str(&raw)?;
            let options = ImportOptions {
                mode,
                reassign_ids,
                strict,
            };
            let outcome = resolve_import(&snapshot, incoming, &options, &mut UuidGenerator)?;
            if outcome.report.has_drops() {
                tracing::warn!(
                    "Import skipped {} log(s) and {} topic(s), stripped {} area reference(s)",
                    outcome.report.dropped_logs,
                    outcome.report.dropped_topics,
                    outcome.report.stripped_area_refs
                );
            }
            commit(store, &snapshot, Action::LoadState(outcome.snapshot), config).await?;
            println!("{}", serde_json::to_string_pretty(&outcome.report)?);
        }
        Command::ExportJson { out } => write_output(out, snapshot_to_json(&snapshot)?).await?,
        Command::ExportCsv { out } => write_output(out, topics_to_csv(&snapshot.topics)).await?,
        Command::Recalc => {
            commit(store, &snapshot, Action::RecalcDates, config).await?;
        }
        Command::Undo => {
            let past = store.load_history().await?;
            let mut history = History::with_past(snapshot, past, config.undo_depth);
            if history.undo() {
                persist(store, &history).await?;
                println!("Undone, {} step(s) left", history.undo_depth());
            } else {
                println!("Nothing to undo");
            }
        }
        Command::LoadDemo => {
            let demo = demo_snapshot(&mut SequentialIds::default(), today);
            commit(store, &snapshot, Action::LoadState(demo), config).await?;
        }
        Command::Clear => {
            commit(store, &snapshot, Action::Reset, config).await?;
        }
        Command::Log {
            topic,
            area,
            date,
            sent_by,
            outcome,
            notes,
        } => {
            let log = LogDraft {
                date,
                sent_by,
                outcome,
                notes,
                ..LogDraft::new(topic, area)
            }
            .build(&mut UuidGenerator, today);
            println!("{}", log.id);
            commit(store, &snapshot, Action::AddLog(log), config).await?;
        }
    }
    Ok(())
}

/// Validate and apply `action` on top of the persisted undo history, then save
/// both if the snapshot changed.
async fn commit(store: &SqliteStore, snapshot: &Snapshot, action: Action, config: &Config) -> Result<()> {
    validate_action(snapshot, &action)?;
    let past = store.load_history().await?;
    let mut history = History::with_past(snapshot.clone(), past, config.undo_depth);
    history.dispatch(action);

    if history.present() == snapshot {
        tracing::info!("Nothing changed");
        return Ok(());
    }
    persist(store, &history).await
}

async fn persist(store: &SqliteStore, history: &History) -> Result<()> {
    let past: Vec<Snapshot> = history.past().cloned().collect();
    store.save_with_history(history.present(), &past).await
}

async fn write_output(out: Option<PathBuf>, content: String) -> Result<()> {
    match out {
        Some(path) => {
            tokio::fs::write(&path, content).await?;
            tracing::info!("Wrote {:?}", path);
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn print_matrix(snapshot: &Snapshot) {
    let topics: Vec<_> = snapshot.topics.iter().collect();
    let matrix = query::build_matrix(&snapshot.teams, &snapshot.areas, &topics);

    let header: Vec<&str> = snapshot.areas.iter().map(|a| a.name.as_str()).collect();
    println!("team\t{}", header.join("\t"));
    for team in &snapshot.teams {
        let cells: Vec<String> = snapshot
            .areas
            .iter()
            .map(|area| match matrix.get(&team.id, &area.id) {
                Some(cell) => match cell.next_due {
                    Some(due) => format!("{} ({})", cell.count, due),
                    None => cell.count.to_string(),
                },
                None => "-".to_string(),
            })
            .collect();
        println!("{}\t{}", team.name, cells.join("\t"));
    }
}

fn print_report(snapshot: &Snapshot, today: NaiveDate, top: usize) {
    let topics: Vec<_> = snapshot.topics.iter().collect();

    println!("month\tdue\trequests");
    let requests = query::requests_per_month(&snapshot.logs, today);
    for (month, due) in query::due_per_month(&topics, today) {
        println!("{}\t{}\t{}", month, due, requests.get(&month).copied().unwrap_or(0));
    }

    println!();
    println!("area\ttopics");
    for (area, count) in query::top_areas(&topics, &snapshot.areas, top) {
        println!("{}\t{}", area.name, count);
    }

    println!();
    println!("cadence\ttopics");
    for (cadence, count) in query::cadence_share(&topics) {
        println!("{}\t{}", cadence, count);
    }
}
