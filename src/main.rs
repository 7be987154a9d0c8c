use std::path::PathBuf;

use anyhow::Context;
use chrono::{Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use squad_attendance::config::{self, Config};
use squad_attendance::engine::{build_report, AttendanceReport};
use squad_attendance::expand::DateRange;
use squad_attendance::models::{
    parse_weekday, weekday_name, AttendanceEvent, AttendanceStatus, BlockTemplate,
};
use squad_attendance::{db, report, schedule};

#[derive(Parser)]
#[command(name = "squad-attendance")]
#[command(about = "Practice schedules and attendance streaks for squad rosters", long_about = None)]
struct Cli {
    /// Canonical cohort order, comma separated (overrides COHORT_ORDER)
    #[arg(long, global = true)]
    cohort_order: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct BlockArgs {
    #[arg(long)]
    cohort: String,
    /// Sub-group, "A" when omitted
    #[arg(long)]
    group: Option<String>,
    #[arg(long, value_parser = parse_time)]
    start: NaiveTime,
    #[arg(long, value_parser = parse_time)]
    end: NaiveTime,
    #[arg(long)]
    label: Option<String>,
    /// Not on the roster; scheduled for rotation only
    #[arg(long)]
    external: bool,
}

impl BlockArgs {
    fn template(self) -> BlockTemplate {
        BlockTemplate {
            cohort: self.cohort,
            sub_group: self.group,
            label: self.label,
            start: self.start,
            end: self.end,
            external: self.external,
        }
    }
}

#[derive(clap::Args)]
struct RangeArgs {
    /// First day (defaults to the start of the month containing --to)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day (defaults to today)
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    cohort: Option<String>,
}

impl RangeArgs {
    fn range(&self) -> anyhow::Result<DateRange> {
        let to = self.to.unwrap_or_else(|| Utc::now().date_naive());
        let from = self.from.unwrap_or(DateRange::month_of(to).start);
        Ok(DateRange::new(from, to)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import attendance marks from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Add a practice block on one or more weekdays
    AddBlock {
        #[command(flatten)]
        block: BlockArgs,
        /// Weekdays, e.g. mon,wed or 1,3 (Sunday = 0)
        #[arg(long, value_delimiter = ',', required = true, value_parser = parse_day)]
        days: Vec<Weekday>,
    },
    /// Replace an existing practice block
    EditBlock {
        #[arg(long)]
        id: Uuid,
        #[command(flatten)]
        block: BlockArgs,
        #[arg(long, value_parser = parse_day)]
        day: Weekday,
    },
    /// Remove a practice block
    DeleteBlock {
        #[arg(long)]
        id: Uuid,
    },
    /// Record or correct one attendance mark
    Mark {
        #[arg(long)]
        individual: Uuid,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        status: AttendanceStatus,
        #[arg(long)]
        note: Option<String>,
    },
    /// Show practices and expected individuals for a day
    Schedule {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print attendance metrics
    Metrics {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long)]
        json: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, default_value = "attendance.md")]
        out: PathBuf,
    },
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| format!("invalid time '{value}', expected HH:MM"))
}

fn parse_day(value: &str) -> Result<Weekday, String> {
    parse_weekday(value).ok_or_else(|| format!("invalid weekday '{value}'"))
}

async fn load_report(
    pool: &PgPool,
    config: &Config,
    range_args: &RangeArgs,
) -> anyhow::Result<AttendanceReport> {
    let range = range_args.range()?;
    let (roster, blocks, events) = tokio::try_join!(
        db::fetch_roster(pool, range_args.cohort.as_deref()),
        db::fetch_blocks(pool),
        db::fetch_attendance(pool, &range),
    )?;
    info!(
        roster = roster.len(),
        blocks = blocks.len(),
        events = events.len(),
        "loaded attendance inputs"
    );
    Ok(build_report(
        &roster,
        &blocks,
        &events,
        &range,
        &config.cohort_order,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "squad_attendance=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    config::load_dotenv();
    let config = Config::from_env().with_cohort_order(cli.cohort_order.as_deref());

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let recorded = db::import_attendance_csv(&pool, &csv).await?;
            println!("Recorded {recorded} marks from {}.", csv.display());
        }
        Commands::AddBlock { block, days } => {
            let template = block.template();
            let existing = db::fetch_blocks(&pool).await?;
            let blocks = match schedule::validate_batch(&template, &days, &existing, None) {
                Ok(blocks) => blocks,
                Err(err) => {
                    warn!(%err, "practice block rejected");
                    anyhow::bail!(err);
                }
            };
            db::insert_blocks(&pool, &blocks).await?;
            for block in &blocks {
                println!(
                    "Added {} group {} on {} {}-{} ({}).",
                    block.cohort,
                    block.sub_group,
                    weekday_name(block.weekday),
                    block.start.format("%H:%M"),
                    block.end.format("%H:%M"),
                    block.id
                );
            }
        }
        Commands::EditBlock { id, block, day } => {
            let existing = db::fetch_blocks(&pool).await?;
            if !existing.iter().any(|b| b.id == id) {
                anyhow::bail!("no practice block with id {id}");
            }
            let edited = schedule::validate_edit(id, &block.template(), day, &existing)?;
            db::update_block(&pool, &edited).await?;
            println!("Updated block {id}.");
        }
        Commands::DeleteBlock { id } => {
            if db::delete_block(&pool, id).await? {
                println!("Deleted block {id}.");
            } else {
                println!("No block with id {id}.");
            }
        }
        Commands::Mark {
            individual,
            date,
            status,
            note,
        } => {
            let event = AttendanceEvent {
                individual_id: individual,
                date,
                status,
                check_in: None,
                check_out: None,
                notes: note,
                recorded_at: None,
            };
            db::upsert_attendance(&pool, &event).await?;
            println!("Marked {individual} {status} on {date}.");
        }
        Commands::Schedule { date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let (roster, blocks) =
                tokio::try_join!(db::fetch_roster(&pool, None), db::fetch_blocks(&pool))?;

            let sessions = schedule::sessions_on(date, &blocks);
            if sessions.is_empty() {
                println!("No practice on {date}.");
                return Ok(());
            }

            println!("Practice on {} {}:", weekday_name(date.weekday()), date);
            for block in sessions {
                let label = block.label.as_deref().unwrap_or("");
                let external = if block.external { " [external]" } else { "" };
                println!(
                    "- {}-{} {} group {} {}{}",
                    block.start.format("%H:%M"),
                    block.end.format("%H:%M"),
                    block.cohort,
                    block.sub_group,
                    label,
                    external
                );
            }

            let expected = schedule::expected_on(date, &roster, &blocks);
            println!("Expected ({}):", expected.len());
            for individual in expected {
                println!(
                    "- {} ({}, group {}) {}",
                    individual.name,
                    individual.cohort,
                    individual.sub_group_key(),
                    individual.id
                );
            }
        }
        Commands::Metrics { range, json, limit } => {
            let report = load_report(&pool, &config, &range).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            if report.individuals.is_empty() {
                println!("No scheduled practices for this window.");
                return Ok(());
            }

            println!("Cohorts ({} to {}):", report.range.start, report.range.end);
            for cohort in &report.cohorts {
                println!(
                    "- {}: {} members, {}% average, {} in warning",
                    cohort.cohort,
                    cohort.individual_count,
                    cohort.average_percentage,
                    cohort.warning_count
                );
            }

            let warnings = report.warnings();
            if !warnings.is_empty() {
                println!("Consecutive absences:");
                for entry in warnings.iter().take(limit) {
                    println!(
                        "- {} ({}) {} in a row",
                        entry.individual.name, entry.individual.cohort, entry.metrics.streak_length
                    );
                }
            }
        }
        Commands::Report { range, out } => {
            let report = load_report(&pool, &config, &range).await?;
            let markdown = report::build_markdown(&report, range.cohort.as_deref());
            std::fs::write(&out, markdown)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
