use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

mod charts;
mod config;
mod db;
mod error;
mod legacy;
mod models;
mod periods;
mod report;
mod sanitize;
mod services;
mod survey;

use config::{Config, ConfigError};
use models::{ActionStatus, NewActionItem, NewMeetingNote, Pillar, Priority};
use survey::{Answers, Condition, PillarQuestion, QuestionKind};

#[derive(Parser)]
#[command(name = "sqcdp")]
#[command(about = "SQCDP board: daily pillar notes, actions, surveys, transcripts and trends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load starter questions and sample data
    Seed,
    /// List the chart time periods
    Periods {
        /// Print the current identifier for a stored (possibly legacy) one
        #[arg(long)]
        migrate: Option<String>,
    },
    /// Print a bucketed chart series for one pillar
    Chart {
        #[arg(long)]
        pillar: Pillar,
        #[arg(long, default_value = "month")]
        period: String,
        /// Reference date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        target: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Print calendar heatmap cells for the month containing a date
    Heatmap {
        #[arg(long)]
        pillar: Pillar,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Record one pillar metric value, or import pillar,date,value rows from CSV
    Metric {
        #[arg(long, required_unless_present = "import")]
        pillar: Option<Pillar>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, required_unless_present = "import")]
        value: Option<f64>,
        #[arg(long, conflicts_with_all = ["pillar", "value"])]
        import: Option<PathBuf>,
    },
    /// Save the meeting note for a pillar and day
    Note {
        #[arg(long)]
        pillar: Pillar,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Key point (repeat for several)
        #[arg(long = "point", required = true)]
        points: Vec<String>,
    },
    /// List meeting notes in a date range, or the note for one day
    Notes {
        #[arg(long)]
        pillar: Option<Pillar>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, requires = "pillar", conflicts_with_all = ["from", "to"])]
        on: Option<NaiveDate>,
    },
    /// Manage action items
    Action {
        #[command(subcommand)]
        command: ActionCommand,
    },
    /// Manage pillar survey questions
    Question {
        #[command(subcommand)]
        command: QuestionCommand,
    },
    /// Submit survey answers for a pillar and day, or show the saved ones
    Respond {
        #[arg(long)]
        pillar: Pillar,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// JSON object of question id to answer
        #[arg(long)]
        answers: Option<String>,
    },
    /// Manage daily meeting transcripts
    Transcript {
        #[command(subcommand)]
        command: TranscriptCommand,
    },
    /// Clean transcript text from a file or stdin without saving it
    Sanitize {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Import a legacy JSON fixture
    MigrateLegacy {
        #[arg(long)]
        json: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate a markdown board report
    Report {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "week")]
        period: String,
        #[arg(long)]
        target: Option<f64>,
        #[arg(long, default_value = "board-report.md")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum ActionCommand {
    Add {
        #[arg(long)]
        pillar: Pillar,
        #[arg(long)]
        description: String,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Creation date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Status {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        status: ActionStatus,
    },
    List {
        #[arg(long)]
        pillar: Option<Pillar>,
        #[arg(long)]
        status: Option<ActionStatus>,
    },
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Subcommand)]
enum QuestionCommand {
    List {
        #[arg(long)]
        pillar: Pillar,
    },
    Add {
        #[arg(long)]
        pillar: Pillar,
        #[arg(long)]
        id: String,
        #[arg(long)]
        prompt: String,
        /// JSON kind, e.g. '{"type":"yes_no"}'
        #[arg(long)]
        kind: String,
        #[arg(long)]
        required: bool,
        /// Only show this question when another answer matches
        #[arg(long, requires = "show_when")]
        depends_on: Option<String>,
        #[arg(long)]
        show_when: Vec<String>,
        #[arg(long, default_value_t = 0)]
        sort_order: i32,
    },
    Retire {
        #[arg(long)]
        pillar: Pillar,
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum TranscriptCommand {
    Save {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        file: PathBuf,
    },
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    List {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    Delete {
        #[arg(long)]
        date: NaiveDate,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli.command, Config::from_env).await
}

/// Commands that never touch the database run without loading `Config`.
async fn run(
    command: Commands,
    load_config: impl FnOnce() -> Result<Config, ConfigError>,
) -> anyhow::Result<()> {
    match command {
        Commands::Periods {
            migrate: Some(stored),
        } => {
            println!("{}", periods::migrate_period_value(&stored));
        }
        Commands::Periods { migrate: None } => {
            for option in periods::strategy_options() {
                println!("{:<8} {:<10} {}", option.value, option.label, option.description);
            }
        }
        Commands::Sanitize { file } => {
            let raw = read_text(file.as_ref())?;
            println!("{}", sanitize::sanitize_transcript(&raw));
        }
        Commands::MigrateLegacy { json, dry_run: true } => {
            let fixture = legacy::load_fixture(&json)?;
            let plan = legacy::plan_migration(&fixture)?;
            print_plan(&plan);
        }
        command => {
            let config = load_config()?;
            let pool = db::connect(&config).await?;
            run_backend(command, &pool, &config).await?;
            pool.close().await;
        }
    }

    Ok(())
}

async fn run_backend(command: Commands, pool: &PgPool, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::InitDb => {
            db::init_db(pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(pool, today()).await?;
            println!("Seed data inserted.");
        }
        Commands::Chart {
            pillar,
            period,
            date,
            target,
            json,
        } => {
            let reference = date.unwrap_or_else(today);
            let strategy = periods::resolve(&period);
            let (from, to) = strategy.range(reference);
            let records = services::metrics::fetch_metrics(pool, pillar, from, to).await?;
            let series = strategy.bucket(&records, reference, target.unwrap_or(config.default_target));

            if json {
                println!("{}", serde_json::to_string_pretty(&series)?);
            } else {
                println!("{} by {} ending {}:", pillar.title(), strategy, reference);
                for bucket in &series {
                    println!(
                        "- {:<12} {:>10.1} target {:>8.1} {:?}",
                        bucket.label, bucket.value, bucket.target, bucket.data_type
                    );
                }
            }
        }
        Commands::Heatmap { pillar, date, json } => {
            let reference = date.unwrap_or_else(today);
            let (from, to) = (periods::month_start(reference), periods::month_end(reference));
            let records = services::metrics::fetch_metrics(pool, pillar, from, to).await?;
            let cells = charts::calendar_month(&records, reference);

            if json {
                println!("{}", serde_json::to_string_pretty(&cells)?);
            } else {
                for cell in &cells {
                    println!(
                        "{} {} {:>10.1} {:?}",
                        cell.date,
                        cell.date.format("%a"),
                        cell.value,
                        cell.data_type
                    );
                }
            }
        }
        Commands::Metric {
            pillar,
            date,
            value,
            import,
        } => match (import, pillar, value) {
            (Some(csv), _, _) => {
                let written = services::metrics::import_csv(pool, &csv).await?;
                println!("Wrote {written} metric values from {}.", csv.display());
            }
            (None, Some(pillar), Some(value)) => {
                let record =
                    services::metrics::upsert_metric(pool, pillar, date.unwrap_or_else(today), value)
                        .await?;
                println!("Recorded {} {} for {}.", pillar, record.value, record.date);
            }
            _ => anyhow::bail!("metric needs --pillar and --value, or --import"),
        },
        Commands::Note {
            pillar,
            date,
            points,
        } => {
            let note = NewMeetingNote::new(pillar, date.unwrap_or_else(today), points);
            let saved = services::notes::upsert_meeting_note(pool, &note).await?;
            println!(
                "Saved {} key points for {} on {}.",
                saved.key_points.len(),
                saved.pillar,
                saved.note_date
            );
        }
        Commands::Notes {
            pillar: Some(pillar),
            on: Some(date),
            ..
        } => match services::notes::fetch_meeting_note(pool, pillar, date).await? {
            Some(note) => {
                println!("{} {}", note.note_date, note.pillar.title());
                for point in note.key_points {
                    println!("  - {point}");
                }
            }
            None => println!("No {pillar} meeting note on {date}."),
        },
        Commands::Notes { pillar, from, to, .. } => {
            let to = to.unwrap_or_else(today);
            let from = from.unwrap_or(to - Duration::days(30));
            let notes = services::notes::fetch_meeting_notes(pool, pillar, from, to).await?;
            if notes.is_empty() {
                println!("No meeting notes between {from} and {to}.");
            }
            for note in notes {
                println!("{} {}", note.note_date, note.pillar.title());
                for point in note.key_points {
                    println!("  - {point}");
                }
            }
        }
        Commands::Action { command } => run_action(command, pool).await?,
        Commands::Question { command } => run_question(command, pool).await?,
        Commands::Respond {
            pillar,
            date,
            answers,
        } => {
            let date = date.unwrap_or_else(today);
            match answers {
                Some(raw) => {
                    let answers: Answers =
                        serde_json::from_str(&raw).context("answers must be a JSON object")?;
                    let saved =
                        services::responses::upsert_response(pool, pillar, date, &answers).await?;
                    println!(
                        "Saved {} answers for {} on {}.",
                        saved.answers.len(),
                        saved.pillar,
                        saved.response_date
                    );
                }
                None => match services::responses::fetch_response(pool, pillar, date).await? {
                    Some(response) => println!("{}", serde_json::to_string_pretty(&response.answers)?),
                    None => println!("No {pillar} response on {date}."),
                },
            }
        }
        Commands::Transcript { command } => run_transcript(command, pool).await?,
        Commands::MigrateLegacy { json, .. } => {
            let fixture = legacy::load_fixture(&json)?;
            let plan = legacy::plan_migration(&fixture)?;
            let summary = legacy::migrate(pool, &plan).await?;
            println!(
                "Migrated {} meeting notes and {} action items ({} already present).",
                summary.notes_written, summary.actions_inserted, summary.actions_skipped
            );
        }
        Commands::Report {
            date,
            period,
            target,
            out,
        } => {
            let reference = date.unwrap_or_else(today);
            let strategy = periods::resolve(&period);
            let (from, to) = strategy.range(reference);
            let target = target.unwrap_or(config.default_target);

            let mut snapshots = Vec::with_capacity(Pillar::ALL.len());
            for pillar in Pillar::ALL {
                let records = services::metrics::fetch_metrics(pool, pillar, from, to).await?;
                let actions = services::actions::fetch_action_items(pool, Some(pillar), None).await?;
                let latest_note = services::notes::fetch_meeting_notes(pool, Some(pillar), from, reference)
                    .await?
                    .into_iter()
                    .next();
                snapshots.push(report::PillarSnapshot {
                    pillar,
                    series: strategy.bucket(&records, reference, target),
                    actions,
                    latest_note,
                });
            }

            let report = report::build_report(reference, strategy, &snapshots);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Periods { .. } | Commands::Sanitize { .. } => {}
    }

    Ok(())
}

async fn run_action(command: ActionCommand, pool: &PgPool) -> anyhow::Result<()> {
    match command {
        ActionCommand::Add {
            pillar,
            description,
            assignee,
            priority,
            due,
            date,
        } => {
            let item = NewActionItem {
                pillar,
                description,
                assignee,
                priority,
                status: ActionStatus::Open,
                created_date: date.unwrap_or_else(today),
                due_date: due,
            };
            let action = services::actions::create_action_item(pool, &item).await?;
            println!("Created action item {}.", action.id);
        }
        ActionCommand::Status { id, status } => {
            let action = services::actions::update_action_status(pool, id, status).await?;
            println!("{} is now {}.", action.id, action.status);
        }
        ActionCommand::List { pillar, status } => {
            let actions = services::actions::fetch_action_items(pool, pillar, status).await?;
            if actions.is_empty() {
                println!("No action items found.");
            }
            for action in actions {
                println!(
                    "{} [{}] {} {}: {} ({}{})",
                    action.id,
                    action.status,
                    action.pillar,
                    action.priority,
                    action.description,
                    action.assignee.as_deref().unwrap_or("unassigned"),
                    action
                        .due_date
                        .map(|d| format!(", due {d}"))
                        .unwrap_or_default()
                );
            }
        }
        ActionCommand::Delete { id } => {
            if services::actions::delete_action_item(pool, id).await? {
                println!("Deleted {id}.");
            } else {
                println!("No action item {id}.");
            }
        }
    }
    Ok(())
}

async fn run_question(command: QuestionCommand, pool: &PgPool) -> anyhow::Result<()> {
    match command {
        QuestionCommand::List { pillar } => {
            let questions = services::questions::fetch_questions(pool, pillar).await?;
            if questions.is_empty() {
                println!("No active questions for {pillar}.");
            }
            for question in questions {
                let condition = question
                    .conditional
                    .as_ref()
                    .map(|c| format!(" (when {} is {})", c.depends_on, c.show_when.join("/")))
                    .unwrap_or_default();
                println!(
                    "{:>3} {}{}: {}{}",
                    question.sort_order,
                    question.question_id,
                    if question.required { "*" } else { "" },
                    question.prompt,
                    condition
                );
            }
        }
        QuestionCommand::Add {
            pillar,
            id,
            prompt,
            kind,
            required,
            depends_on,
            show_when,
            sort_order,
        } => {
            let kind: QuestionKind =
                serde_json::from_str(&kind).context("kind must be a JSON question kind")?;
            let question = PillarQuestion {
                pillar,
                question_id: id,
                prompt,
                kind,
                required,
                conditional: depends_on.map(|depends_on| Condition {
                    depends_on,
                    show_when,
                }),
                sort_order,
                is_active: true,
            };
            let saved = services::questions::upsert_question(pool, &question).await?;
            println!("Saved question {} for {}.", saved.question_id, saved.pillar);
        }
        QuestionCommand::Retire { pillar, id } => {
            if services::questions::retire_question(pool, pillar, &id).await? {
                println!("Retired {id} for {pillar}.");
            } else {
                println!("No active question {id} for {pillar}.");
            }
        }
    }
    Ok(())
}

async fn run_transcript(command: TranscriptCommand, pool: &PgPool) -> anyhow::Result<()> {
    match command {
        TranscriptCommand::Save { date, file } => {
            let raw = read_text(Some(&file))?;
            let saved =
                services::transcripts::save_transcript(pool, date.unwrap_or_else(today), &raw).await?;
            println!(
                "Saved transcript for {} ({} characters).",
                saved.transcript_date,
                saved.content.chars().count()
            );
        }
        TranscriptCommand::Show { date } => {
            let date = date.unwrap_or_else(today);
            match services::transcripts::fetch_transcript(pool, date).await? {
                Some(transcript) => println!("{}", transcript.content),
                None => println!("No transcript for {date}."),
            }
        }
        TranscriptCommand::List { from, to } => {
            let to = to.unwrap_or_else(today);
            let from = from.unwrap_or(to - Duration::days(30));
            let transcripts = services::transcripts::fetch_transcripts(pool, from, to).await?;
            if transcripts.is_empty() {
                println!("No transcripts between {from} and {to}.");
            }
            for transcript in transcripts {
                let preview: String = transcript.content.chars().take(72).collect();
                println!("{} {}", transcript.transcript_date, preview.replace('\n', " "));
            }
        }
        TranscriptCommand::Delete { date } => {
            if services::transcripts::delete_transcript(pool, date).await? {
                println!("Deleted transcript for {date}.");
            } else {
                println!("No transcript for {date}.");
            }
        }
    }
    Ok(())
}

fn print_plan(plan: &legacy::MigrationPlan) {
    println!(
        "Would migrate {} meeting notes and {} action items:",
        plan.notes.len(),
        plan.actions.len()
    );
    for note in &plan.notes {
        println!("- note {} {} ({} points)", note.note_date, note.pillar, note.key_points.len());
    }
    for action in &plan.actions {
        println!(
            "- action {} {} [{}/{}] {}",
            action.created_date, action.pillar, action.priority, action.status, action.description
        );
    }
}

fn read_text(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read stdin")?;
            Ok(raw)
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
