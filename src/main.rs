use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use learning_engine::engine::select_diagnostic;
use learning_engine::export::json::import_question_bank;
use learning_engine::models::DiagnosticResponse;
use learning_engine::*;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "learnctl", about = "Spaced repetition and skill tracking", version)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Pretend the current time is this RFC 3339 timestamp
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start tracking a topic for a learner
    Enroll {
        #[arg(long)]
        user: String,
        #[arg(long)]
        roadmap: String,
        #[arg(long)]
        topic: String,
        #[arg(long)]
        question: Option<String>,
    },

    /// Record an answer to a review item
    Answer {
        #[arg(long)]
        item: String,
        #[arg(long, action = clap::ArgAction::Set)]
        correct: bool,
        /// Response time in milliseconds
        #[arg(long)]
        time_ms: f64,
        /// Learner's average response time (defaults to the configured baseline)
        #[arg(long)]
        avg_ms: Option<f64>,
    },

    /// List items due for review, most overdue first
    Due {
        #[arg(long)]
        user: String,
        #[arg(long)]
        roadmap: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Aggregate review statistics
    Stats {
        #[arg(long)]
        user: String,
        #[arg(long)]
        roadmap: Option<String>,
    },

    /// Per-topic proficiency, confidence and status
    Skills {
        #[arg(long)]
        user: String,
        #[arg(long)]
        roadmap: String,
    },

    /// Diagnostic assessment
    #[command(subcommand)]
    Diagnostic(DiagnosticCommand),

    /// Move the simulated date forward by one day
    AdvanceDay,

    /// Go back to the system clock
    ResetDate,
}

#[derive(Subcommand)]
enum DiagnosticCommand {
    /// Pick a topic-balanced question set
    Select {
        #[arg(long)]
        bank: PathBuf,
        #[arg(long)]
        roadmap: String,
        #[arg(long, default_value = "10")]
        count: usize,
        /// Seed for a reproducible selection
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Grade diagnostic answers and enroll the missed topics
    Submit {
        #[arg(long)]
        bank: PathBuf,
        #[arg(long)]
        user: String,
        /// JSON array of {"questionId", "answer"}
        #[arg(long)]
        responses: PathBuf,
    },
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    logging::init_tracing(&config.effective_log_level());

    let store = SqliteItemStore::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;

    let simulated = match cli.now {
        Some(now) => Some(now),
        None => store.simulated_now()?,
    };
    let clock: Arc<dyn Clock> = match simulated {
        Some(now) => Arc::new(ManualClock::new(now)),
        None => Arc::new(SystemClock),
    };

    match &cli.command {
        Command::AdvanceDay => {
            let next = clock.now() + chrono::Duration::days(1);
            store.set_simulated_now(next)?;
            println!("Current date: {}", next.format("%Y-%m-%d"));
            return Ok(());
        }
        Command::ResetDate => {
            store.clear_simulated_now()?;
            println!("Using system clock");
            return Ok(());
        }
        Command::Diagnostic(DiagnosticCommand::Select {
            bank,
            roadmap,
            count,
            seed,
        }) => {
            let bank = import_question_bank(bank)?;
            let mut rng: Box<dyn RngCore> = match seed {
                Some(seed) => Box::new(StdRng::seed_from_u64(*seed)),
                None => Box::new(StdRng::from_entropy()),
            };
            let picked = select_diagnostic(&bank.for_roadmap(roadmap), *count, rng.as_mut());
            return print_json(&picked);
        }
        _ => {}
    }

    let engine = AdaptiveEngine::new(store, clock, config);

    match cli.command {
        Command::Enroll {
            user,
            roadmap,
            topic,
            question,
        } => {
            let mut key = ItemKey::new(&user, &roadmap, &topic);
            if let Some(question) = question {
                key = key.with_question(&question);
            }
            print_json(&engine.enroll(key)?)
        }
        Command::Answer {
            item,
            correct,
            time_ms,
            avg_ms,
        } => {
            let avg = avg_ms.unwrap_or(engine.config().default_avg_response_ms);
            let event = AnswerEvent::new(ItemId(item), correct, time_ms);
            print_json(&engine.record_answer(&event, avg)?)
        }
        Command::Due {
            user,
            roadmap,
            limit,
        } => print_json(&engine.due_queue(&user, roadmap.as_deref(), limit)?),
        Command::Stats { user, roadmap } => {
            print_json(&engine.review_stats(&user, roadmap.as_deref())?)
        }
        Command::Skills { user, roadmap } => print_json(&engine.skill_summaries(&user, &roadmap)?),
        Command::Diagnostic(DiagnosticCommand::Submit {
            bank,
            user,
            responses,
        }) => {
            let bank = import_question_bank(&bank)?;
            let text = std::fs::read_to_string(&responses)
                .with_context(|| format!("failed to read {}", responses.display()))?;
            let responses: Vec<DiagnosticResponse> = serde_json::from_str(&text)?;
            print_json(&engine.record_diagnostic(&user, &bank, &responses)?)
        }
        Command::AdvanceDay | Command::ResetDate | Command::Diagnostic(_) => Ok(()),
    }
}
