mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use teachback_lib::knowledge::Relationship;

#[derive(Parser)]
#[command(
    name = "teachback-cli",
    about = "Spaced-repetition reviews and knowledge tracking for teach-back sessions",
    version
)]
struct Cli {
    /// Config file (default: <config dir>/teachback/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding config and TEACHBACK_DB
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// User id, overriding config and TEACHBACK_USER
    #[arg(long, global = true)]
    user: Option<String>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Start reviewing a topic (no-op if already added)
    Add {
        topic: String,
    },

    /// Record how well a topic was recalled
    Review {
        /// Item id, or a unique prefix of it
        item: String,
        /// 0 = blackout ... 5 = perfect recall
        #[arg(allow_negative_numbers = true)]
        quality: i64,
    },

    /// List reviews that are due now
    Due,

    /// List reviews falling due soon
    Upcoming {
        /// Days ahead (default from config)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Overdue reviews plus upcoming reviews by day
    Schedule {
        /// Days ahead (default from config)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Review workload summary
    Stats,

    /// Suggest what to review next
    Suggest {
        /// Maximum items (default from config)
        #[arg(long)]
        max: Option<usize>,
    },

    /// Show the review quality a session's scores map to
    Quality {
        #[arg(long)]
        confidence: f64,
        #[arg(long)]
        clarity: f64,
        /// The session revealed knowledge gaps
        #[arg(long)]
        gaps: bool,
    },

    /// Record a finished teaching session
    Session {
        topic: String,
        #[arg(long)]
        confidence: f64,
        #[arg(long)]
        clarity: f64,
        /// Knowledge gap found (repeatable)
        #[arg(long = "gap")]
        gaps: Vec<String>,
        /// Jargon left unexplained (repeatable)
        #[arg(long = "jargon")]
        jargon: Vec<String>,
        /// Related concept (repeatable)
        #[arg(long = "related")]
        related: Vec<String>,
    },

    /// Session history totals, streak and daily progress
    Progress {
        /// Days of history (default from config)
        #[arg(long)]
        days: Option<u32>,
    },

    /// List recent teaching sessions
    Sessions {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show the knowledge graph
    Graph,

    /// Link two taught topics
    Link {
        from: String,
        to: String,
        /// prerequisite, related_to or part_of
        #[arg(long, default_value = "related_to")]
        relationship: Relationship,
    },

    /// Write the current settings to the config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();

    let open_app = || app::App::new(cli.config.as_deref(), cli.db.clone(), cli.user.clone());

    match cli.command {
        Command::Add { topic } => {
            commands::add::run(&open_app()?, &topic, &cli.format, use_color)?;
        }
        Command::Review { item, quality } => {
            commands::review::run(&open_app()?, &item, quality, &cli.format, use_color)?;
        }
        Command::Due => {
            commands::due::run_due(&open_app()?, &cli.format, use_color)?;
        }
        Command::Upcoming { days } => {
            let app = open_app()?;
            let days = days.unwrap_or(app.config.schedule_days);
            commands::due::run_upcoming(&app, days, &cli.format, use_color)?;
        }
        Command::Schedule { days } => {
            let app = open_app()?;
            let days = days.unwrap_or(app.config.schedule_days);
            commands::schedule::run(&app, days, &cli.format, use_color)?;
        }
        Command::Stats => {
            commands::stats::run(&open_app()?, &cli.format, use_color)?;
        }
        Command::Suggest { max } => {
            let app = open_app()?;
            let max = max.unwrap_or(app.config.session_max_items);
            commands::suggest::run(&app, max, &cli.format, use_color)?;
        }
        Command::Quality { confidence, clarity, gaps } => {
            // Pure computation, no database needed
            commands::quality::run(confidence, clarity, gaps, &cli.format, use_color)?;
        }
        Command::Session { topic, confidence, clarity, gaps, jargon, related } => {
            commands::session::run(
                &open_app()?,
                &topic,
                confidence,
                clarity,
                gaps,
                jargon,
                &related,
                &cli.format,
                use_color,
            )?;
        }
        Command::Progress { days } => {
            let app = open_app()?;
            let days = days.unwrap_or(app.config.progress_days);
            commands::progress::run(&app, days, &cli.format, use_color)?;
        }
        Command::Sessions { limit } => {
            commands::sessions::run(&open_app()?, limit, &cli.format, use_color)?;
        }
        Command::Graph => {
            commands::graph::run(&open_app()?, &cli.format, use_color)?;
        }
        Command::Link { from, to, relationship } => {
            commands::link::run(&open_app()?, &from, &to, relationship, &cli.format)?;
        }
        Command::Init { force } => {
            // Only writes the config file; the database is opened on first use
            commands::init::run(
                cli.config.as_deref(),
                cli.db.clone(),
                cli.user.clone(),
                force,
                &cli.format,
            )?;
        }
    }

    Ok(())
}
