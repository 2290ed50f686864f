use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use teachback_lib::clock::Clock;
use teachback_lib::config::Config;
use teachback_lib::knowledge::{KnowledgeEdge, KnowledgeGraph, Relationship};
use teachback_lib::progress::{DailyProgress, ProgressStats, SessionRecord};
use teachback_lib::review::{ReviewItem, ReviewSchedule, ReviewStatistics, SessionSuggestion};
use teachback_lib::session::{SessionOutcome, SessionSummary};
use teachback_lib::TeachBack;

/// Shared application state for CLI commands
pub struct App {
    pub config: Config,
    pub user: String,
    services: TeachBack,
}

/// Locate and load the config file, then apply env and flag overrides
pub fn resolve_config(
    config_path: Option<&Path>,
    db: Option<PathBuf>,
    user: Option<String>,
) -> Result<(PathBuf, Config)> {
    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path().context("Failed to locate config directory")?,
    };

    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_env_overrides();
    if let Some(db) = db {
        config.database_path = db;
    }
    if let Some(user) = user {
        config.default_user = user;
    }

    Ok((config_path, config))
}

impl App {
    /// Resolve config and open the database it names
    pub fn new(config_path: Option<&Path>, db: Option<PathBuf>, user: Option<String>) -> Result<Self> {
        let (_, config) = resolve_config(config_path, db, user)?;

        let services = TeachBack::open(&config.database_path).with_context(|| {
            format!("Failed to open database at {}", config.database_path.display())
        })?;

        Ok(Self {
            user: config.default_user.clone(),
            config,
            services,
        })
    }

    /// Current time from the clock the services schedule against
    pub fn now(&self) -> DateTime<Utc> {
        self.services.clock.now()
    }

    /// Resolve an item by full id, or by a unique id prefix
    pub fn find_item(&self, id_or_prefix: &str) -> Result<ReviewItem> {
        if let Ok(id) = Uuid::parse_str(id_or_prefix) {
            return self
                .services
                .scheduler
                .get_review_item(id)
                .context("Failed to load review item");
        }

        let prefix = id_or_prefix.to_lowercase();
        let items = self.list_items()?;
        let matches: Vec<&ReviewItem> = items
            .iter()
            .filter(|i| i.id.to_string().starts_with(&prefix))
            .collect();

        match matches.len() {
            0 => bail!("No review item with id starting '{}'", id_or_prefix),
            1 => Ok(matches[0].clone()),
            _ => bail!(
                "Ambiguous id '{}'. Matches:\n{}",
                id_or_prefix,
                matches
                    .iter()
                    .map(|i| format!("  - {} ({})", i.id, i.topic))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        }
    }

    pub fn list_items(&self) -> Result<Vec<ReviewItem>> {
        self.services
            .scheduler
            .list_review_items(&self.user)
            .context("Failed to list review items")
    }

    pub fn add_topic(&self, topic: &str) -> Result<ReviewItem> {
        self.services
            .scheduler
            .create_or_get_review_item(&self.user, topic)
            .context("Failed to add topic")
    }

    pub fn record_review(&self, item_id: Uuid, quality: i64) -> Result<ReviewItem> {
        self.services
            .scheduler
            .record_review(item_id, quality)
            .context("Failed to record review")
    }

    pub fn due(&self) -> Result<Vec<ReviewItem>> {
        self.services
            .scheduler
            .get_due_reviews(&self.user)
            .context("Failed to list due reviews")
    }

    pub fn upcoming(&self, days: u32) -> Result<Vec<ReviewItem>> {
        self.services
            .scheduler
            .get_upcoming_reviews(&self.user, days)
            .context("Failed to list upcoming reviews")
    }

    pub fn schedule(&self, days: u32) -> Result<ReviewSchedule> {
        self.services
            .scheduler
            .get_review_schedule(&self.user, days)
            .context("Failed to build review schedule")
    }

    pub fn statistics(&self) -> Result<ReviewStatistics> {
        self.services
            .scheduler
            .get_review_statistics(&self.user)
            .context("Failed to compute review statistics")
    }

    pub fn suggest(&self, max_items: usize) -> Result<Vec<SessionSuggestion>> {
        self.services
            .scheduler
            .suggest_review_session(&self.user, max_items)
            .context("Failed to suggest a review session")
    }

    pub fn complete_session(
        &self,
        topic: &str,
        summary: &SessionSummary,
        related: &[String],
    ) -> Result<SessionOutcome> {
        self.services
            .recorder
            .complete_session(&self.user, topic, summary, related)
            .context("Failed to record session")
    }

    pub fn progress_stats(&self) -> Result<ProgressStats> {
        self.services
            .progress
            .get_user_stats(&self.user)
            .context("Failed to compute progress")
    }

    pub fn progress_history(&self, days: u32) -> Result<Vec<DailyProgress>> {
        self.services
            .progress
            .get_progress_history(&self.user, days)
            .context("Failed to load progress history")
    }

    pub fn sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        self.services
            .progress
            .list_sessions(&self.user, Some(limit))
            .context("Failed to list sessions")
    }

    pub fn graph(&self) -> Result<KnowledgeGraph> {
        self.services
            .tracker
            .knowledge_graph(&self.user)
            .context("Failed to load knowledge graph")
    }

    pub fn link(&self, from: &str, to: &str, relationship: Relationship) -> Result<KnowledgeEdge> {
        self.services
            .tracker
            .connect_topics(&self.user, from, to, relationship)
            .context("Failed to link topics")?
            .with_context(|| {
                format!("Both '{}' and '{}' must be taught before they can be linked", from, to)
            })
    }
}
