//! Command handlers for the dashboard, one per user action.
//!
//! The web layer translates requests into calls on [`Dashboard`] and renders
//! the returned [`CommandReport`] or [`TableView`]. Nothing in here knows
//! about HTTP or templates.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::classifier::classify;
use crate::collector::{search_articles, simulated_articles, SearchProvider};
use crate::db::{Article, Database};

/// Filter value that shows every category.
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CommandReport {
    pub inserted: u64,
    pub notices: Vec<Notice>,
}

impl CommandReport {
    fn push(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

#[derive(Debug)]
pub struct TableView {
    /// Distinct categories present in the store, in order of first appearance.
    pub categories: Vec<String>,
    pub articles: Vec<Article>,
    pub total: usize,
}

pub struct Dashboard {
    db: Arc<Database>,
    search: Arc<dyn SearchProvider>,
    region: String,
}

impl Dashboard {
    pub fn new(db: Arc<Database>, search: Arc<dyn SearchProvider>, region: impl Into<String>) -> Self {
        Self {
            db,
            search,
            region: region.into(),
        }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub async fn run_simulated_fetch(&self) -> CommandReport {
        let mut articles = simulated_articles(Utc::now());
        for article in &mut articles {
            article.category = classify(&article.title).label().to_string();
        }

        let inserted = self.db.insert_batch(&articles).await;
        info!("Simulated fetch stored {} of {} articles", inserted, articles.len());

        let mut report = CommandReport {
            inserted,
            ..Default::default()
        };
        report.push(Notice::success(format!(
            "Saved {} new articles from the simulated feed.",
            inserted
        )));
        report
    }

    pub async fn run_search(&self, keyword: &str, count: usize) -> CommandReport {
        let mut report = CommandReport::default();

        let keyword = keyword.trim();
        if keyword.is_empty() {
            report.push(Notice::warning("Enter a keyword to search."));
            return report;
        }

        let mut articles =
            match search_articles(self.search.as_ref(), keyword, count, &self.region, Utc::now())
                .await
            {
                Ok(articles) => articles,
                Err(e) => {
                    warn!("Search for '{}' failed: {}", keyword, e);
                    report.push(Notice::error(format!("Search failed: {}", e)));
                    Vec::new()
                }
            };

        if articles.is_empty() {
            report.push(Notice::warning("No results found. Please try again later."));
            return report;
        }

        for article in &mut articles {
            let text = format!("{} {}", article.title, keyword);
            article.category = classify(&text).label().to_string();
        }

        report.inserted = self.db.insert_batch(&articles).await;
        info!(
            "Search for '{}' stored {} of {} articles",
            keyword,
            report.inserted,
            articles.len()
        );
        report.push(Notice::success(format!(
            "Search finished, {} new articles saved.",
            report.inserted
        )));
        report
    }

    /// Reload the whole table, optionally keeping one category.
    pub async fn snapshot(&self, category: Option<&str>) -> TableView {
        let articles = self.db.load_all().await;
        let total = articles.len();
        let categories = distinct_categories(&articles);
        let articles = filter_by_category(articles, category);

        TableView {
            categories,
            articles,
            total,
        }
    }
}

pub fn distinct_categories(articles: &[Article]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for article in articles {
        if !categories.contains(&article.category) {
            categories.push(article.category.clone());
        }
    }
    categories
}

pub fn filter_by_category(articles: Vec<Article>, category: Option<&str>) -> Vec<Article> {
    match category {
        None | Some(ALL_CATEGORIES) => articles,
        Some(category) => articles
            .into_iter()
            .filter(|article| article.category == category)
            .collect(),
    }
}
