use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::collector::{clamp_result_count, MAX_RESULTS, MIN_RESULTS};
use crate::commands::{Dashboard, Notice, TableView, ALL_CATEGORIES};
use crate::config::SearchConfig;
use crate::db::Article;

pub struct AppState {
    pub dashboard: Dashboard,
    pub defaults: SearchDefaults,
}

/// Initial values of the search form.
#[derive(Debug, Clone)]
pub struct SearchDefaults {
    pub keyword: String,
    pub count: usize,
}

impl From<&SearchConfig> for SearchDefaults {
    fn from(config: &SearchConfig) -> Self {
        Self {
            keyword: config.default_keyword.clone(),
            count: clamp_result_count(config.default_count),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/collect/simulated", post(collect_simulated))
        .route("/collect/search", post(collect_search))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new("static"))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub notices: Vec<NoticeView>,
    pub keyword: String,
    pub count: usize,
    pub min_count: usize,
    pub max_count: usize,
    pub has_articles: bool,
    pub category_options: Vec<CategoryOption>,
    pub rows: Vec<ArticleRow>,
}

pub struct NoticeView {
    pub level: &'static str,
    pub message: String,
}

impl From<Notice> for NoticeView {
    fn from(notice: Notice) -> Self {
        Self {
            level: notice.level.as_str(),
            message: notice.message,
        }
    }
}

pub struct CategoryOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub struct ArticleRow {
    pub title: String,
    pub link: String,
    pub source: String,
    pub category: String,
    pub date: String,
}

impl From<Article> for ArticleRow {
    fn from(article: Article) -> Self {
        Self {
            date: format_date(&article.date),
            title: article.title,
            link: article.link,
            source: article.source,
            category: article.category,
        }
    }
}

/// Render a stored timestamp for display.
///
/// Stored rows use `YYYY-MM-DD HH:MM:SS.ffffff` local time and are shown
/// without fractional seconds. RFC 3339 values are shown in UTC. Unknown
/// formats are shown as-is.
pub fn format_date(raw: &str) -> String {
    if let Ok(dt) = raw.parse::<DateTime<Utc>>() {
        return dt.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return naive.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    raw.to_string()
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

fn render_page(
    view: TableView,
    selected: Option<&str>,
    notices: Vec<Notice>,
    keyword: String,
    count: usize,
) -> HtmlTemplate<IndexTemplate> {
    let selected = selected.unwrap_or(ALL_CATEGORIES);

    let mut category_options = vec![CategoryOption {
        value: ALL_CATEGORIES.to_string(),
        label: "All".to_string(),
        selected: selected == ALL_CATEGORIES,
    }];
    category_options.extend(view.categories.into_iter().map(|category| CategoryOption {
        selected: category == selected,
        label: category.clone(),
        value: category,
    }));
    // Keep the requested filter visible even when no stored row carries it.
    if !category_options.iter().any(|option| option.value == selected) {
        category_options.push(CategoryOption {
            value: selected.to_string(),
            label: selected.to_string(),
            selected: true,
        });
    }

    HtmlTemplate(IndexTemplate {
        notices: notices.into_iter().map(NoticeView::from).collect(),
        keyword,
        count,
        min_count: MIN_RESULTS,
        max_count: MAX_RESULTS,
        has_articles: view.total > 0,
        category_options,
        rows: view.articles.into_iter().map(ArticleRow::from).collect(),
    })
}

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub keyword: String,
    pub count: Option<usize>,
}

// Route handlers
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IndexQuery>,
) -> impl IntoResponse {
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let view = state.dashboard.snapshot(category).await;

    render_page(
        view,
        category,
        Vec::new(),
        state.defaults.keyword.clone(),
        state.defaults.count,
    )
}

pub async fn collect_simulated(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.dashboard.run_simulated_fetch().await;
    let view = state.dashboard.snapshot(None).await;

    render_page(
        view,
        None,
        report.notices,
        state.defaults.keyword.clone(),
        state.defaults.count,
    )
}

pub async fn collect_search(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SearchForm>,
) -> impl IntoResponse {
    let count = clamp_result_count(form.count.unwrap_or(state.defaults.count));
    let report = state.dashboard.run_search(&form.keyword, count).await;
    let view = state.dashboard.snapshot(None).await;

    render_page(view, None, report.notices, form.keyword, count)
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
