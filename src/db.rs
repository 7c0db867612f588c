use chrono::{DateTime, Local, Utc};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub source: String,
    pub category: String,
    /// Collection time, see [`format_timestamp`]
    pub date: String,
}

impl Article {
    /// A freshly collected, not yet classified article.
    pub fn collected(
        title: impl Into<String>,
        link: impl Into<String>,
        source: &str,
        collected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            source: source.to_string(),
            category: String::new(),
            date: format_timestamp(collected_at),
        }
    }
}

/// Local time as `YYYY-MM-DD HH:MM:SS.ffffff`.
///
/// Same fixed-width layout as rows already in existing databases, so
/// `ORDER BY date` stays chronological across old and new rows.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // One connection: a single writer, and `sqlite::memory:` stays one database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                title TEXT,
                link TEXT UNIQUE,
                source TEXT,
                category TEXT,
                date TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_date ON articles(date DESC)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Inserts the article unless its link is already stored.
    ///
    /// Returns `true` when a new row was written. An existing row is left
    /// untouched.
    pub async fn insert_if_absent(&self, article: &Article) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (title, link, source, category, date)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(link) DO NOTHING
            "#,
        )
        .bind(&article.title)
        .bind(&article.link)
        .bind(&article.source)
        .bind(&article.category)
        .bind(&article.date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Inserts each article independently and returns how many were new.
    pub async fn insert_batch(&self, articles: &[Article]) -> u64 {
        let mut inserted = 0;
        for article in articles {
            match self.insert_if_absent(article).await {
                Ok(true) => inserted += 1,
                Ok(false) => debug!("Skipping known link {}", article.link),
                Err(e) => warn!("Failed to store '{}': {}", article.title, e),
            }
        }
        inserted
    }

    /// All stored articles, newest first. Read failures yield an empty list.
    pub async fn load_all(&self) -> Vec<Article> {
        let result = sqlx::query_as::<_, Article>(
            r#"
            SELECT title, link, source, category, date FROM articles
            ORDER BY date DESC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await;

        match result {
            Ok(articles) => articles,
            Err(e) => {
                warn!("Failed to load articles: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn create_test_db() -> Database {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.initialize().await.unwrap();
        db
    }

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 30, 0).unwrap()
    }

    fn create_article(title: &str, link: &str, category: &str, at: DateTime<Utc>) -> Article {
        Article {
            category: category.to_string(),
            ..Article::collected(title, link, "web-search", at)
        }
    }

    mod initialization_tests {
        use super::*;

        #[tokio::test]
        async fn test_database_creation() {
            let db = Database::new("sqlite::memory:").await;
            assert!(db.is_ok());
        }

        #[tokio::test]
        async fn test_database_initialization() {
            let db = create_test_db().await;
            assert!(db.load_all().await.is_empty());
        }

        #[tokio::test]
        async fn test_double_initialization_is_safe() {
            let db = create_test_db().await;
            let result = db.initialize().await;
            assert!(result.is_ok());
        }

        #[tokio::test]
        async fn test_load_without_table_returns_empty() {
            let db = Database::new("sqlite::memory:").await.unwrap();
            // No initialize(): the table does not exist
            assert!(db.load_all().await.is_empty());
        }
    }

    mod timestamp_tests {
        use super::*;

        #[test]
        fn test_format_timestamp_fixed_width() {
            let formatted = format_timestamp(test_time());
            let expected = test_time()
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S.000000")
                .to_string();
            assert_eq!(formatted, expected);
            assert_eq!(formatted.len(), 26);
            assert_eq!(&formatted[10..11], " ");
        }

        #[test]
        fn test_collected_article_has_empty_category() {
            let article = Article::collected("Title", "https://a.com", "simulated-feed", test_time());
            assert_eq!(article.category, "");
            assert_eq!(article.source, "simulated-feed");
            assert_eq!(article.date, format_timestamp(test_time()));
        }
    }

    mod insert_tests {
        use super::*;

        #[tokio::test]
        async fn test_insert_new_article() {
            let db = create_test_db().await;
            let article = create_article("Title", "https://a.com", "AI", test_time());

            assert!(db.insert_if_absent(&article).await.unwrap());

            let stored = db.load_all().await;
            assert_eq!(stored, vec![article]);
        }

        #[tokio::test]
        async fn test_insert_known_link_is_noop() {
            let db = create_test_db().await;
            let original = create_article("Original", "https://a.com", "AI", test_time());
            db.insert_if_absent(&original).await.unwrap();

            let later = test_time() + Duration::hours(1);
            let duplicate = create_article("Changed", "https://a.com", "Finance", later);
            assert!(!db.insert_if_absent(&duplicate).await.unwrap());

            let stored = db.load_all().await;
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0], original);
        }

        #[tokio::test]
        async fn test_insert_batch_counts_new_rows() {
            let db = create_test_db().await;
            let batch: Vec<Article> = (1..=4)
                .map(|i| {
                    create_article(
                        &format!("Title {}", i),
                        &format!("https://article{}.com", i),
                        "Other",
                        test_time(),
                    )
                })
                .collect();

            assert_eq!(db.insert_batch(&batch).await, 4);
            assert_eq!(db.load_all().await.len(), 4);
        }

        #[tokio::test]
        async fn test_insert_batch_skips_known_links() {
            let db = create_test_db().await;
            let first = create_article("First", "https://a.com", "AI", test_time());
            db.insert_batch(&[first.clone()]).await;

            let later = test_time() + Duration::minutes(5);
            let batch = vec![
                create_article("First again", "https://a.com", "Other", later),
                create_article("Second", "https://b.com", "Other", later),
            ];

            assert_eq!(db.insert_batch(&batch).await, 1);

            let stored = db.load_all().await;
            assert_eq!(stored.len(), 2);
            let kept = stored.iter().find(|a| a.link == "https://a.com").unwrap();
            assert_eq!(kept, &first);
        }

        #[tokio::test]
        async fn test_insert_batch_with_duplicates_inside_batch() {
            let db = create_test_db().await;
            let batch = vec![
                create_article("One", "https://same.com", "AI", test_time()),
                create_article("Two", "https://same.com", "AI", test_time()),
            ];

            assert_eq!(db.insert_batch(&batch).await, 1);
            assert_eq!(db.load_all().await[0].title, "One");
        }

        #[tokio::test]
        async fn test_insert_batch_empty() {
            let db = create_test_db().await;
            assert_eq!(db.insert_batch(&[]).await, 0);
        }

        #[tokio::test]
        async fn test_insert_batch_without_table_inserts_nothing() {
            let db = Database::new("sqlite::memory:").await.unwrap();
            let batch = vec![create_article("One", "https://a.com", "AI", test_time())];
            assert_eq!(db.insert_batch(&batch).await, 0);
        }
    }

    mod load_tests {
        use super::*;

        #[tokio::test]
        async fn test_load_all_newest_first() {
            let db = create_test_db().await;
            for i in 1..=5 {
                let at = test_time() + Duration::hours(i);
                db.insert_if_absent(&create_article(
                    &format!("Title {}", i),
                    &format!("https://article{}.com", i),
                    "Other",
                    at,
                ))
                .await
                .unwrap();
            }

            let stored = db.load_all().await;
            assert_eq!(stored[0].title, "Title 5");
            assert_eq!(stored[4].title, "Title 1");
        }

        #[tokio::test]
        async fn test_load_all_same_timestamp_keeps_insert_order() {
            let db = create_test_db().await;
            let batch = vec![
                create_article("First", "https://a.com", "AI", test_time()),
                create_article("Second", "https://b.com", "AI", test_time()),
            ];
            db.insert_batch(&batch).await;

            let stored = db.load_all().await;
            assert_eq!(stored[0].title, "First");
            assert_eq!(stored[1].title, "Second");
        }

        #[tokio::test]
        async fn test_new_rows_sort_among_existing_rows_of_the_same_day() {
            let db = create_test_db().await;
            let new_row = create_article("New", "https://new.com", "AI", test_time());
            let day = &new_row.date[..10];
            let existing = |title: &str, link: &str, time: &str| Article {
                date: format!("{} {}", day, time),
                ..create_article(title, link, "Other", test_time())
            };

            db.insert_if_absent(&existing("Late", "https://late.com", "23:59:59.999999"))
                .await
                .unwrap();
            db.insert_if_absent(&new_row).await.unwrap();
            db.insert_if_absent(&existing("Early", "https://early.com", "00:00:00.000000"))
                .await
                .unwrap();

            let titles: Vec<String> = db.load_all().await.into_iter().map(|a| a.title).collect();
            assert_eq!(titles, vec!["Late", "New", "Early"]);
        }

        #[tokio::test]
        async fn test_links_stay_unique() {
            let db = create_test_db().await;
            for round in 0..3 {
                let at = test_time() + Duration::minutes(round);
                let batch: Vec<Article> = (1..=5)
                    .map(|i| {
                        create_article(
                            &format!("Round {} item {}", round, i),
                            &format!("https://article{}.com", i),
                            "Other",
                            at,
                        )
                    })
                    .collect();
                db.insert_batch(&batch).await;
            }

            let stored = db.load_all().await;
            let mut links: Vec<&str> = stored.iter().map(|a| a.link.as_str()).collect();
            links.sort_unstable();
            links.dedup();
            assert_eq!(links.len(), stored.len());
            assert_eq!(stored.len(), 5);
        }
    }
}
