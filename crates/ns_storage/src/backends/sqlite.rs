use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ns_core::{ArticleCatalog, ArticleRecord, Category, CategoryStore, Error, Result, RunLog, RunLogStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::debug;

use crate::StorageBackend;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        source_id INTEGER NOT NULL,
        summary TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL DEFAULT '',
        image_url TEXT NOT NULL DEFAULT '',
        published_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_articles_source_published
        ON articles (source_id, published_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        slug TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS article_categories (
        article_id INTEGER NOT NULL REFERENCES articles (id),
        category_id INTEGER NOT NULL REFERENCES categories (id),
        PRIMARY KEY (article_id, category_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS scraping_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_id INTEGER NOT NULL,
        started_at TEXT NOT NULL,
        finished_at TEXT,
        articles_found INTEGER NOT NULL DEFAULT 0,
        articles_added INTEGER NOT NULL DEFAULT 0,
        articles_updated INTEGER NOT NULL DEFAULT 0,
        errors TEXT NOT NULL DEFAULT '',
        success INTEGER NOT NULL DEFAULT 0
    )
    "#,
];

const DEFAULT_DB_PATH: &str = "articles.db";

pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be available at ./articles.db"
    }

    async fn open(location: Option<&Path>) -> Result<Self> {
        let db_path = location
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        Self::new_with_path(&db_path).await
    }
}

fn storage_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::Storage(format!("{}: {}", context, e))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("Failed to parse date '{}': {}", value, e)))
}

fn article_from_row(row: &SqliteRow) -> Result<ArticleRecord> {
    let published_at: Option<String> = row.try_get("published_at").map_err(storage_error("Failed to read article"))?;
    let created_at: String = row.try_get("created_at").map_err(storage_error("Failed to read article"))?;
    let updated_at: String = row.try_get("updated_at").map_err(storage_error("Failed to read article"))?;

    Ok(ArticleRecord {
        id: row.try_get("id").map_err(storage_error("Failed to read article"))?,
        url: row.try_get("url").map_err(storage_error("Failed to read article"))?,
        title: row.try_get("title").map_err(storage_error("Failed to read article"))?,
        source_id: row.try_get("source_id").map_err(storage_error("Failed to read article"))?,
        summary: row.try_get("summary").map_err(storage_error("Failed to read article"))?,
        content: row.try_get("content").map_err(storage_error("Failed to read article"))?,
        image_url: row.try_get("image_url").map_err(storage_error("Failed to read article"))?,
        published_at: published_at.as_deref().map(parse_timestamp).transpose()?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn category_from_row(row: &SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id").map_err(storage_error("Failed to read category"))?,
        name: row.try_get("name").map_err(storage_error("Failed to read category"))?,
        slug: row.try_get("slug").map_err(storage_error("Failed to read category"))?,
    })
}

fn run_log_from_row(row: &SqliteRow) -> Result<RunLog> {
    let started_at: String = row.try_get("started_at").map_err(storage_error("Failed to read run log"))?;
    let finished_at: Option<String> = row.try_get("finished_at").map_err(storage_error("Failed to read run log"))?;
    let found: i64 = row.try_get("articles_found").map_err(storage_error("Failed to read run log"))?;
    let added: i64 = row.try_get("articles_added").map_err(storage_error("Failed to read run log"))?;
    let updated: i64 = row.try_get("articles_updated").map_err(storage_error("Failed to read run log"))?;

    Ok(RunLog {
        id: row.try_get("id").map_err(storage_error("Failed to read run log"))?,
        source_id: row.try_get("source_id").map_err(storage_error("Failed to read run log"))?,
        started_at: parse_timestamp(&started_at)?,
        finished_at: finished_at.as_deref().map(parse_timestamp).transpose()?,
        articles_found: found.max(0) as u32,
        articles_added: added.max(0) as u32,
        articles_updated: updated.max(0) as u32,
        errors: row.try_get("errors").map_err(storage_error("Failed to read run log"))?,
        success: row.try_get("success").map_err(storage_error("Failed to read run log"))?,
    })
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
            .map_err(storage_error("Invalid database path"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(storage_error("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }
        debug!(path = %db_path.display(), "SQLite catalog ready");

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    async fn get_by_id(&self, id: i64) -> Result<ArticleRecord> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to load article"))?
            .ok_or_else(|| Error::Storage(format!("Article {} not found", id)))?;
        article_from_row(&row)
    }
}

#[async_trait]
impl ArticleCatalog for SQLiteStorage {
    async fn get_by_url(&self, url: &str) -> Result<Option<ArticleRecord>> {
        let row = sqlx::query("SELECT * FROM articles WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to look up article"))?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn create(&self, article: &ArticleRecord) -> Result<ArticleRecord> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO articles
            (url, title, source_id, summary, content, image_url, published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.url)
        .bind(&article.title)
        .bind(article.source_id)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(&article.image_url)
        .bind(article.published_at.map(|dt| dt.to_rfc3339()))
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to store article"))?;

        self.get_by_id(result.last_insert_rowid()).await
    }

    async fn update(&self, article: &ArticleRecord) -> Result<ArticleRecord> {
        let result = sqlx::query(
            r#"
            UPDATE articles
            SET url = ?, title = ?, source_id = ?, summary = ?, content = ?,
                image_url = ?, published_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&article.url)
        .bind(&article.title)
        .bind(article.source_id)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(&article.image_url)
        .bind(article.published_at.map(|dt| dt.to_rfc3339()))
        .bind(Utc::now().to_rfc3339())
        .bind(article.id)
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to update article"))?;

        if result.rows_affected() == 0 {
            return Err(Error::Storage(format!("Article {} not found", article.id)));
        }
        self.get_by_id(article.id).await
    }

    async fn associate_category(&self, article_id: i64, category_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO article_categories (article_id, category_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(category_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error("Failed to link category"))?;
        Ok(())
    }

    async fn categories_of(&self, article_id: i64) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.name, c.slug FROM categories c
            JOIN article_categories ac ON ac.category_id = c.id
            WHERE ac.article_id = ?
            ORDER BY ac.rowid
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("Failed to load categories"))?;

        rows.iter().map(category_from_row).collect()
    }
}

#[async_trait]
impl CategoryStore for SQLiteStorage {
    async fn get_or_create_by_name(&self, name: &str) -> Result<(Category, bool)> {
        let existing = sqlx::query("SELECT id, name, slug FROM categories WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to load category"))?;
        if let Some(row) = existing {
            return Ok((category_from_row(&row)?, false));
        }

        let candidate = Category::new(name);
        let inserted = sqlx::query("INSERT OR IGNORE INTO categories (name, slug) VALUES (?, ?)")
            .bind(&candidate.name)
            .bind(&candidate.slug)
            .execute(&self.pool)
            .await
            .map_err(storage_error("Failed to create category"))?;

        let row = sqlx::query("SELECT id, name, slug FROM categories WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error("Failed to load category"))?;

        Ok((category_from_row(&row)?, inserted.rows_affected() == 1))
    }
}

#[async_trait]
impl RunLogStore for SQLiteStorage {
    async fn create_log(&self, log: &RunLog) -> Result<RunLog> {
        let result = sqlx::query(
            r#"
            INSERT INTO scraping_logs
            (source_id, started_at, finished_at, articles_found, articles_added, articles_updated, errors, success)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(log.source_id)
        .bind(log.started_at.to_rfc3339())
        .bind(log.finished_at.map(|dt| dt.to_rfc3339()))
        .bind(i64::from(log.articles_found))
        .bind(i64::from(log.articles_added))
        .bind(i64::from(log.articles_updated))
        .bind(&log.errors)
        .bind(log.success)
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to create run log"))?;

        let mut stored = log.clone();
        stored.id = result.last_insert_rowid();
        Ok(stored)
    }

    async fn update_log_by_id(&self, log: &RunLog) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE scraping_logs
            SET finished_at = ?, articles_found = ?, articles_added = ?, articles_updated = ?,
                errors = ?, success = ?
            WHERE id = ?
            "#,
        )
        .bind(log.finished_at.map(|dt| dt.to_rfc3339()))
        .bind(i64::from(log.articles_found))
        .bind(i64::from(log.articles_added))
        .bind(i64::from(log.articles_updated))
        .bind(&log.errors)
        .bind(log.success)
        .bind(log.id)
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to update run log"))?;

        if result.rows_affected() == 0 {
            return Err(Error::Storage(format!("Run log {} not found", log.id)));
        }
        Ok(())
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<RunLog>> {
        let rows = sqlx::query("SELECT * FROM scraping_logs ORDER BY started_at DESC, id DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("Failed to load run logs"))?;

        rows.iter().map(run_log_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_sqlite_article_upsert_flow() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let storage = SQLiteStorage::new_with_path(&db_path).await.unwrap();

        let mut article = ArticleRecord::new("https://example.com/a", 1);
        article.title = "Test Article".to_string();
        let stored = storage.create(&article).await.unwrap();
        assert!(stored.id > 0);
        assert!(stored.published_at.is_none());

        let mut found = storage.get_by_url("https://example.com/a").await.unwrap().unwrap();
        found.content = "Body".to_string();
        found.published_at = Some(Utc::now());
        let updated = storage.update(&found).await.unwrap();
        assert_eq!(updated.content, "Body");
        assert!(updated.published_at.is_some());

        // URL uniqueness comes from the schema
        assert!(storage.create(&article).await.is_err());
    }

    #[tokio::test]
    async fn test_sqlite_categories() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("test.db")).await.unwrap();
        let article = storage.create(&ArticleRecord::new("https://example.com/a", 1)).await.unwrap();

        let (world, created) = storage.get_or_create_by_name("World").await.unwrap();
        assert!(created);
        let (again, created) = storage.get_or_create_by_name("World").await.unwrap();
        assert!(!created);
        assert_eq!(world.id, again.id);

        let (europe, _) = storage.get_or_create_by_name("Europe").await.unwrap();
        storage.associate_category(article.id, world.id).await.unwrap();
        storage.associate_category(article.id, europe.id).await.unwrap();
        storage.associate_category(article.id, world.id).await.unwrap();

        let names: Vec<String> = storage
            .categories_of(article.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["World", "Europe"]);
    }

    #[tokio::test]
    async fn test_sqlite_run_logs() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("nested/dir/test.db")).await.unwrap();

        let mut log = storage.create_log(&RunLog::start(2)).await.unwrap();
        log.articles_found = 4;
        log.articles_added = 3;
        log.errors = "error processing https://example.com/x: boom".to_string();
        log.finished_at = Some(Utc::now());
        storage.update_log_by_id(&log).await.unwrap();

        let recent = storage.recent_logs(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].articles_found, 4);
        assert_eq!(recent[0].articles_added, 3);
        assert!(recent[0].is_finished());
        assert!(!recent[0].success);
    }
}
