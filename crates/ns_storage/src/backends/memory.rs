use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ns_core::{ArticleCatalog, ArticleRecord, Category, CategoryStore, Error, Result, RunLog, RunLogStore};
use tokio::sync::RwLock;

use crate::StorageBackend;

#[derive(Default)]
struct MemoryStore {
    articles: Vec<ArticleRecord>,
    categories: Vec<Category>,
    links: Vec<(i64, i64)>,
    logs: Vec<RunLog>,
    next_id: i64,
}

impl MemoryStore {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn create_article(&mut self, article: &ArticleRecord) -> Result<ArticleRecord> {
        if self.articles.iter().any(|a| a.url == article.url) {
            return Err(Error::Storage(format!("Article already exists: {}", article.url)));
        }
        let mut stored = article.clone();
        stored.id = self.allocate_id();
        self.articles.push(stored.clone());
        Ok(stored)
    }

    fn update_article(&mut self, article: &ArticleRecord) -> Result<ArticleRecord> {
        if self.articles.iter().any(|a| a.url == article.url && a.id != article.id) {
            return Err(Error::Storage(format!("Article already exists: {}", article.url)));
        }
        let existing = self
            .articles
            .iter_mut()
            .find(|a| a.id == article.id)
            .ok_or_else(|| Error::Storage(format!("Article {} not found", article.id)))?;
        *existing = article.clone();
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    fn associate(&mut self, article_id: i64, category_id: i64) -> Result<()> {
        if !self.articles.iter().any(|a| a.id == article_id) {
            return Err(Error::Storage(format!("Article {} not found", article_id)));
        }
        if !self.categories.iter().any(|c| c.id == category_id) {
            return Err(Error::Storage(format!("Category {} not found", category_id)));
        }
        if !self.links.contains(&(article_id, category_id)) {
            self.links.push((article_id, category_id));
        }
        Ok(())
    }

    fn categories_of(&self, article_id: i64) -> Vec<Category> {
        self.links
            .iter()
            .filter(|(a, _)| *a == article_id)
            .filter_map(|(_, c)| self.categories.iter().find(|cat| cat.id == *c).cloned())
            .collect()
    }

    fn get_or_create_category(&mut self, name: &str) -> (Category, bool) {
        if let Some(existing) = self.categories.iter().find(|c| c.name == name) {
            return (existing.clone(), false);
        }
        let mut category = Category::new(name);
        category.id = self.allocate_id();
        self.categories.push(category.clone());
        (category, true)
    }
}

/// Process-local catalog. Everything is lost when the process exits.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn article_count(&self) -> usize {
        self.store.read().await.articles.len()
    }

    pub async fn category_count(&self) -> usize {
        self.store.read().await.categories.len()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn open(_location: Option<&Path>) -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl ArticleCatalog for InMemoryStorage {
    async fn get_by_url(&self, url: &str) -> Result<Option<ArticleRecord>> {
        let store = self.store.read().await;
        Ok(store.articles.iter().find(|a| a.url == url).cloned())
    }

    async fn create(&self, article: &ArticleRecord) -> Result<ArticleRecord> {
        self.store.write().await.create_article(article)
    }

    async fn update(&self, article: &ArticleRecord) -> Result<ArticleRecord> {
        self.store.write().await.update_article(article)
    }

    async fn associate_category(&self, article_id: i64, category_id: i64) -> Result<()> {
        self.store.write().await.associate(article_id, category_id)
    }

    async fn categories_of(&self, article_id: i64) -> Result<Vec<Category>> {
        Ok(self.store.read().await.categories_of(article_id))
    }
}

#[async_trait]
impl CategoryStore for InMemoryStorage {
    async fn get_or_create_by_name(&self, name: &str) -> Result<(Category, bool)> {
        Ok(self.store.write().await.get_or_create_category(name))
    }
}

#[async_trait]
impl RunLogStore for InMemoryStorage {
    async fn create_log(&self, log: &RunLog) -> Result<RunLog> {
        let mut store = self.store.write().await;
        let mut stored = log.clone();
        stored.id = store.allocate_id();
        store.logs.push(stored.clone());
        Ok(stored)
    }

    async fn update_log_by_id(&self, log: &RunLog) -> Result<()> {
        let mut store = self.store.write().await;
        let existing = store
            .logs
            .iter_mut()
            .find(|l| l.id == log.id)
            .ok_or_else(|| Error::Storage(format!("Run log {} not found", log.id)))?;
        *existing = log.clone();
        Ok(())
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<RunLog>> {
        let store = self.store.read().await;
        let mut logs = store.logs.clone();
        logs.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        Ok(logs.into_iter().take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_lookup_article() {
        let storage = InMemoryStorage::new();
        let article = ArticleRecord::new("https://example.com/a", 1);

        let stored = storage.create(&article).await.unwrap();
        assert!(stored.id > 0);

        let found = storage.get_by_url("https://example.com/a").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(stored.id));
        assert!(storage.get_by_url("https://example.com/b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_url_uniqueness_is_enforced() {
        let storage = InMemoryStorage::new();
        let article = ArticleRecord::new("https://example.com/a", 1);
        storage.create(&article).await.unwrap();

        let duplicate = storage.create(&article).await;
        assert!(matches!(duplicate, Err(Error::Storage(_))));
        assert_eq!(storage.article_count().await, 1);
    }

    #[tokio::test]
    async fn test_update_bumps_updated_at() {
        let storage = InMemoryStorage::new();
        let mut stored = storage.create(&ArticleRecord::new("https://example.com/a", 1)).await.unwrap();
        let created_at = stored.updated_at;

        stored.title = "New title".to_string();
        let updated = storage.update(&stored).await.unwrap();
        assert_eq!(updated.title, "New title");
        assert!(updated.updated_at >= created_at);
    }

    #[tokio::test]
    async fn test_category_get_or_create_is_idempotent() {
        let storage = InMemoryStorage::new();
        let (first, created) = storage.get_or_create_by_name("UK News").await.unwrap();
        assert!(created);
        assert_eq!(first.slug, "uk-news");

        let (second, created) = storage.get_or_create_by_name("UK News").await.unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(storage.category_count().await, 1);
    }

    #[tokio::test]
    async fn test_associate_category_twice_is_noop() {
        let storage = InMemoryStorage::new();
        let article = storage.create(&ArticleRecord::new("https://example.com/a", 1)).await.unwrap();
        let (category, _) = storage.get_or_create_by_name("World").await.unwrap();

        storage.associate_category(article.id, category.id).await.unwrap();
        storage.associate_category(article.id, category.id).await.unwrap();

        let categories = storage.categories_of(article.id).await.unwrap();
        assert_eq!(categories, vec![category]);
    }

    #[tokio::test]
    async fn test_run_log_roundtrip() {
        let storage = InMemoryStorage::new();
        let mut log = storage.create_log(&RunLog::start(3)).await.unwrap();
        log.success = true;
        log.finished_at = Some(Utc::now());
        storage.update_log_by_id(&log).await.unwrap();

        let recent = storage.recent_logs(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert!(recent[0].success);
        assert!(recent[0].is_finished());
    }

    #[tokio::test]
    async fn test_update_unknown_log_fails() {
        let storage = InMemoryStorage::new();
        let mut log = RunLog::start(1);
        log.id = 42;
        assert!(storage.update_log_by_id(&log).await.is_err());
    }
}
