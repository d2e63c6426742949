use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{ArticleRecord, Category, RunLog};
use crate::Result;

/// Persisted article catalog. Implementations must keep `url` unique.
#[async_trait]
pub trait ArticleCatalog: Send + Sync {
    /// Look up an article by its absolute URL
    async fn get_by_url(&self, url: &str) -> Result<Option<ArticleRecord>>;

    /// Insert a new article and return it with its assigned id
    async fn create(&self, article: &ArticleRecord) -> Result<ArticleRecord>;

    /// Overwrite an existing article, bumping `updated_at`
    async fn update(&self, article: &ArticleRecord) -> Result<ArticleRecord>;

    /// Link a category to an article. Linking twice is a no-op.
    async fn associate_category(&self, article_id: i64, category_id: i64) -> Result<()>;

    /// Categories linked to an article, in link order
    async fn categories_of(&self, article_id: i64) -> Result<Vec<Category>>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Returns the category with this name, creating it (and its slug) on first use.
    /// The flag is true when this call created it.
    async fn get_or_create_by_name(&self, name: &str) -> Result<(Category, bool)>;
}

#[async_trait]
pub trait RunLogStore: Send + Sync {
    async fn create_log(&self, log: &RunLog) -> Result<RunLog>;

    async fn update_log_by_id(&self, log: &RunLog) -> Result<()>;

    /// Most recent logs first
    async fn recent_logs(&self, limit: usize) -> Result<Vec<RunLog>>;
}

/// The three collaborators a scrape writes to, usually backed by one store.
#[derive(Clone)]
pub struct Catalog {
    pub articles: Arc<dyn ArticleCatalog>,
    pub categories: Arc<dyn CategoryStore>,
    pub run_logs: Arc<dyn RunLogStore>,
}

impl Catalog {
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ArticleCatalog + CategoryStore + RunLogStore + 'static,
    {
        Self {
            articles: backend.clone(),
            categories: backend.clone(),
            run_logs: backend,
        }
    }
}
