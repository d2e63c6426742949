use std::sync::Arc;

use ns_core::{Category, CategoryStore, Result};
use tracing::debug;

/// Maps free-text category names to stored categories, creating them on first sight.
pub struct CategoryResolver {
    store: Arc<dyn CategoryStore>,
}

impl CategoryResolver {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self { store }
    }

    /// Blank names resolve to `None`. The slug is derived only when the
    /// category is first created.
    pub async fn resolve(&self, name: &str) -> Result<Option<Category>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let (category, created) = self.store.get_or_create_by_name(name).await?;
        if created {
            debug!(name = %category.name, slug = %category.slug, "🏷️ Created category");
        }
        Ok(Some(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_storage::backends::memory::InMemoryStorage;

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let storage = Arc::new(InMemoryStorage::new());
        let resolver = CategoryResolver::new(storage.clone());

        let first = resolver.resolve("Válka na Ukrajině").await.unwrap().unwrap();
        let second = resolver.resolve("  Válka na Ukrajině ").await.unwrap().unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.slug, "válka-na-ukrajině");
        assert_eq!(storage.category_count().await, 1);
    }

    #[tokio::test]
    async fn test_blank_name_is_ignored() {
        let storage = Arc::new(InMemoryStorage::new());
        let resolver = CategoryResolver::new(storage.clone());
        assert!(resolver.resolve("   ").await.unwrap().is_none());
        assert_eq!(storage.category_count().await, 0);
    }
}
