use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use ns_core::{ArticleCatalog, Catalog, CategoryStore, Error, Result, RunLogStore};
use tracing::info;

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn get_error_message() -> &'static str
    where
        Self: Sized;

    /// Open (or create) the backing store. `location` is backend specific.
    async fn open(location: Option<&Path>) -> Result<Self>
    where
        Self: Sized;
}

/// Names accepted by [`create_catalog`]
pub fn available_backends() -> Vec<&'static str> {
    let mut names = vec!["memory"];
    if cfg!(feature = "sqlite") {
        names.push("sqlite");
    }
    names
}

async fn open_backend<B>(location: Option<&Path>) -> Result<Catalog>
where
    B: StorageBackend + ArticleCatalog + CategoryStore + RunLogStore + 'static,
{
    let backend = B::open(location)
        .await
        .map_err(|e| Error::Storage(format!("{} ({})", B::get_error_message(), e)))?;
    Ok(Catalog::from_backend(Arc::new(backend)))
}

pub async fn create_catalog(kind: &str, location: Option<&Path>) -> Result<Catalog> {
    let catalog = match kind {
        "memory" => open_backend::<InMemoryStorage>(location).await?,
        #[cfg(feature = "sqlite")]
        "sqlite" => open_backend::<SQLiteStorage>(location).await?,
        other => {
            return Err(Error::Config(format!(
                "Unknown storage backend '{}', expected one of: {}",
                other,
                available_backends().join(", ")
            )))
        }
    };
    info!(backend = kind, "🏦 Storage backend initialized");
    Ok(catalog)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_catalog, StorageBackend};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_catalog() {
        let catalog = create_catalog("memory", None).await.unwrap();
        assert!(catalog.articles.get_by_url("https://example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_backend_is_config_error() {
        let result = create_catalog("qdrant", None).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
