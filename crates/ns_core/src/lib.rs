pub mod error;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use storage::{ArticleCatalog, Catalog, CategoryStore, RunLogStore};
pub use types::{slugify_category, ArticleRecord, ArticleStub, Category, RunLog, Source};
