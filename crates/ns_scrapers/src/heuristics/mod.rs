//! Per-source lookup tables and the best-effort parsers that use them.
//! Every function here degrades to `None` instead of failing.

pub mod categories;
pub mod dates;

pub use categories::{CategoryTable, GUARDIAN_SECTIONS, NOVINKY_CATEGORIES};
pub use dates::{RelativeVocabulary, CZECH, ENGLISH};
