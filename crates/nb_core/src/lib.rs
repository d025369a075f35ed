pub mod error;
pub mod models;
pub mod storage;
pub mod types;
pub mod utils;

pub use error::{Error, Result};
pub use models::{LanguageModel, StructuredRequest};
pub use storage::ArticleStorage;
pub use types::*;
