use std::sync::Arc;

use nb_core::{ArticleData, ArticleStorage, Error, Result};

pub mod backends;

pub use backends::*;

/// Author names as they should be linked: trimmed, non-empty, first-seen order.
pub(crate) fn author_names(article: &ArticleData) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in article.authors.iter().map(|a| a.trim()) {
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Open the named backend. `database` is only used by file-backed stores.
#[cfg_attr(not(feature = "sqlite"), allow(unused_variables))]
pub async fn create_storage(kind: &str, database: &str) -> Result<Arc<dyn ArticleStorage>> {
    match kind {
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(SQLiteStorage::new_with_path(database).await?)),
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(Error::Storage(
            "SQLite support not compiled in. Rebuild with --features sqlite".to_string(),
        )),
        other => Err(Error::Storage(format!(
            "Unknown storage backend: {}. Available backends: memory, sqlite",
            other
        ))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_storage;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_author_names() {
        let article = ArticleData {
            title: "t".to_string(),
            authors: vec![
                " Jane Doe ".to_string(),
                "".to_string(),
                "John Roe".to_string(),
                "Jane Doe".to_string(),
            ],
            date_published: Utc::now(),
            date_updated: None,
            hostname: "www.example.com".to_string(),
            url: "https://www.example.com/a".to_string(),
            text: "body".to_string(),
        };
        assert_eq!(author_names(&article), vec!["Jane Doe", "John Roe"]);
    }

    #[tokio::test]
    async fn test_create_storage() {
        assert!(create_storage("memory", "unused.db").await.is_ok());
        assert!(create_storage("qdrant", "unused.db").await.is_err());
    }

    #[cfg(not(feature = "sqlite"))]
    #[tokio::test]
    async fn test_sqlite_requires_feature() {
        let err = create_storage("sqlite", "unused.db").await.err().unwrap();
        assert!(matches!(err, Error::Storage(msg) if msg.contains("--features sqlite")));
    }
}
