use std::path::Path;

use nb_core::{ArticleData, ArticleStorage, DedupeReport, Result};
use nb_parsers::{clean_article_text, ParserRegistry};
use serde::Serialize;
use tracing::info;

pub const CLEAN_BATCH_SIZE: usize = 50;
const PROGRESS_EVERY: usize = 10;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CleanTextReport {
    pub processed: usize,
    pub updated: usize,
    pub chars_saved: usize,
}

/// Re-run text cleanup over every stored article, one page of
/// `CLEAN_BATCH_SIZE` at a time.
pub async fn clean_text(storage: &dyn ArticleStorage) -> Result<CleanTextReport> {
    let mut report = CleanTextReport::default();

    loop {
        let batch = storage
            .list_article_texts(report.processed, CLEAN_BATCH_SIZE)
            .await?;
        let fetched = batch.len();

        for (id, text) in batch {
            let cleaned = clean_article_text(&text);
            if cleaned != text {
                storage.update_article_text(&id, &cleaned).await?;
                report.updated += 1;
                report.chars_saved += text
                    .chars()
                    .count()
                    .saturating_sub(cleaned.chars().count());
            }

            report.processed += 1;
            if report.processed % PROGRESS_EVERY == 0 {
                info!("Cleaned {} articles", report.processed);
            }
        }

        if fetched < CLEAN_BATCH_SIZE {
            break;
        }
    }

    info!(
        processed = report.processed,
        updated = report.updated,
        chars_saved = report.chars_saved,
        "Text cleanup finished"
    );
    Ok(report)
}

pub async fn dedupe_publications(storage: &dyn ArticleStorage) -> Result<DedupeReport> {
    let report = storage.dedupe_publications().await?;
    info!(
        hostnames = report.hostnames,
        publications_removed = report.publications_removed,
        articles_removed = report.articles_removed,
        "Publication dedupe finished"
    );
    Ok(report)
}

/// Parse a saved page once, without storing it.
pub async fn parse_file(registry: &ParserRegistry, url: &str, file: &Path) -> Result<ArticleData> {
    let html = tokio::fs::read_to_string(file).await?;
    registry.parse(url, &html).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nb_inference::models::dummy::DummyModel;
    use nb_storage::MemoryStorage;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn article(url: &str, text: &str) -> ArticleData {
        ArticleData {
            title: "Title".to_string(),
            authors: vec![],
            date_published: Utc::now(),
            date_updated: None,
            hostname: "www.example.com".to_string(),
            url: url.to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_clean_text() {
        let storage = MemoryStorage::new();
        let dirty = storage
            .upsert_article(&article("https://www.example.com/a", "Some   <b>bold</b>\u{200B} text "))
            .await
            .unwrap();
        storage
            .upsert_article(&article("https://www.example.com/b", "Already clean"))
            .await
            .unwrap();

        let report = clean_text(&storage).await.unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.updated, 1);
        assert!(report.chars_saved > 0);

        let cleaned = storage.get_article(&dirty.id).await.unwrap().unwrap();
        assert_eq!(cleaned.text, "Some bold text");

        let again = clean_text(&storage).await.unwrap();
        assert_eq!(again.updated, 0);
    }

    #[tokio::test]
    async fn test_clean_text_pages_through_every_article() {
        let storage = MemoryStorage::new();
        let total = CLEAN_BATCH_SIZE * 2 + 7;
        for i in 0..total {
            storage
                .upsert_article(&article(&format!("https://www.example.com/{}", i), "Body  <i>text</i>"))
                .await
                .unwrap();
        }

        let report = clean_text(&storage).await.unwrap();
        assert_eq!(report.processed, total);
        assert_eq!(report.updated, total);

        let page = storage.list_article_texts(0, total + 1).await.unwrap();
        assert_eq!(page.len(), total);
        assert!(page.iter().all(|(_, text)| text == "Body text"));
    }

    #[tokio::test]
    async fn test_parse_file_with_rule_based_parser() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("page.html");
        std::fs::write(
            &file,
            r#"<title>Headline | CNN</title>
               <span class="byline__name">Jane Doe</span>
               <div class="article__content-container"><p>Body.</p></div>"#,
        )
        .unwrap();

        let registry = ParserRegistry::new(Arc::new(DummyModel::new())).with_rule_based(true);
        let parsed = parse_file(&registry, "https://www.cnn.com/story", &file)
            .await
            .unwrap();
        assert_eq!(parsed.title, "Headline");
        assert_eq!(parsed.authors, vec!["Jane Doe"]);
        assert_eq!(parsed.text, "Body.");
    }
}
