use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use nb_core::{
    ArticleAnalysis, ArticleData, ArticleScores, ArticleStorage, DedupeReport, EntityBias,
    EntityKind, EntityRef, Error, Journalist, Publication, PublicationMetadata, Result,
    StoredArticle,
};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::author_names;

#[derive(Debug, Clone)]
struct ArticleRecord {
    id: String,
    publication_id: String,
    title: String,
    author_ids: Vec<String>,
    date_published: chrono::DateTime<Utc>,
    date_updated: Option<chrono::DateTime<Utc>>,
    hostname: String,
    url: String,
    text: String,
    created_at: chrono::DateTime<Utc>,
}

/// Publications and journalists keep insertion order so "oldest" is stable
/// even when two rows share a timestamp.
#[derive(Debug, Default)]
struct MemoryStore {
    publications: Vec<Publication>,
    journalists: Vec<Journalist>,
    articles: HashMap<String, ArticleRecord>,
    analyses: HashMap<String, ArticleAnalysis>,
    entity_bias: Vec<EntityBias>,
}

impl MemoryStore {
    fn publication_for_hostname(&mut self, hostname: &str) -> String {
        if let Some(existing) = self
            .publications
            .iter()
            .filter(|p| p.hostname == hostname)
            .min_by_key(|p| p.created_at)
        {
            return existing.id.clone();
        }

        let publication = Publication {
            id: Uuid::new_v4().to_string(),
            hostname: hostname.to_string(),
            name: None,
            date_founded: None,
            metadata_checked_at: None,
            created_at: Utc::now(),
        };
        let id = publication.id.clone();
        self.publications.push(publication);
        id
    }

    fn journalist_for_name(&mut self, name: &str, publication_id: &str) -> String {
        if let Some(existing) = self
            .journalists
            .iter()
            .find(|j| j.name == name && j.publication_id.as_deref() == Some(publication_id))
        {
            return existing.id.clone();
        }

        let journalist = Journalist {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            publication_id: Some(publication_id.to_string()),
            created_at: Utc::now(),
        };
        let id = journalist.id.clone();
        self.journalists.push(journalist);
        id
    }

    fn to_stored(&self, record: &ArticleRecord) -> StoredArticle {
        let authors = record
            .author_ids
            .iter()
            .filter_map(|id| self.journalists.iter().find(|j| &j.id == id).cloned())
            .collect();

        StoredArticle {
            id: record.id.clone(),
            publication_id: record.publication_id.clone(),
            title: record.title.clone(),
            authors,
            date_published: record.date_published,
            date_updated: record.date_updated,
            hostname: record.hostname.clone(),
            url: record.url.clone(),
            text: record.text.clone(),
            created_at: record.created_at,
        }
    }

    fn remove_article(&mut self, id: &str) -> bool {
        self.analyses.remove(id);
        self.articles.remove(id).is_some()
    }
}

/// Process-local storage. Everything is lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    store: RwLock<MemoryStore>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStorage for MemoryStorage {
    async fn upsert_article(&self, article: &ArticleData) -> Result<StoredArticle> {
        let mut store = self.store.write().await;

        let publication_id = store.publication_for_hostname(&article.hostname);
        let author_ids = author_names(article)
            .iter()
            .map(|name| store.journalist_for_name(name, &publication_id))
            .collect::<Vec<_>>();

        let existing = store
            .articles
            .values()
            .find(|a| a.url == article.url)
            .map(|a| (a.id.clone(), a.created_at));
        let (id, created_at) = existing.unwrap_or_else(|| (Uuid::new_v4().to_string(), Utc::now()));

        let record = ArticleRecord {
            id: id.clone(),
            publication_id,
            title: article.title.clone(),
            author_ids,
            date_published: article.date_published,
            date_updated: article.date_updated,
            hostname: article.hostname.clone(),
            url: article.url.clone(),
            text: article.text.clone(),
            created_at,
        };
        let stored = store.to_stored(&record);
        store.articles.insert(id, record);
        Ok(stored)
    }

    async fn get_article(&self, id: &str) -> Result<Option<StoredArticle>> {
        let store = self.store.read().await;
        Ok(store.articles.get(id).map(|record| store.to_stored(record)))
    }

    async fn get_article_by_url(&self, url: &str) -> Result<Option<StoredArticle>> {
        let store = self.store.read().await;
        Ok(store
            .articles
            .values()
            .find(|a| a.url == url)
            .map(|record| store.to_stored(record)))
    }

    async fn list_articles(&self) -> Result<Vec<StoredArticle>> {
        let store = self.store.read().await;
        let mut articles: Vec<StoredArticle> = store
            .articles
            .values()
            .map(|record| store.to_stored(record))
            .collect();
        articles.sort_by(|a, b| b.date_published.cmp(&a.date_published));
        Ok(articles)
    }

    async fn list_article_texts(&self, offset: usize, limit: usize) -> Result<Vec<(String, String)>> {
        let store = self.store.read().await;
        let mut records: Vec<&ArticleRecord> = store.articles.values().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|record| (record.id.clone(), record.text.clone()))
            .collect())
    }

    async fn delete_article(&self, id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        if store.remove_article(id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("article {}", id)))
        }
    }

    async fn update_article_text(&self, id: &str, text: &str) -> Result<()> {
        let mut store = self.store.write().await;
        let record = store
            .articles
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("article {}", id)))?;
        record.text = text.to_string();
        Ok(())
    }

    async fn store_article_analysis(&self, article_id: &str, analysis: &ArticleAnalysis) -> Result<()> {
        let mut store = self.store.write().await;
        if !store.articles.contains_key(article_id) {
            return Err(Error::NotFound(format!("article {}", article_id)));
        }
        store.analyses.insert(article_id.to_string(), analysis.clone());
        Ok(())
    }

    async fn get_article_analysis(&self, article_id: &str) -> Result<Option<ArticleAnalysis>> {
        let store = self.store.read().await;
        Ok(store.analyses.get(article_id).cloned())
    }

    async fn get_journalist(&self, id: &str) -> Result<Option<Journalist>> {
        let store = self.store.read().await;
        Ok(store.journalists.iter().find(|j| j.id == id).cloned())
    }

    async fn get_publication(&self, id: &str) -> Result<Option<Publication>> {
        let store = self.store.read().await;
        Ok(store.publications.iter().find(|p| p.id == id).cloned())
    }

    async fn update_publication_metadata(&self, id: &str, metadata: &PublicationMetadata) -> Result<()> {
        let mut store = self.store.write().await;
        let publication = store
            .publications
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("publication {}", id)))?;
        publication.name = metadata.name.clone();
        publication.date_founded = metadata.date_founded;
        publication.metadata_checked_at = Some(Utc::now());
        Ok(())
    }

    async fn entity_scores(&self, entity: &EntityRef) -> Result<Vec<ArticleScores>> {
        let store = self.store.read().await;
        let mut scores: Vec<ArticleScores> = store
            .articles
            .values()
            .filter(|a| match entity.kind {
                EntityKind::Journalist => a.author_ids.contains(&entity.id),
                EntityKind::Publication => a.publication_id == entity.id,
            })
            .map(|a| {
                let analysis = store.analyses.get(&a.id);
                ArticleScores {
                    article_id: a.id.clone(),
                    date_published: a.date_published,
                    polarization: analysis.map(|s| s.polarization),
                    objectivity: analysis.map(|s| s.objectivity),
                    summary: analysis.map(|s| s.summary.clone()),
                }
            })
            .collect();
        scores.sort_by(|a, b| b.date_published.cmp(&a.date_published));
        Ok(scores)
    }

    async fn find_entity_bias(&self, entity: &EntityRef, num_articles: usize) -> Result<Option<EntityBias>> {
        let store = self.store.read().await;
        Ok(store
            .entity_bias
            .iter()
            .rev()
            .find(|b| &b.entity == entity && b.num_articles_analyzed == num_articles)
            .cloned())
    }

    async fn store_entity_bias(&self, bias: &EntityBias) -> Result<()> {
        let mut store = self.store.write().await;
        store.entity_bias.push(bias.clone());
        Ok(())
    }

    async fn dedupe_publications(&self) -> Result<DedupeReport> {
        let mut store = self.store.write().await;
        let mut report = DedupeReport::default();

        let mut seen = HashSet::new();
        let duplicated: Vec<String> = store
            .publications
            .iter()
            .filter(|p| !seen.insert(p.hostname.clone()))
            .map(|p| p.hostname.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        for hostname in duplicated {
            let mut group: Vec<Publication> = store
                .publications
                .iter()
                .filter(|p| p.hostname == hostname)
                .cloned()
                .collect();
            group.sort_by_key(|p| p.created_at);
            let Some((keep, others)) = group.split_first() else {
                continue;
            };
            report.hostnames += 1;

            for other in others {
                for journalist in store.journalists.iter_mut() {
                    if journalist.publication_id.as_deref() == Some(other.id.as_str()) {
                        journalist.publication_id = Some(keep.id.clone());
                    }
                }

                let doomed: Vec<String> = store
                    .articles
                    .values()
                    .filter(|a| a.publication_id == other.id)
                    .map(|a| a.id.clone())
                    .collect();
                for id in doomed {
                    if store.remove_article(&id) {
                        report.articles_removed += 1;
                    }
                }

                let publication = EntityRef::publication(other.id.clone());
                store.entity_bias.retain(|b| b.entity != publication);
                store.publications.retain(|p| p.id != other.id);
                report.publications_removed += 1;
            }

            info!(hostname = %hostname, kept = %keep.id, removed = others.len(), "Deduplicated publication");
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    fn article(url: &str, authors: &[&str], day: u32) -> ArticleData {
        ArticleData {
            title: "Test Article".to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            date_published: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            date_updated: None,
            hostname: "www.example.com".to_string(),
            url: url.to_string(),
            text: "This is a test article about politics.".to_string(),
        }
    }

    fn analysis(polarization: f64) -> ArticleAnalysis {
        ArticleAnalysis {
            summary: format!("summary {}", polarization),
            summary_footnotes: BTreeMap::new(),
            polarization,
            polarization_analysis: String::new(),
            polarization_footnotes: BTreeMap::new(),
            objectivity: 60.0,
            objectivity_analysis: String::new(),
            objectivity_footnotes: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_unique_per_url() {
        let storage = MemoryStorage::new();
        let first = storage
            .upsert_article(&article("https://www.example.com/a", &["Jane Doe", "John Roe"], 1))
            .await
            .unwrap();
        assert_eq!(first.authors.len(), 2);

        let mut updated = article("https://www.example.com/a", &["Jane Doe"], 1);
        updated.title = "Updated".to_string();
        let second = storage.upsert_article(&updated).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.publication_id, second.publication_id);
        assert_eq!(second.title, "Updated");
        assert_eq!(second.authors.len(), 1);
        assert_eq!(second.authors[0].id, first.authors[0].id);
        assert_eq!(storage.list_articles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_entity_scores_newest_first() {
        let storage = MemoryStorage::new();
        let old = storage
            .upsert_article(&article("https://www.example.com/old", &["Jane Doe"], 1))
            .await
            .unwrap();
        let new = storage
            .upsert_article(&article("https://www.example.com/new", &["Jane Doe"], 5))
            .await
            .unwrap();
        storage.store_article_analysis(&old.id, &analysis(20.0)).await.unwrap();

        let journalist = EntityRef::journalist(old.authors[0].id.clone());
        let scores = storage.entity_scores(&journalist).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].article_id, new.id);
        assert_eq!(scores[0].polarization, None);
        assert_eq!(scores[1].polarization, Some(20.0));

        let publication = EntityRef::publication(old.publication_id.clone());
        assert_eq!(storage.entity_scores(&publication).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_rows() {
        let storage = MemoryStorage::new();
        assert!(storage.get_article("nope").await.unwrap().is_none());
        assert!(matches!(
            storage.delete_article("nope").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            storage.update_article_text("nope", "text").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            storage.store_article_analysis("nope", &analysis(1.0)).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_dedupe_keeps_oldest_publication() {
        let storage = MemoryStorage::new();
        let kept = storage
            .upsert_article(&article("https://www.example.com/a", &["Jane Doe"], 1))
            .await
            .unwrap();

        // Simulate a duplicate row created by an earlier race.
        let duplicate_id = {
            let mut store = storage.store.write().await;
            let duplicate = Publication {
                id: "duplicate".to_string(),
                hostname: "www.example.com".to_string(),
                name: None,
                date_founded: None,
                metadata_checked_at: None,
                created_at: Utc::now() + Duration::seconds(5),
            };
            store.publications.push(duplicate.clone());
            store.journalists.push(Journalist {
                id: "moved".to_string(),
                name: "John Roe".to_string(),
                publication_id: Some(duplicate.id.clone()),
                created_at: Utc::now(),
            });
            store.articles.insert(
                "orphan".to_string(),
                ArticleRecord {
                    id: "orphan".to_string(),
                    publication_id: duplicate.id.clone(),
                    title: "Orphan".to_string(),
                    author_ids: vec!["moved".to_string()],
                    date_published: Utc::now(),
                    date_updated: None,
                    hostname: duplicate.hostname.clone(),
                    url: "https://www.example.com/orphan".to_string(),
                    text: "text".to_string(),
                    created_at: Utc::now(),
                },
            );
            store.analyses.insert("orphan".to_string(), analysis(10.0));
            duplicate.id
        };

        let report = storage.dedupe_publications().await.unwrap();
        assert_eq!(
            report,
            DedupeReport {
                hostnames: 1,
                publications_removed: 1,
                articles_removed: 1,
            }
        );

        assert!(storage.get_publication(&duplicate_id).await.unwrap().is_none());
        assert!(storage.get_publication(&kept.publication_id).await.unwrap().is_some());
        assert!(storage.get_article("orphan").await.unwrap().is_none());
        assert!(storage.get_article_analysis("orphan").await.unwrap().is_none());
        let moved = storage.get_journalist("moved").await.unwrap().unwrap();
        assert_eq!(moved.publication_id, Some(kept.publication_id.clone()));

        let again = storage.dedupe_publications().await.unwrap();
        assert_eq!(again, DedupeReport::default());
    }

    #[tokio::test]
    async fn test_publication_metadata_update() {
        let storage = MemoryStorage::new();
        let stored = storage
            .upsert_article(&article("https://www.example.com/a", &[], 1))
            .await
            .unwrap();
        let metadata = PublicationMetadata {
            name: Some("Example".to_string()),
            date_founded: Some(Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap()),
        };
        storage
            .update_publication_metadata(&stored.publication_id, &metadata)
            .await
            .unwrap();
        let publication = storage
            .get_publication(&stored.publication_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(publication.name.as_deref(), Some("Example"));
        assert_eq!(publication.date_founded, metadata.date_founded);
        assert!(publication.metadata_checked_at.is_some());
    }

    #[tokio::test]
    async fn test_article_texts_are_paged() {
        let storage = MemoryStorage::new();
        for day in 1..=5 {
            storage
                .upsert_article(&article(&format!("https://www.example.com/{}", day), &[], day))
                .await
                .unwrap();
        }

        let first = storage.list_article_texts(0, 2).await.unwrap();
        let second = storage.list_article_texts(2, 2).await.unwrap();
        let last = storage.list_article_texts(4, 2).await.unwrap();
        assert_eq!((first.len(), second.len(), last.len()), (2, 2, 1));

        let mut ids: Vec<String> = first
            .into_iter()
            .chain(second)
            .chain(last)
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
        assert!(storage.list_article_texts(5, 2).await.unwrap().is_empty());
    }
}
