use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use nb_core::{
    ArticleAnalysis, ArticleData, ArticleScores, ArticleStorage, DedupeReport, EntityBias,
    EntityKind, EntityRef, Error, Journalist, Publication, PublicationMetadata, Result,
    StoredArticle,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::author_names;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS publications (
        id TEXT PRIMARY KEY,
        hostname TEXT NOT NULL,
        name TEXT,
        date_founded TEXT,
        metadata_checked_at TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS journalists (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        publication_id TEXT REFERENCES publications(id),
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        publication_id TEXT NOT NULL REFERENCES publications(id),
        title TEXT NOT NULL,
        date_published TEXT NOT NULL,
        date_updated TEXT,
        hostname TEXT NOT NULL,
        url TEXT NOT NULL UNIQUE,
        text TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS article_authors (
        article_id TEXT NOT NULL REFERENCES articles(id),
        journalist_id TEXT NOT NULL REFERENCES journalists(id),
        position INTEGER NOT NULL,
        PRIMARY KEY (article_id, journalist_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS article_analysis (
        article_id TEXT PRIMARY KEY REFERENCES articles(id),
        summary TEXT NOT NULL,
        summary_footnotes TEXT NOT NULL,
        polarization REAL NOT NULL,
        polarization_analysis TEXT NOT NULL,
        polarization_footnotes TEXT NOT NULL,
        objectivity REAL NOT NULL,
        objectivity_analysis TEXT NOT NULL,
        objectivity_footnotes TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS entity_bias (
        id TEXT PRIMARY KEY,
        entity_kind TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        num_articles INTEGER NOT NULL,
        polarization REAL NOT NULL,
        objectivity REAL NOT NULL,
        analysis TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_publications_hostname ON publications(hostname)",
    "CREATE INDEX IF NOT EXISTS idx_entity_bias_entity ON entity_bias(entity_kind, entity_id)",
    // Add future migrations here
];

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| Error::Database(format!("{}: {}", context, e))
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn encode_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_date(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse date {}: {}", value, e)))
}

fn decode_optional_date(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(decode_date).transpose()
}

fn entity_kind_column(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Journalist => "journalist",
        EntityKind::Publication => "publication",
    }
}

fn footnotes_column(footnotes: &BTreeMap<String, String>) -> Result<String> {
    Ok(serde_json::to_string(footnotes)?)
}

fn footnotes_from_column(value: &str) -> Result<BTreeMap<String, String>> {
    Ok(serde_json::from_str(value)?)
}

fn publication_from_row(row: &SqliteRow) -> Result<Publication> {
    Ok(Publication {
        id: row.get("id"),
        hostname: row.get("hostname"),
        name: row.get("name"),
        date_founded: decode_optional_date(row.get("date_founded"))?,
        metadata_checked_at: decode_optional_date(row.get("metadata_checked_at"))?,
        created_at: decode_date(&row.get::<String, _>("created_at"))?,
    })
}

fn journalist_from_row(row: &SqliteRow) -> Result<Journalist> {
    Ok(Journalist {
        id: row.get("id"),
        name: row.get("name"),
        publication_id: row.get("publication_id"),
        created_at: decode_date(&row.get::<String, _>("created_at"))?,
    })
}

fn bias_from_row(row: &SqliteRow, entity: &EntityRef) -> Result<EntityBias> {
    Ok(EntityBias {
        id: row.get("id"),
        entity: entity.clone(),
        num_articles_analyzed: row.get::<i64, _>("num_articles") as usize,
        polarization: row.get("polarization"),
        objectivity: row.get("objectivity"),
        analysis: row.get("analysis"),
        created_at: decode_date(&row.get::<String, _>("created_at"))?,
    })
}

/// Removes an article together with its author links and analysis.
async fn delete_article_rows(tx: &mut Transaction<'_, Sqlite>, article_id: &str) -> Result<u64> {
    sqlx::query("DELETE FROM article_authors WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut **tx)
        .await
        .map_err(db_error("Failed to delete article authors"))?;
    sqlx::query("DELETE FROM article_analysis WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut **tx)
        .await
        .map_err(db_error("Failed to delete article analysis"))?;
    let result = sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(article_id)
        .execute(&mut **tx)
        .await
        .map_err(db_error("Failed to delete article"))?;
    Ok(result.rows_affected())
}

pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(db_error("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }

        info!(path = %db_path.display(), "SQLite storage ready");
        Ok(Self { pool, db_path })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    async fn authors_of(&self, article_id: &str) -> Result<Vec<Journalist>> {
        let rows = sqlx::query(
            r#"
            SELECT j.id, j.name, j.publication_id, j.created_at
            FROM article_authors aa
            JOIN journalists j ON j.id = aa.journalist_id
            WHERE aa.article_id = ?
            ORDER BY aa.position
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load article authors"))?;

        rows.iter().map(journalist_from_row).collect()
    }

    async fn article_from_row(&self, row: &SqliteRow) -> Result<StoredArticle> {
        let id: String = row.get("id");
        let authors = self.authors_of(&id).await?;
        Ok(StoredArticle {
            publication_id: row.get("publication_id"),
            title: row.get("title"),
            authors,
            date_published: decode_date(&row.get::<String, _>("date_published"))?,
            date_updated: decode_optional_date(row.get("date_updated"))?,
            hostname: row.get("hostname"),
            url: row.get("url"),
            text: row.get("text"),
            created_at: decode_date(&row.get::<String, _>("created_at"))?,
            id,
        })
    }

    async fn find_article(&self, column: &'static str, value: &str) -> Result<Option<StoredArticle>> {
        let sql = format!("SELECT * FROM articles WHERE {} = ?", column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load article"))?;
        match row {
            Some(row) => Ok(Some(self.article_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    async fn publication_for_hostname(tx: &mut Transaction<'_, Sqlite>, hostname: &str) -> Result<String> {
        let existing: Option<String> = sqlx::query_scalar(
            "SELECT id FROM publications WHERE hostname = ? ORDER BY created_at, rowid LIMIT 1",
        )
        .bind(hostname)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error("Failed to look up publication"))?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO publications (id, hostname, created_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(hostname)
            .bind(encode_date(Utc::now()))
            .execute(&mut **tx)
            .await
            .map_err(db_error("Failed to create publication"))?;
        Ok(id)
    }

    async fn journalist_for_name(
        tx: &mut Transaction<'_, Sqlite>,
        name: &str,
        publication_id: &str,
    ) -> Result<String> {
        let existing: Option<String> = sqlx::query_scalar(
            "SELECT id FROM journalists WHERE name = ? AND publication_id = ? ORDER BY created_at LIMIT 1",
        )
        .bind(name)
        .bind(publication_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error("Failed to look up journalist"))?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO journalists (id, name, publication_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(publication_id)
            .bind(encode_date(Utc::now()))
            .execute(&mut **tx)
            .await
            .map_err(db_error("Failed to create journalist"))?;
        Ok(id)
    }
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn upsert_article(&self, article: &ArticleData) -> Result<StoredArticle> {
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

        let publication_id = Self::publication_for_hostname(&mut tx, &article.hostname).await?;
        let mut author_ids = Vec::new();
        for name in author_names(article) {
            author_ids.push(Self::journalist_for_name(&mut tx, &name, &publication_id).await?);
        }

        let existing: Option<String> = sqlx::query_scalar("SELECT id FROM articles WHERE url = ?")
            .bind(&article.url)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to look up article"))?;

        let id = match existing {
            Some(id) => {
                sqlx::query(
                    r#"
                    UPDATE articles
                    SET publication_id = ?, title = ?, date_published = ?, date_updated = ?,
                        hostname = ?, text = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&publication_id)
                .bind(&article.title)
                .bind(encode_date(article.date_published))
                .bind(article.date_updated.map(encode_date))
                .bind(&article.hostname)
                .bind(&article.text)
                .bind(&id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to update article"))?;
                id
            }
            None => {
                let id = Uuid::new_v4().to_string();
                sqlx::query(
                    r#"
                    INSERT INTO articles
                    (id, publication_id, title, date_published, date_updated, hostname, url, text, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&id)
                .bind(&publication_id)
                .bind(&article.title)
                .bind(encode_date(article.date_published))
                .bind(article.date_updated.map(encode_date))
                .bind(&article.hostname)
                .bind(&article.url)
                .bind(&article.text)
                .bind(encode_date(Utc::now()))
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to store article"))?;
                id
            }
        };

        sqlx::query("DELETE FROM article_authors WHERE article_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to clear article authors"))?;
        for (position, journalist_id) in author_ids.iter().enumerate() {
            sqlx::query("INSERT INTO article_authors (article_id, journalist_id, position) VALUES (?, ?, ?)")
                .bind(&id)
                .bind(journalist_id)
                .bind(position as i64)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to link article author"))?;
        }

        tx.commit().await.map_err(db_error("Failed to commit article"))?;

        self.get_article(&id)
            .await?
            .ok_or_else(|| Error::Storage(format!("article {} vanished after upsert", id)))
    }

    async fn get_article(&self, id: &str) -> Result<Option<StoredArticle>> {
        self.find_article("id", id).await
    }

    async fn get_article_by_url(&self, url: &str) -> Result<Option<StoredArticle>> {
        self.find_article("url", url).await
    }

    async fn list_articles(&self) -> Result<Vec<StoredArticle>> {
        let rows = sqlx::query("SELECT * FROM articles ORDER BY date_published DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list articles"))?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in &rows {
            articles.push(self.article_from_row(row).await?);
        }
        Ok(articles)
    }

    async fn list_article_texts(&self, offset: usize, limit: usize) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT id, text FROM articles ORDER BY created_at, id LIMIT ? OFFSET ?")
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to page article texts"))?;
        Ok(rows.iter().map(|row| (row.get("id"), row.get("text"))).collect())
    }

    async fn delete_article(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;
        let removed = delete_article_rows(&mut tx, id).await?;
        if removed == 0 {
            return Err(Error::NotFound(format!("article {}", id)));
        }
        tx.commit().await.map_err(db_error("Failed to commit delete"))?;
        Ok(())
    }

    async fn update_article_text(&self, id: &str, text: &str) -> Result<()> {
        let result = sqlx::query("UPDATE articles SET text = ? WHERE id = ?")
            .bind(text)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update article text"))?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("article {}", id)));
        }
        Ok(())
    }

    async fn store_article_analysis(&self, article_id: &str, analysis: &ArticleAnalysis) -> Result<()> {
        if self.get_article(article_id).await?.is_none() {
            return Err(Error::NotFound(format!("article {}", article_id)));
        }

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO article_analysis
            (article_id, summary, summary_footnotes, polarization, polarization_analysis,
             polarization_footnotes, objectivity, objectivity_analysis, objectivity_footnotes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(article_id)
        .bind(&analysis.summary)
        .bind(footnotes_column(&analysis.summary_footnotes)?)
        .bind(analysis.polarization)
        .bind(&analysis.polarization_analysis)
        .bind(footnotes_column(&analysis.polarization_footnotes)?)
        .bind(analysis.objectivity)
        .bind(&analysis.objectivity_analysis)
        .bind(footnotes_column(&analysis.objectivity_footnotes)?)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to store article analysis"))?;
        Ok(())
    }

    async fn get_article_analysis(&self, article_id: &str) -> Result<Option<ArticleAnalysis>> {
        let row = sqlx::query("SELECT * FROM article_analysis WHERE article_id = ?")
            .bind(article_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load article analysis"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(ArticleAnalysis {
            summary: row.get("summary"),
            summary_footnotes: footnotes_from_column(&row.get::<String, _>("summary_footnotes"))?,
            polarization: row.get("polarization"),
            polarization_analysis: row.get("polarization_analysis"),
            polarization_footnotes: footnotes_from_column(&row.get::<String, _>("polarization_footnotes"))?,
            objectivity: row.get("objectivity"),
            objectivity_analysis: row.get("objectivity_analysis"),
            objectivity_footnotes: footnotes_from_column(&row.get::<String, _>("objectivity_footnotes"))?,
        }))
    }

    async fn get_journalist(&self, id: &str) -> Result<Option<Journalist>> {
        let row = sqlx::query("SELECT * FROM journalists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load journalist"))?;
        row.as_ref().map(journalist_from_row).transpose()
    }

    async fn get_publication(&self, id: &str) -> Result<Option<Publication>> {
        let row = sqlx::query("SELECT * FROM publications WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load publication"))?;
        row.as_ref().map(publication_from_row).transpose()
    }

    async fn update_publication_metadata(&self, id: &str, metadata: &PublicationMetadata) -> Result<()> {
        let result = sqlx::query(
            "UPDATE publications SET name = ?, date_founded = ?, metadata_checked_at = ? WHERE id = ?",
        )
        .bind(metadata.name.as_deref())
        .bind(metadata.date_founded.map(encode_date))
        .bind(encode_date(Utc::now()))
        .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update publication"))?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("publication {}", id)));
        }
        Ok(())
    }

    async fn entity_scores(&self, entity: &EntityRef) -> Result<Vec<ArticleScores>> {
        let filter = match entity.kind {
            EntityKind::Journalist => {
                "a.id IN (SELECT article_id FROM article_authors WHERE journalist_id = ?)"
            }
            EntityKind::Publication => "a.publication_id = ?",
        };
        let sql = format!(
            r#"
            SELECT a.id, a.date_published, s.polarization, s.objectivity, s.summary
            FROM articles a
            LEFT JOIN article_analysis s ON s.article_id = a.id
            WHERE {}
            ORDER BY a.date_published DESC, a.rowid DESC
            "#,
            filter
        );
        let rows = sqlx::query(&sql)
            .bind(&entity.id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to load entity scores"))?;

        rows.iter()
            .map(|row| {
                Ok(ArticleScores {
                    article_id: row.get("id"),
                    date_published: decode_date(&row.get::<String, _>("date_published"))?,
                    polarization: row.get("polarization"),
                    objectivity: row.get("objectivity"),
                    summary: row.get("summary"),
                })
            })
            .collect()
    }

    async fn find_entity_bias(&self, entity: &EntityRef, num_articles: usize) -> Result<Option<EntityBias>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM entity_bias
            WHERE entity_kind = ? AND entity_id = ? AND num_articles = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(entity_kind_column(entity.kind))
        .bind(&entity.id)
        .bind(num_articles as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load entity bias"))?;

        row.map(|row| bias_from_row(&row, entity)).transpose()
    }

    async fn store_entity_bias(&self, bias: &EntityBias) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO entity_bias
            (id, entity_kind, entity_id, num_articles, polarization, objectivity, analysis, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&bias.id)
        .bind(entity_kind_column(bias.entity.kind))
        .bind(&bias.entity.id)
        .bind(bias.num_articles_analyzed as i64)
        .bind(bias.polarization)
        .bind(bias.objectivity)
        .bind(&bias.analysis)
        .bind(encode_date(bias.created_at))
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to store entity bias"))?;
        Ok(())
    }

    async fn dedupe_publications(&self) -> Result<DedupeReport> {
        let hostnames: Vec<String> = sqlx::query_scalar(
            "SELECT hostname FROM publications GROUP BY hostname HAVING COUNT(*) > 1",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to find duplicate publications"))?;

        let mut report = DedupeReport::default();
        for hostname in hostnames {
            let ids: Vec<String> = sqlx::query_scalar(
                "SELECT id FROM publications WHERE hostname = ? ORDER BY created_at, rowid",
            )
            .bind(&hostname)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to load publications"))?;

            let Some((keep, others)) = ids.split_first() else {
                continue;
            };
            report.hostnames += 1;

            for other in others {
                let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

                sqlx::query("UPDATE journalists SET publication_id = ? WHERE publication_id = ?")
                    .bind(keep)
                    .bind(other)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error("Failed to repoint journalists"))?;

                let articles: Vec<String> =
                    sqlx::query_scalar("SELECT id FROM articles WHERE publication_id = ?")
                        .bind(other)
                        .fetch_all(&mut *tx)
                        .await
                        .map_err(db_error("Failed to load publication articles"))?;
                let mut removed = 0;
                for article_id in &articles {
                    removed += delete_article_rows(&mut tx, article_id).await?;
                }

                sqlx::query("DELETE FROM entity_bias WHERE entity_kind = ? AND entity_id = ?")
                    .bind(entity_kind_column(EntityKind::Publication))
                    .bind(other)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error("Failed to delete publication bias"))?;
                sqlx::query("DELETE FROM publications WHERE id = ?")
                    .bind(other)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error("Failed to delete publication"))?;

                tx.commit().await.map_err(db_error("Failed to commit dedupe"))?;
                report.publications_removed += 1;
                report.articles_removed += removed as usize;
            }

            info!(hostname = %hostname, kept = %keep, removed = others.len(), "Deduplicated publication");
        }

        Ok(report)
    }
}
