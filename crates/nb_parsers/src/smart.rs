//! Model-driven article parsing.
//!
//! The page is stripped of attributes, cut into chunks, and every chunk is
//! sent to the model at once. One failed chunk fails the whole parse so a
//! partial article is never stored.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::try_join_all;
use nb_core::utils::{get_hostname, parse_date_string};
use nb_core::{ArticleData, Error, LanguageModel, ParseFragment, Result};
use nb_inference::invoke;
use nb_inference::prompts::{build_html_parsing_prompt, HTML_PARSE_PROPERTY};
use tracing::{debug, info, warn};

use crate::chunk::{chunk_with_budget, ChunkBudget};
use crate::merge::merge_fragments;
use crate::normalize::HtmlNormalizer;
use crate::parsers::ArticleParser;
use crate::text::clean_article_text;

#[derive(Clone)]
pub struct SmartParser {
    model: Arc<dyn LanguageModel>,
    budget: ChunkBudget,
}

impl fmt::Debug for SmartParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartParser")
            .field("model", &self.model.name())
            .field("budget", &self.budget)
            .finish()
    }
}

impl SmartParser {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            budget: ChunkBudget::default(),
        }
    }

    pub fn with_budget(mut self, budget: ChunkBudget) -> Self {
        self.budget = budget;
        self
    }

    async fn parse_chunks(&self, html: &str) -> Result<Vec<ParseFragment>> {
        let model = self.model.as_ref();
        let calls = chunk_with_budget(html, self.budget).map(|chunk| {
            invoke::<ParseFragment>(model, build_html_parsing_prompt(chunk), HTML_PARSE_PROPERTY)
        });
        try_join_all(calls).await
    }
}

#[async_trait]
impl ArticleParser for SmartParser {
    fn name(&self) -> &str {
        "smart"
    }

    async fn parse(&self, url: &str, html: &str) -> Result<ArticleData> {
        let hostname = get_hostname(url)?;
        let stripped = HtmlNormalizer::new(html).stripped_html();
        debug!(
            url,
            chars = stripped.len(),
            tokens = self.budget.estimate_tokens(&stripped),
            "Normalized page"
        );

        let fragments = self.parse_chunks(&stripped).await?;
        let chunks = fragments.len();
        let merged = merge_fragments(fragments);
        if merged.content.trim().is_empty() {
            return Err(Error::EmptyContent(url.to_string()));
        }

        let date_published = parse_date_string(&merged.date_published).unwrap_or_else(|| {
            if !merged.date_published.is_empty() {
                warn!(url, date = %merged.date_published, "Unparseable publish date");
            }
            Utc::now()
        });
        let date_updated = parse_date_string(&merged.date_updated);

        let text = clean_article_text(&merged.content);
        if text.is_empty() {
            return Err(Error::EmptyContent(url.to_string()));
        }

        info!(url, chunks, authors = merged.authors.len(), "Parsed article");
        Ok(ArticleData {
            title: merged.title,
            authors: merged.authors,
            date_published,
            date_updated,
            hostname,
            url: url.to_string(),
            text,
        })
    }
}
