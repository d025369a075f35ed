use std::sync::Arc;

use async_trait::async_trait;
use nb_core::utils::get_hostname;
use nb_core::{ArticleData, LanguageModel, Result};
use tracing::info;

pub mod cnn;
pub mod jsonld;

pub use cnn::CnnParser;

use crate::smart::SmartParser;

#[async_trait]
pub trait ArticleParser: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Hostnames this parser is written for. Empty means any.
    fn hostnames(&self) -> &[&str] {
        &[]
    }

    /// Returns true if this parser can handle pages from `hostname`
    fn can_handle(&self, hostname: &str) -> bool {
        let hostnames = self.hostnames();
        hostnames.is_empty() || hostnames.contains(&hostname)
    }

    /// Turns a page into an article ready for storage
    async fn parse(&self, url: &str, html: &str) -> Result<ArticleData>;
}

/// Every parser the service knows about
#[derive(Debug, Clone)]
pub enum ParserKind {
    Cnn(CnnParser),
    Smart(SmartParser),
}

impl ParserKind {
    pub fn name(&self) -> &str {
        match self {
            ParserKind::Cnn(p) => p.name(),
            ParserKind::Smart(p) => p.name(),
        }
    }

    pub fn can_handle(&self, hostname: &str) -> bool {
        match self {
            ParserKind::Cnn(p) => p.can_handle(hostname),
            ParserKind::Smart(p) => p.can_handle(hostname),
        }
    }

    pub async fn parse(&self, url: &str, html: &str) -> Result<ArticleData> {
        match self {
            ParserKind::Cnn(p) => p.parse(url, html).await,
            ParserKind::Smart(p) => p.parse(url, html).await,
        }
    }
}

/// Picks a parser by hostname, falling back to the model-driven one.
///
/// Publisher-specific parsers are only consulted when enabled.
#[derive(Debug, Clone)]
pub struct ParserRegistry {
    smart: SmartParser,
    rule_based: Vec<ParserKind>,
    use_rule_based: bool,
}

impl ParserRegistry {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self::with_smart_parser(SmartParser::new(model))
    }

    pub fn with_smart_parser(smart: SmartParser) -> Self {
        Self {
            smart,
            rule_based: vec![ParserKind::Cnn(CnnParser::new())],
            use_rule_based: false,
        }
    }

    pub fn with_rule_based(mut self, enabled: bool) -> Self {
        self.use_rule_based = enabled;
        self
    }

    pub fn parser_for(&self, url: &str) -> Result<ParserKind> {
        let hostname = get_hostname(url)?;
        if self.use_rule_based {
            if let Some(parser) = self.rule_based.iter().find(|p| p.can_handle(&hostname)) {
                return Ok(parser.clone());
            }
        }
        Ok(ParserKind::Smart(self.smart.clone()))
    }

    pub async fn parse(&self, url: &str, html: &str) -> Result<ArticleData> {
        let parser = self.parser_for(url)?;
        info!(url, parser = parser.name(), "Parsing article");
        parser.parse(url, html).await
    }
}
