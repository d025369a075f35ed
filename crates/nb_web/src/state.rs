use std::sync::Arc;

use nb_core::{ArticleStorage, LanguageModel};
use nb_inference::analysis::ArticleAnalyzer;
use nb_inference::bias::BiasAggregator;
use nb_parsers::ParserRegistry;

/// Service handles shared by every request. Built once at startup.
pub struct AppState {
    pub storage: Arc<dyn ArticleStorage>,
    pub model: Arc<dyn LanguageModel>,
    pub parsers: ParserRegistry,
    pub analyzer: ArticleAnalyzer,
    pub aggregator: BiasAggregator,
}

impl AppState {
    pub fn new(storage: Arc<dyn ArticleStorage>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            parsers: ParserRegistry::new(model.clone()),
            analyzer: ArticleAnalyzer::new(model.clone()),
            aggregator: BiasAggregator::new(model.clone(), storage.clone()),
            storage,
            model,
        }
    }

    pub fn with_rule_based_parsers(mut self, enabled: bool) -> Self {
        self.parsers = self.parsers.with_rule_based(enabled);
        self
    }
}
