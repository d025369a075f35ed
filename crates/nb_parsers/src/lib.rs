pub mod chunk;
pub mod merge;
pub mod normalize;
pub mod parsers;
pub mod smart;
pub mod text;

pub use parsers::{ArticleParser, CnnParser, ParserKind, ParserRegistry};
pub use smart::SmartParser;
pub use text::clean_article_text;

pub mod prelude {
    pub use super::parsers::{ArticleParser, ParserKind, ParserRegistry};
    pub use super::text::clean_article_text;
    pub use nb_core::{ArticleData, Error, Result};
}
