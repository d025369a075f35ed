//! Prompt templates. Every template is sent as a single system message.

use nb_core::BiasAnalysisInput;

pub const HTML_PARSE_PROPERTY: &str = "html_parse";
pub const JOURNALIST_ANALYSIS_PROPERTY: &str = "journalist_analysis";
pub const PUBLICATION_ANALYSIS_PROPERTY: &str = "publication_analysis";
pub const SUMMARY_PROPERTY: &str = "summary";
pub const POLITICAL_BIAS_PROPERTY: &str = "political_bias";
pub const OBJECTIVITY_PROPERTY: &str = "objectivity_bias";

const POLARIZATION_SCALE: &str = "(0 = very left-wing, 50 = moderate, 100 = very right-wing)";
const OBJECTIVITY_SCALE: &str = "(0 = very opinionated, 100 = very factual)";

pub fn build_html_parsing_prompt(html_chunk: &str) -> String {
    format!(
        r#"You are given one piece of the HTML DOM of a news article. The piece may start or end in the middle of an element, so do not expect matching closing tags. Extract the fields below from this piece only and answer in JSON.

HTML DOM piece:
{html_chunk}

Fields:
1. title: the headline of the article. It usually sits near the start of the document, in the <title> or <h1> element. Drop any trailing separator and publication name (for example "Headline | CNN"). Use "" when this piece has no title.
2. authors: the names of the article's authors, without prefixes such as "By". Use [] when none appear in this piece.
3. date_published: when the article was first published, as an ISO 8601 timestamp (YYYY-MM-DDTHH:MM:SSZ when the time is known, otherwise YYYY-MM-DD). Use "" when absent.
4. date_updated: when the article was last updated, in the same format. Use "" when absent.
5. content: the article's body text exactly as written. Leave out captions, navigation, advertisements, newsletter prompts, copyright lines and other text that is not part of the story. Use "" when this piece holds no body text.

Escape newlines inside strings. Do not wrap the answer in markdown."#
    )
}

fn build_entity_prompt(subject: &str, input: &BiasAnalysisInput) -> String {
    let summaries = serde_json::to_string(&input.summaries).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"Below is data about the articles of a {subject}. Write an analysis that explains the {subject}'s average polarization and objectivity scores, citing specific examples from the article summaries.

Present the analysis as markdown bullet points in the "analysis" field of the JSON output.

Data:
- Average Polarization Score: {polarization} {POLARIZATION_SCALE}
- Average Objectivity Score: {objectivity} {OBJECTIVITY_SCALE}
- Article Summaries: {summaries}"#,
        polarization = input.average_polarization,
        objectivity = input.average_objectivity,
    )
}

pub fn build_journalist_analysis_prompt(input: &BiasAnalysisInput) -> String {
    build_entity_prompt("journalist", input)
}

pub fn build_publication_analysis_prompt(input: &BiasAnalysisInput) -> String {
    build_entity_prompt("publication", input)
}

pub fn build_summary_prompt(article: &str) -> String {
    format!(
        r#"Summarize the news article below. Cover the main points, key arguments and significant evidence. Cite the article with footnotes whose text is copied exactly from the article so it can be highlighted. If the content is not a news article, summarize it anyway and say that it may not be news.

Present the summary as markdown bullet points in the "summary" field of the JSON output.

Article Content:
{article}"#
    )
}

pub fn build_political_bias_prompt(article: &str) -> String {
    format!(
        r#"Analyze the news article below for political bias and give it a bias score from 0 to 100 {POLARIZATION_SCALE}. Support the score with examples, citing the article with footnotes whose text is copied exactly from the article. If the content is not a news article or political bias does not apply, give a score of 50, explain why in the analysis and return no footnotes.

Present the analysis as markdown bullet points in the "analysis" field of the JSON output.

Article Content:
{article}"#
    )
}

pub fn build_objectivity_prompt(article: &str) -> String {
    format!(
        r#"Analyze how opinionated or factual the news article below is and give it a rhetoric score from 0 to 100 {OBJECTIVITY_SCALE}. Support the score with examples, citing the article with footnotes whose text is copied exactly from the article. If the content is not a news article or the analysis does not apply, give a score of 100, explain why in the analysis and return no footnotes.

Present the analysis as markdown bullet points in the "analysis" field of the JSON output.

Article Content:
{article}"#
    )
}

pub fn build_publication_metadata_prompt(hostname: &str) -> String {
    format!(
        r#"Given the hostname of a news organization (for example www.cnn.com), return a JSON object with metadata about it. Do not use markdown or code fences. The object must look like:

{{
  "name": "human-friendly name the organization is commonly known by",
  "date_founded": "MM/DD/YYYY"
}}

For "www.cnn.com" the correct answer is:

{{
  "name": "CNN",
  "date_founded": "06/01/1980"
}}

If you cannot determine a readable name, use the hostname without "www." (www.github.com becomes github.com). If the founding date is unknown or ambiguous, use "NULL" for date_founded.

Accuracy matters.

Hostname:
{hostname}"#
    )
}
