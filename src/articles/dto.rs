use serde::Deserialize;

/// One paragraph as submitted; stored order follows array position.
#[derive(Debug, Deserialize)]
pub struct ParagraphInput {
    pub headline: String,
    pub body: String,
}

/// Body for create and for full-replacement update.
#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub paragraphs: Vec<ParagraphInput>,
}
