use serde::{Deserialize, Serialize};

// --- Request types ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub content: String,
}

impl Document {
    pub fn plain_text(content: impl Into<String>) -> Self {
        Self {
            doc_type: "PLAIN_TEXT".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeSentimentRequest {
    pub document: Document,
    pub encoding_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyTextRequest {
    pub document: Document,
}

// --- Response types ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentiment {
    /// Overall document sentiment in [-1.0, 1.0].
    pub score: f64,
    #[serde(default)]
    pub magnitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeSentimentResponse {
    pub document_sentiment: Sentiment,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Hierarchical category path, e.g. "/Arts & Entertainment/Music".
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyTextResponse {
    #[serde(default)]
    pub categories: Vec<Category>,
}
