pub mod error;
pub mod types;

pub use error::{NlpError, Result};
pub use types::{
    AnalyzeSentimentRequest, AnalyzeSentimentResponse, Category, ClassifyTextRequest,
    ClassifyTextResponse, Document, Sentiment,
};

use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://language.googleapis.com/v1";

// --- Classifier traits ---

/// Scores one piece of text for sentiment. Implementations make one remote
/// call per invocation; transient failures are per-call.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Returns a continuous sentiment score in [-1.0, 1.0].
    async fn analyze_sentiment(&self, text: &str) -> Result<f64>;
}

/// Labels one piece of text with zero or more topic categories.
#[async_trait]
pub trait TopicClassifier: Send + Sync {
    async fn classify_topics(&self, text: &str) -> Result<Vec<String>>;
}

// --- NlpClient ---

/// Client for the hosted natural-language API. Implements both classifier
/// traits; the two endpoints are independent and may be called concurrently
/// for the same text.
pub struct NlpClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl NlpClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    async fn post<Req: serde::Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("{}/documents:{}?key={}", self.base_url, method, self.api_key);
        let resp = self.client.post(&url).json(body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NlpError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl SentimentClassifier for NlpClient {
    async fn analyze_sentiment(&self, text: &str) -> Result<f64> {
        let request = AnalyzeSentimentRequest {
            document: Document::plain_text(text),
            encoding_type: "UTF8".to_string(),
        };

        let response: AnalyzeSentimentResponse = self.post("analyzeSentiment", &request).await?;
        tracing::debug!(score = response.document_sentiment.score, "Sentiment analyzed");
        Ok(response.document_sentiment.score)
    }
}

#[async_trait]
impl TopicClassifier for NlpClient {
    async fn classify_topics(&self, text: &str) -> Result<Vec<String>> {
        let request = ClassifyTextRequest {
            document: Document::plain_text(text),
        };

        let response: ClassifyTextResponse = self.post("classifyText", &request).await?;
        let topics: Vec<String> = response.categories.into_iter().map(|c| c.name).collect();
        tracing::debug!(count = topics.len(), "Topics classified");
        Ok(topics)
    }
}
