pub mod error;
pub mod types;

pub use error::{FeedError, Result};
pub use types::{Post, Subject, Timeline};

const DEFAULT_BASE_URL: &str = "https://api.socialfeed.dev/v1";

/// Page size per timeline request.
const PAGE_SIZE: u32 = 200;

/// Hard cap on posts fetched per timeline call. Anything beyond this is left
/// for a later run; the merge layer stitches the ranges together.
const MAX_POSTS: usize = 600;

pub struct FeedClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl FeedClient {
    pub fn new(token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    /// Resolve a handle to a feed account. The API returns candidates ranked
    /// by relevance; the first match wins.
    pub async fn resolve_subject(&self, handle: &str) -> Result<Subject> {
        let url = format!("{}/accounts/search", self.base_url);
        let candidates: Vec<Subject> = self
            .get_json(&url, &[("q", handle.to_string()), ("count", "1".to_string())])
            .await?;

        candidates
            .into_iter()
            .next()
            .ok_or_else(|| FeedError::SubjectNotFound(handle.to_string()))
    }

    /// Fetch a subject's recent posts, newest-first, paging with a max-id
    /// cursor until the timeline is exhausted or the cap is hit.
    ///
    /// A mid-fetch API failure after at least one successful page returns the
    /// truncated timeline rather than an error — downstream treats a
    /// truncated batch the same as a complete one.
    pub async fn fetch_timeline(&self, subject_id: i64) -> Result<Timeline> {
        let mut timeline = Timeline {
            subject_id,
            earliest_id: i64::MAX,
            latest_id: 0,
            posts: Vec::new(),
        };
        let mut cursor: Option<i64> = None;
        let url = format!("{}/accounts/{}/posts", self.base_url, subject_id);

        loop {
            let mut query = vec![
                ("count", PAGE_SIZE.to_string()),
                ("exclude_replies", "true".to_string()),
            ];
            if let Some(max_id) = cursor {
                query.push(("max_id", max_id.to_string()));
            }

            let page: Vec<Post> = match self.get_json(&url, &query).await {
                Ok(page) => page,
                Err(err) if !timeline.posts.is_empty() => {
                    tracing::warn!(
                        subject_id,
                        fetched = timeline.posts.len(),
                        error = %err,
                        "Timeline fetch terminated early, returning truncated batch"
                    );
                    break;
                }
                Err(err) => return Err(err),
            };

            if page.is_empty() {
                break;
            }

            cursor = page.iter().map(|p| p.id).min().map(|id| id - 1);
            for post in page {
                timeline.latest_id = timeline.latest_id.max(post.id);
                timeline.earliest_id = timeline.earliest_id.min(post.id);
                timeline.posts.push(post);
            }

            if timeline.posts.len() >= MAX_POSTS {
                tracing::debug!(subject_id, cap = MAX_POSTS, "Timeline cap reached");
                break;
            }
        }

        tracing::info!(
            subject_id,
            count = timeline.posts.len(),
            earliest = timeline.earliest_id,
            latest = timeline.latest_id,
            "Fetched timeline"
        );
        Ok(timeline)
    }
}
