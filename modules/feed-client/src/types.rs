use serde::Deserialize;

/// A resolved feed account.
#[derive(Debug, Clone, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// One post as returned by the feed API.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: i64,
    pub text: String,
}

/// A bounded slice of a subject's timeline, newest-first as fetched.
///
/// `earliest_id`/`latest_id` is the inclusive post-id range covered by
/// `posts`. A truncated fetch (rate limit, early API termination) is still a
/// valid timeline — the range just covers fewer posts.
#[derive(Debug, Clone)]
pub struct Timeline {
    pub subject_id: i64,
    pub earliest_id: i64,
    pub latest_id: i64,
    pub posts: Vec<Post>,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}
