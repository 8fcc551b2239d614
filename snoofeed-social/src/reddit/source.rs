use super::error::RedditError;
use async_trait::async_trait;
use serde_json::Value;

/// Where the collection loop gets its token and pages from.
///
/// [`super::RedditApi`] is the real implementation; tests script their own.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Obtain an anonymous bearer token. Called once per collection run.
    async fn obtain_token(&self) -> Result<String, RedditError>;

    /// Fetch one page of the subreddit's hot feed, starting after `cursor`.
    async fn fetch_page(
        &self,
        subreddit: &str,
        token: &str,
        cursor: Option<&str>,
    ) -> Result<Value, RedditError>;
}
