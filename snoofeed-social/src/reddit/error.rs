use snoofeed_http::HttpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RedditError {
    #[error("client setup failed: {0}")]
    Setup(#[from] HttpError),

    #[error("auth request failed: {0}")]
    Auth(#[source] HttpError),

    #[error("auth response did not contain an access_token")]
    MissingToken { body: String },

    #[error("feed request failed: {0}")]
    Feed(#[source] HttpError),
}

impl RedditError {
    /// Response body returned by the server, for diagnostics.
    pub fn body(&self) -> Option<&str> {
        match self {
            RedditError::Auth(e) | RedditError::Feed(e) | RedditError::Setup(e) => e.body(),
            RedditError::MissingToken { body } => Some(body),
        }
    }
}
