//! Client that presents itself as the Reddit Android app.
//!
//! Two calls: an anonymous `loid` token grant and the persisted
//! `SubredditFeedSdui` GraphQL query. Every request carries a freshly generated
//! vendor id; the token call and each feed call all use different ones.
use super::error::RedditError;
use super::source::FeedSource;
use super::types::{Extensions, FeedRequest, FeedVariables, PersistedQuery, TokenRequest};
use async_trait::async_trait;
use serde_json::Value;
use snoofeed_http::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use snoofeed_http::{Auth, HttpClient, HttpError, RequestOpts, snip_body};
use std::time::Duration;
use uuid::Uuid;

pub const CLIENT_ID: &str = "ohXpoqrZYub1kg";
pub const APP_USER_AGENT: &str = "Reddit/Version 2024.28.1/Build 1741165/Android 9";
pub const AUTH_BASE: &str = "https://www.reddit.com/";
pub const GQL_BASE: &str = "https://gql-fed.reddit.com/";

const AUTH_PATH: &str = "auth/v2/oauth/access-token/loid";
const GQL_PATH: &str = "";
const SCOPES: &[&str] = &["*", "email", "pii"];

pub const FEED_OPERATION_NAME: &str = "SubredditFeedSdui";
pub const FEED_OPERATION_ID: &str =
    "c4071269a5d5e7aca80e86ed4cf2561ff29cba229760bf7cd58d67036af9a559";
const FEED_SORT: &str = "HOT";

const CLIENT_VENDOR_ID: HeaderName = HeaderName::from_static("client-vendor-id");
const DEVICE_ID: HeaderName = HeaderName::from_static("x-reddit-device-id");
const COMPRESSION: HeaderName = HeaderName::from_static("x-reddit-compression");
const MEDIA_CODECS: HeaderName = HeaderName::from_static("x-reddit-media-codecs");
const QOS: HeaderName = HeaderName::from_static("x-reddit-qos");
const RETRY: HeaderName = HeaderName::from_static("x-reddit-retry");
const APOLLO_OPERATION_ID: HeaderName = HeaderName::from_static("x-apollo-operation-id");
const APOLLO_OPERATION_NAME: HeaderName = HeaderName::from_static("x-apollo-operation-name");

/// Identity and endpoints of the impersonated client.
#[derive(Debug, Clone)]
pub struct RedditSettings {
    pub client_id: String,
    pub user_agent: String,
    pub auth_base: String,
    pub gql_base: String,
    pub timeout: Duration,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            client_id: CLIENT_ID.to_string(),
            user_agent: APP_USER_AGENT.to_string(),
            auth_base: AUTH_BASE.to_string(),
            gql_base: GQL_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct RedditApi {
    auth: HttpClient,
    gql: HttpClient,
    client_id: String,
    user_agent: HeaderValue,
}

fn header_value(raw: &str) -> Result<HeaderValue, HttpError> {
    HeaderValue::from_str(raw).map_err(|e| HttpError::Build(format!("invalid header value: {e}")))
}

fn new_vendor_id() -> String {
    Uuid::new_v4().to_string()
}

impl RedditApi {
    pub fn new(settings: RedditSettings) -> Result<Self, RedditError> {
        let auth = HttpClient::new(&settings.auth_base)?.with_timeout(settings.timeout);
        let gql = HttpClient::new(&settings.gql_base)?.with_timeout(settings.timeout);
        let user_agent = header_value(&settings.user_agent)?;
        Ok(Self {
            auth,
            gql,
            client_id: settings.client_id,
            user_agent,
        })
    }

    fn auth_headers(&self, vendor_id: &str) -> Result<HeaderMap, HttpError> {
        let mut h = HeaderMap::new();
        h.insert(CLIENT_VENDOR_ID, header_value(vendor_id)?);
        h.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=UTF-8"),
        );
        h.insert(USER_AGENT, self.user_agent.clone());
        h.insert(COMPRESSION, HeaderValue::from_static("1"));
        h.insert(MEDIA_CODECS, HeaderValue::from_static("available-codecs="));
        h.insert(QOS, HeaderValue::from_static("down-rate-mbps=1.000"));
        h.insert(RETRY, HeaderValue::from_static("algo=no-retries"));
        Ok(h)
    }

    fn feed_headers(&self, vendor_id: &str) -> Result<HeaderMap, HttpError> {
        let vendor = header_value(vendor_id)?;
        let mut h = HeaderMap::new();
        h.insert(
            ACCEPT,
            HeaderValue::from_static("multipart/mixed; deferSpec=20220824, application/json"),
        );
        h.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        h.insert(USER_AGENT, self.user_agent.clone());
        h.insert(APOLLO_OPERATION_ID, HeaderValue::from_static(FEED_OPERATION_ID));
        h.insert(APOLLO_OPERATION_NAME, HeaderValue::from_static(FEED_OPERATION_NAME));
        h.insert(COMPRESSION, HeaderValue::from_static("1"));
        h.insert(CLIENT_VENDOR_ID, vendor.clone());
        h.insert(DEVICE_ID, vendor);
        Ok(h)
    }

    /// Anonymous token grant. Any failure is terminal for the run.
    pub async fn obtain_token(&self) -> Result<String, RedditError> {
        let vendor_id = new_vendor_id();
        let opts = RequestOpts {
            auth: Some(Auth::Basic {
                username: &self.client_id,
                password: None,
            }),
            headers: Some(self.auth_headers(&vendor_id)?),
            ..Default::default()
        };

        let resp: Value = self
            .auth
            .post_json(AUTH_PATH, &TokenRequest { scopes: SCOPES }, opts)
            .await
            .map_err(RedditError::Auth)?;

        match resp
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
        {
            Some(token) => {
                tracing::info!(%vendor_id, "reddit.auth.token_acquired");
                Ok(token.to_owned())
            }
            None => Err(RedditError::MissingToken {
                body: snip_body(resp.to_string().as_bytes()),
            }),
        }
    }

    /// One page of the subreddit's hot feed, returned as the raw JSON document.
    pub async fn fetch_page(
        &self,
        subreddit: &str,
        token: &str,
        cursor: Option<&str>,
    ) -> Result<Value, RedditError> {
        let vendor_id = new_vendor_id();
        let body = FeedRequest {
            operation_name: FEED_OPERATION_NAME,
            variables: FeedVariables {
                subreddit_name: subreddit,
                sort: FEED_SORT,
                after: cursor,
                include_view_count: false,
                include_carousel_recommendations: true,
                include_gold_info: false,
                include_media_auth: false,
            },
            extensions: Extensions {
                persisted_query: PersistedQuery {
                    version: 1,
                    sha256_hash: FEED_OPERATION_ID,
                },
            },
        };
        let opts = RequestOpts {
            auth: Some(Auth::Bearer(token)),
            headers: Some(self.feed_headers(&vendor_id)?),
            ..Default::default()
        };

        let doc: Value = self
            .gql
            .post_json(GQL_PATH, &body, opts)
            .await
            .map_err(RedditError::Feed)?;
        tracing::debug!(subreddit, cursor = ?cursor, %vendor_id, "reddit.feed.page_received");
        Ok(doc)
    }
}

#[async_trait]
impl FeedSource for RedditApi {
    async fn obtain_token(&self) -> Result<String, RedditError> {
        RedditApi::obtain_token(self).await
    }

    async fn fetch_page(
        &self,
        subreddit: &str,
        token: &str,
        cursor: Option<&str>,
    ) -> Result<Value, RedditError> {
        RedditApi::fetch_page(self, subreddit, token, cursor).await
    }
}
