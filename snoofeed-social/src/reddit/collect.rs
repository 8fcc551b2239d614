//! Pagination loop: authenticate once, then fetch and walk pages until the
//! target is met, the cursor runs out, or a request fails.
//!
//! Failures never surface as errors here. An auth failure yields nothing; a
//! feed failure keeps whatever was already collected.
use super::extract::{PageExtract, extract_next_cursor, extract_posts};
use super::source::FeedSource;
use super::types::PostRecord;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub target_count: usize,
    /// Pause between consecutive page requests.
    pub page_delay: Duration,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            target_count: 100,
            page_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    Exhausted,
    FetchFailed,
    AuthFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collected {
    /// At most `target_count` posts, in discovery order.
    pub posts: Vec<PostRecord>,
    /// Pages fetched successfully.
    pub pages: usize,
    pub stop: StopReason,
}

pub async fn collect_posts<S>(source: &S, subreddit: &str, opts: &CollectOptions) -> Collected
where
    S: FeedSource + ?Sized,
{
    let token = match source.obtain_token().await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, body = ?e.body(), "reddit.collect.auth_failed");
            return Collected {
                posts: Vec::new(),
                pages: 0,
                stop: StopReason::AuthFailed,
            };
        }
    };

    let mut posts: Vec<PostRecord> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    let stop = loop {
        if posts.len() >= opts.target_count {
            break StopReason::TargetReached;
        }

        let page = pages + 1;
        tracing::info!(subreddit, page, cursor = ?cursor, "reddit.collect.fetching");
        let doc = match source.fetch_page(subreddit, &token, cursor.as_deref()).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(page, error = %e, body = ?e.body(), "reddit.collect.fetch_failed");
                break StopReason::FetchFailed;
            }
        };
        pages = page;

        let PageExtract {
            posts: found,
            missing,
        } = extract_posts(&doc);
        if let Some(missing) = missing {
            tracing::warn!(page, %missing, "reddit.collect.unexpected_shape");
        }
        posts.extend(found);
        tracing::info!(page, total = posts.len(), "reddit.collect.page_done");

        if posts.len() >= opts.target_count {
            break StopReason::TargetReached;
        }
        match extract_next_cursor(&doc) {
            Some(next) => cursor = Some(next),
            None => {
                tracing::info!(page, "reddit.collect.no_more_pages");
                break StopReason::Exhausted;
            }
        }

        if !opts.page_delay.is_zero() {
            sleep(opts.page_delay).await;
        }
    };

    posts.truncate(opts.target_count);
    Collected { posts, pages, stop }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reddit::error::RedditError;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use snoofeed_http::{HttpError, StatusCode};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replays canned pages and records the cursor of every fetch.
    struct Scripted {
        token: Option<String>,
        pages: Mutex<VecDeque<Option<Value>>>,
        cursors: Mutex<Vec<Option<String>>>,
        fetched_at: Mutex<Vec<Instant>>,
    }

    impl Scripted {
        fn new(pages: Vec<Option<Value>>) -> Self {
            Self {
                token: Some("tok".into()),
                pages: Mutex::new(pages.into()),
                cursors: Mutex::new(Vec::new()),
                fetched_at: Mutex::new(Vec::new()),
            }
        }

        fn failing_auth() -> Self {
            Self {
                token: None,
                ..Self::new(vec![Some(page(3, 0, None))])
            }
        }

        fn cursors(&self) -> Vec<Option<String>> {
            self.cursors.lock().unwrap().clone()
        }

        fn fetched_at(&self) -> Vec<Instant> {
            self.fetched_at.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FeedSource for Scripted {
        async fn obtain_token(&self) -> Result<String, RedditError> {
            self.token.clone().ok_or_else(|| RedditError::MissingToken {
                body: "{}".into(),
            })
        }

        async fn fetch_page(
            &self,
            _subreddit: &str,
            token: &str,
            cursor: Option<&str>,
        ) -> Result<Value, RedditError> {
            assert_eq!(token, "tok");
            self.cursors.lock().unwrap().push(cursor.map(str::to_owned));
            self.fetched_at.lock().unwrap().push(Instant::now());
            match self.pages.lock().unwrap().pop_front().flatten() {
                Some(doc) => Ok(doc),
                None => Err(RedditError::Feed(HttpError::Api {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "boom".into(),
                    body: "boom".into(),
                })),
            }
        }
    }

    /// A page of `n` complete posts numbered from `start`.
    fn page(n: usize, start: usize, cursor: Option<&str>) -> Value {
        let edges: Vec<Value> = (start..start + n)
            .map(|i| {
                json!({
                    "__typename": "FeedElementEdge",
                    "node": {"__typename": "CellGroup", "cells": [
                        {"__typename": "MetadataCell", "authorName": format!("user{i}"), "createdAt": "2024-07-01T00:00:00Z"},
                        {"__typename": "TitleCell", "title": format!("post {i}")},
                        {"__typename": "ActionCell", "commentCount": i}
                    ]}
                })
            })
            .collect();
        json!({"data": {"subredditV3": {"elements": {
            "edges": edges,
            "pageInfo": {"endCursor": cursor}
        }}}})
    }

    fn opts(target_count: usize) -> CollectOptions {
        CollectOptions {
            target_count,
            page_delay: Duration::ZERO,
        }
    }

    fn titles(c: &Collected) -> Vec<String> {
        c.posts
            .iter()
            .filter_map(|p| p.title.as_str().map(str::to_owned))
            .collect()
    }

    #[tokio::test]
    async fn second_fetch_uses_first_pages_cursor() {
        let src = Scripted::new(vec![Some(page(2, 0, Some("abc"))), Some(page(2, 2, None))]);
        let got = collect_posts(&src, "Steam", &opts(10)).await;
        assert_eq!(src.cursors(), vec![None, Some("abc".to_string())]);
        assert_eq!(got.pages, 2);
        assert_eq!(got.stop, StopReason::Exhausted);
        assert_eq!(titles(&got), ["post 0", "post 1", "post 2", "post 3"]);
    }

    #[tokio::test]
    async fn truncates_to_target_in_discovery_order() {
        let src = Scripted::new(vec![
            Some(page(3, 0, Some("c1"))),
            Some(page(3, 3, Some("c2"))),
            Some(page(2, 6, Some("c3"))),
        ]);
        let got = collect_posts(&src, "Steam", &opts(5)).await;
        assert_eq!(got.stop, StopReason::TargetReached);
        assert_eq!(got.pages, 2);
        assert_eq!(
            titles(&got),
            ["post 0", "post 1", "post 2", "post 3", "post 4"]
        );
    }

    #[tokio::test]
    async fn absent_cursor_stops_after_one_page() {
        let src = Scripted::new(vec![Some(page(2, 0, None)), Some(page(2, 2, None))]);
        let got = collect_posts(&src, "Steam", &opts(10)).await;
        assert_eq!(src.cursors().len(), 1);
        assert_eq!(got.posts.len(), 2);
        assert_eq!(got.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn auth_failure_short_circuits() {
        let src = Scripted::failing_auth();
        let got = collect_posts(&src, "Steam", &opts(10)).await;
        assert!(got.posts.is_empty());
        assert_eq!(got.stop, StopReason::AuthFailed);
        assert!(src.cursors().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_keeps_what_was_collected() {
        let src = Scripted::new(vec![Some(page(2, 0, Some("abc"))), None]);
        let got = collect_posts(&src, "Steam", &opts(10)).await;
        assert_eq!(got.stop, StopReason::FetchFailed);
        assert_eq!(got.pages, 1);
        assert_eq!(titles(&got), ["post 0", "post 1"]);
    }

    #[tokio::test]
    async fn unexpected_shape_ends_pagination_without_error() {
        let src = Scripted::new(vec![Some(json!({"data": null})), Some(page(2, 0, None))]);
        let got = collect_posts(&src, "Steam", &opts(10)).await;
        assert!(got.posts.is_empty());
        assert_eq!(got.pages, 1);
        assert_eq!(got.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn zero_target_fetches_nothing() {
        let src = Scripted::new(vec![Some(page(2, 0, None))]);
        let got = collect_posts(&src, "Steam", &opts(0)).await;
        assert!(got.posts.is_empty());
        assert_eq!(got.stop, StopReason::TargetReached);
        assert!(src.cursors().is_empty());
    }

    #[tokio::test]
    async fn steam_example_truncates_three_to_two() {
        let src = Scripted::new(vec![Some(page(3, 0, Some("next")))]);
        let got = collect_posts(&src, "Steam", &opts(2)).await;
        assert_eq!(titles(&got), ["post 0", "post 1"]);
        assert_eq!(src.cursors().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_falls_between_pages_and_not_after_the_last() {
        let src = Scripted::new(vec![
            Some(page(1, 0, Some("a"))),
            Some(page(1, 1, Some("b"))),
            Some(page(1, 2, None)),
        ]);
        let delay = CollectOptions {
            target_count: 10,
            page_delay: Duration::from_secs(1),
        };
        let start = Instant::now();
        let got = collect_posts(&src, "Steam", &delay).await;

        assert_eq!(got.stop, StopReason::Exhausted);
        let at = src.fetched_at();
        assert_eq!(at.len(), 3);
        assert_eq!(at[0] - start, Duration::ZERO);
        assert_eq!(at[1] - at[0], Duration::from_secs(1));
        assert_eq!(at[2] - at[1], Duration::from_secs(1));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn no_delay_once_target_is_reached() {
        let src = Scripted::new(vec![Some(page(2, 0, Some("a"))), Some(page(2, 2, Some("b")))]);
        let delay = CollectOptions {
            target_count: 3,
            page_delay: Duration::from_secs(1),
        };
        let start = Instant::now();
        let got = collect_posts(&src, "Steam", &delay).await;

        assert_eq!(got.stop, StopReason::TargetReached);
        assert_eq!(got.posts.len(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }
}
