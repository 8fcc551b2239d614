//! Reddit mobile API integration.
//!
//! [`RedditApi`] speaks to the two endpoints the Android app uses (anonymous
//! token + persisted GraphQL feed), [`extract`] turns a feed page into
//! [`PostRecord`]s, and [`collect_posts`] strings them together page by page.
pub mod client;
pub mod collect;
pub mod error;
pub mod extract;
pub mod source;
pub mod types;

pub use client::{RedditApi, RedditSettings};
pub use collect::{CollectOptions, Collected, StopReason, collect_posts};
pub use error::RedditError;
pub use extract::{MissingPath, PageExtract, extract_next_cursor, extract_posts};
pub use source::FeedSource;
pub use types::PostRecord;
