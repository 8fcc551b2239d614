//! Social network clients and extractors used by snoofeed.
//!
//! Only the Reddit mobile pipeline exists: anonymous auth, the persisted
//! `SubredditFeedSdui` GraphQL query, and the walker that turns its cell
//! groups into flat post records.
pub mod reddit;
