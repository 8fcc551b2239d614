use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One post as written to the output file.
///
/// Fields hold whatever non-null JSON the feed sent; in practice strings, with
/// `commentCount` a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub author_name: Value,
    pub title: Value,
    pub created_at: Value,
    pub comment_count: Value,
}

/// Fields gathered from one cell group before we know whether it is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialPost {
    pub author_name: Option<Value>,
    pub title: Option<Value>,
    pub created_at: Option<Value>,
    pub comment_count: Option<Value>,
}

impl PartialPost {
    /// Fold a cell into the post; a later cell of the same kind replaces the
    /// fields of an earlier one, nulls included.
    pub fn apply(&mut self, cell: Cell) {
        match cell {
            Cell::Metadata {
                author_name,
                created_at,
            } => {
                self.author_name = author_name;
                self.created_at = created_at;
            }
            Cell::Title { title } => self.title = title,
            Cell::Action { comment_count } => self.comment_count = comment_count,
            Cell::Other => {}
        }
    }

    /// `Some` only when every field is present and non-null.
    pub fn complete(self) -> Option<PostRecord> {
        Some(PostRecord {
            author_name: self.author_name?,
            title: self.title?,
            created_at: self.created_at?,
            comment_count: self.comment_count?,
        })
    }
}

/// The cell kinds we read out of a `CellGroup`, keyed on `__typename`.
///
/// Field values are not type-checked; a JSON `null` reads as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum Cell {
    #[serde(rename = "MetadataCell", rename_all = "camelCase")]
    Metadata {
        #[serde(default)]
        author_name: Option<Value>,
        #[serde(default)]
        created_at: Option<Value>,
    },
    #[serde(rename = "TitleCell")]
    Title {
        #[serde(default)]
        title: Option<Value>,
    },
    #[serde(rename = "ActionCell", rename_all = "camelCase")]
    Action {
        #[serde(default)]
        comment_count: Option<Value>,
    },
    #[serde(other)]
    Other,
}

// ---- request bodies ----

#[derive(Debug, Serialize)]
pub(crate) struct TokenRequest {
    pub scopes: &'static [&'static str],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeedRequest<'a> {
    pub operation_name: &'a str,
    pub variables: FeedVariables<'a>,
    pub extensions: Extensions<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeedVariables<'a> {
    pub subreddit_name: &'a str,
    pub sort: &'a str,
    /// Serialized as `null` on the first page.
    pub after: Option<&'a str>,
    pub include_view_count: bool,
    pub include_carousel_recommendations: bool,
    pub include_gold_info: bool,
    pub include_media_auth: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Extensions<'a> {
    pub persisted_query: PersistedQuery<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersistedQuery<'a> {
    pub version: u32,
    pub sha256_hash: &'a str,
}
