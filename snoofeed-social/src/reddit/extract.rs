//! Walks a `SubredditFeedSdui` response down to its post-bearing cell groups.
//!
//! The response shape is not a contract, so a missing step on the path is
//! reported as a [`MissingPath`] next to an empty result instead of an error.
use super::types::{Cell, PartialPost, PostRecord};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

const FEED_ELEMENT_EDGE: &str = "FeedElementEdge";
const CELL_GROUP: &str = "CellGroup";

/// First step of the expected document path that was absent or null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("response is missing `{0}`")]
pub struct MissingPath(pub &'static str);

/// Posts found on one page, plus the shape anomaly if the walk stopped early.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtract {
    pub posts: Vec<PostRecord>,
    pub missing: Option<MissingPath>,
}

fn step<'a>(v: &'a Value, key: &str, path: &'static str) -> Result<&'a Value, MissingPath> {
    v.get(key)
        .filter(|next| !next.is_null())
        .ok_or(MissingPath(path))
}

fn elements(doc: &Value) -> Result<&Value, MissingPath> {
    let data = step(doc, "data", "data")?;
    let feed = step(data, "subredditV3", "data.subredditV3")?;
    step(feed, "elements", "data.subredditV3.elements")
}

fn edge_list(doc: &Value) -> Result<&[Value], MissingPath> {
    const PATH: &str = "data.subredditV3.elements.edges";
    step(elements(doc)?, "edges", PATH)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or(MissingPath(PATH))
}

fn typename(v: &Value) -> Option<&str> {
    v.get("__typename").and_then(Value::as_str)
}

/// Build a post from the cells of one group; `None` if any field is missing.
pub fn post_from_cells(cells: &[Value]) -> Option<PostRecord> {
    let mut post = PartialPost::default();
    for cell in cells {
        post.apply(Cell::deserialize(cell).unwrap_or(Cell::Other));
    }
    post.complete()
}

/// Extract every complete post on the page, in edge order.
pub fn extract_posts(doc: &Value) -> PageExtract {
    let edges = match edge_list(doc) {
        Ok(edges) => edges,
        Err(missing) => {
            return PageExtract {
                posts: Vec::new(),
                missing: Some(missing),
            };
        }
    };

    let posts = edges
        .iter()
        .filter(|edge| typename(edge) == Some(FEED_ELEMENT_EDGE))
        .filter_map(|edge| edge.get("node"))
        .filter(|node| typename(node) == Some(CELL_GROUP))
        .filter_map(|node| {
            let cells = node
                .get("cells")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            post_from_cells(cells)
        })
        .collect();

    PageExtract {
        posts,
        missing: None,
    }
}

/// Cursor for the next page; `None` when absent, null or empty.
pub fn extract_next_cursor(doc: &Value) -> Option<String> {
    elements(doc)
        .ok()?
        .get("pageInfo")?
        .get("endCursor")?
        .as_str()
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
}
