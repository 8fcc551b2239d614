//! Output side of a run: the JSON file and the console summary.
use anyhow::{Context, Result};
use snoofeed_social::reddit::{Collected, PostRecord};
use serde_json::Value;
use std::borrow::Cow;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// `reddit_posts_<subreddit>.json`, in `dir` when given. An explicit path wins.
pub fn output_path(explicit: Option<&Path>, dir: Option<&Path>, subreddit: &str) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let safe: String = subreddit
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    let name = format!("reddit_posts_{safe}.json");
    match dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Write the posts as a pretty-printed JSON array. An empty run still writes `[]`.
pub fn write_posts(path: &Path, posts: &[PostRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory: {}", parent.display()))?;
    }
    let mut json = serde_json::to_string_pretty(posts)?;
    json.push('\n');
    std::fs::write(path, json)
        .with_context(|| format!("failed to write posts to {}", path.display()))?;
    Ok(())
}

/// Strings print bare; anything else prints as JSON.
fn plain(v: &Value) -> Cow<'_, str> {
    match v {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

fn write_post<W: Write>(out: &mut W, label: &str, post: &PostRecord) -> io::Result<()> {
    writeln!(out, "\n{label} post:")?;
    writeln!(out, "Title: {}", plain(&post.title))?;
    writeln!(out, "Author: {}", plain(&post.author_name))?;
    writeln!(out, "Comments: {}", plain(&post.comment_count))?;
    writeln!(out, "Created: {}", plain(&post.created_at))
}

pub fn print_summary<W: Write>(out: &mut W, collected: &Collected, saved_to: &Path) -> io::Result<()> {
    let n = collected.posts.len();
    writeln!(out, "Final collection: {n} posts")?;
    if let (Some(first), Some(last)) = (collected.posts.first(), collected.posts.last()) {
        write_post(out, "First", first)?;
        write_post(out, "Last", last)?;
    }
    writeln!(out, "\nSaved {n} posts to {}", saved_to.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use snoofeed_social::reddit::StopReason;

    fn post(title: &str) -> PostRecord {
        PostRecord {
            author_name: json!("gaben"),
            title: json!(title),
            created_at: json!("2024-07-01T12:00:00Z"),
            comment_count: json!(42),
        }
    }

    #[test]
    fn default_name_follows_subreddit() {
        assert_eq!(
            output_path(None, None, "Steam"),
            PathBuf::from("reddit_posts_Steam.json")
        );
        assert_eq!(
            output_path(None, Some(Path::new("out")), "Steam"),
            PathBuf::from("out/reddit_posts_Steam.json")
        );
        assert_eq!(
            output_path(Some(Path::new("x.json")), Some(Path::new("out")), "Steam"),
            PathBuf::from("x.json")
        );
        assert_eq!(
            output_path(None, None, "../etc"),
            PathBuf::from("reddit_posts____etc.json")
        );
    }

    #[test]
    fn writes_pretty_json_and_keeps_unicode() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("posts.json");
        write_posts(&path, &[post("Çà et là — 日本語")]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Çà et là — 日本語"));
        assert!(text.contains("\n  {\n    \"authorName\": \"gaben\","));
        let back: Vec<PostRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, vec![post("Çà et là — 日本語")]);
    }

    #[test]
    fn empty_run_writes_empty_array() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("posts.json");
        write_posts(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
    }

    #[test]
    fn summary_lists_first_and_last() {
        let collected = Collected {
            posts: vec![post("first one"), post("middle"), post("last one")],
            pages: 1,
            stop: StopReason::TargetReached,
        };
        let mut buf = Vec::new();
        print_summary(&mut buf, &collected, Path::new("reddit_posts_Steam.json")).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Final collection: 3 posts\n"));
        assert!(text.contains("First post:\nTitle: first one\nAuthor: gaben\nComments: 42\n"));
        assert!(text.contains("Last post:\nTitle: last one\n"));
        assert!(!text.contains("middle"));
        assert!(text.ends_with("Saved 3 posts to reddit_posts_Steam.json\n"));
    }

    #[test]
    fn summary_prints_non_string_values_as_json() {
        let odd = PostRecord {
            created_at: json!(1719835200),
            comment_count: json!(1.5),
            ..post("odd")
        };
        let collected = Collected {
            posts: vec![odd],
            pages: 1,
            stop: StopReason::Exhausted,
        };
        let mut buf = Vec::new();
        print_summary(&mut buf, &collected, Path::new("p.json")).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Title: odd\nAuthor: gaben\nComments: 1.5\nCreated: 1719835200\n"));
    }

    #[test]
    fn summary_of_nothing_is_short() {
        let collected = Collected {
            posts: vec![],
            pages: 0,
            stop: StopReason::AuthFailed,
        };
        let mut buf = Vec::new();
        print_summary(&mut buf, &collected, Path::new("p.json")).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Final collection: 0 posts\n\nSaved 0 posts to p.json\n"
        );
    }
}
