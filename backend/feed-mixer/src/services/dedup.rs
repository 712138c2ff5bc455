use crate::models::{FeedItem, SeenSet};
use tracing::debug;

/// Drop posts the requesting identity has already been shown.
///
/// Relative order of the survivors is preserved. Lookups go through the
/// seen set's hash index so the pass stays linear in the number of posts.
pub fn dedupe(posts: &[FeedItem], seen: &SeenSet) -> Vec<FeedItem> {
    if seen.is_empty() {
        return posts.to_vec();
    }

    let unique: Vec<FeedItem> = posts
        .iter()
        .filter(|post| !seen.contains(post.id()))
        .cloned()
        .collect();

    debug!(
        "Deduplicated posts: input={} removed={} remaining={}",
        posts.len(),
        posts.len() - unique.len(),
        unique.len()
    );

    unique
}
