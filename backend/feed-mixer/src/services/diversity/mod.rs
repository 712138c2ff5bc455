use crate::models::FeedItem;
use tracing::debug;

pub const DEFAULT_DIVERSITY_WINDOW: usize = 1;

/// Result of a diversity pass
#[derive(Debug, Clone)]
pub struct DiversityOutcome {
    pub posts: Vec<FeedItem>,
    /// Posts that could not stay at their ranked position
    pub deferred: usize,
    /// Deferred posts appended even though they still repeat a recent creator
    pub forced: usize,
}

/// Creator diversity enforcement
///
/// Walks the ranked list once and keeps a post only when its creator is not
/// among the last `window` kept creators. Conflicting posts are deferred and
/// retried against the tail of the output once the scan is over. Diversity is
/// a soft constraint: posts that can never be placed cleanly are appended in
/// their original relative order instead of being dropped, so the output
/// always has the same length as the input.
#[derive(Debug, Clone)]
pub struct DiversityEnforcer {
    window: usize,
}

impl Default for DiversityEnforcer {
    fn default() -> Self {
        Self::new(DEFAULT_DIVERSITY_WINDOW)
    }
}

impl DiversityEnforcer {
    /// A window of 0 disables the check
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn enforce(&self, posts: Vec<FeedItem>) -> Vec<FeedItem> {
        self.rerank(posts).posts
    }

    pub fn rerank(&self, posts: Vec<FeedItem>) -> DiversityOutcome {
        if self.window == 0 || posts.len() < 2 {
            return DiversityOutcome {
                posts,
                deferred: 0,
                forced: 0,
            };
        }

        let mut kept: Vec<FeedItem> = Vec::with_capacity(posts.len());
        let mut deferred: Vec<FeedItem> = Vec::new();

        for post in posts {
            if self.violates_creator_diversity(&kept, &post) {
                deferred.push(post);
            } else {
                kept.push(post);
            }
        }

        let deferred_count = deferred.len();

        // Retry in original order until a full pass places nothing
        while !deferred.is_empty() {
            let before = deferred.len();
            let mut still_deferred = Vec::with_capacity(before);

            for post in deferred {
                if self.violates_creator_diversity(&kept, &post) {
                    still_deferred.push(post);
                } else {
                    kept.push(post);
                }
            }

            deferred = still_deferred;
            if deferred.len() == before {
                break;
            }
        }

        let forced = deferred.len();
        if forced > 0 {
            debug!(
                "Diversity window={} unsatisfiable for {} posts, appending anyway",
                self.window, forced
            );
        }
        kept.extend(deferred);

        DiversityOutcome {
            posts: kept,
            deferred: deferred_count,
            forced,
        }
    }

    /// Check if adding this post repeats a creator inside the recent window
    fn violates_creator_diversity(&self, kept: &[FeedItem], post: &FeedItem) -> bool {
        let Some(creator) = post.creator_id() else {
            return false;
        };

        kept.iter()
            .rev()
            .take(self.window)
            .any(|recent| recent.creator_id() == Some(creator))
    }
}
