//! In-process cache of materialized feeds for pagination
//!
//! A mixed feed is derived, never stored, so paging through it requires the
//! caller to keep the sequence from the first page around. This cache is owned
//! by the caller (there is no module-level instance) and keys entries by
//! identity and session:
//! - (user_id, session_id) → Arc<MixedFeed>, TTL default 5 minutes
//!
//! Expired entries are treated as misses and evicted on read; `purge_expired`
//! can be called from a background task to bound memory.

use crate::models::MixedFeed;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_FEED_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FeedKey {
    identity: String,
    session_id: String,
}

impl FeedKey {
    fn new(identity: &str, session_id: &str) -> Self {
        Self {
            identity: identity.to_string(),
            session_id: session_id.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachedFeed {
    pub feed: Arc<MixedFeed>,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MixedFeedCache {
    entries: Arc<DashMap<FeedKey, CachedFeed>>,
    ttl: Duration,
}

impl Default for MixedFeedCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_FEED_TTL_SECS))
    }
}

impl MixedFeedCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, identity: &str, session_id: &str) -> Option<Arc<MixedFeed>> {
        self.get_at(identity, session_id, Utc::now())
    }

    pub fn get_at(
        &self,
        identity: &str,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Option<Arc<MixedFeed>> {
        let key = FeedKey::new(identity, session_id);

        let hit = self.entries.get(&key).and_then(|entry| {
            if now - entry.cached_at < self.ttl {
                Some(Arc::clone(&entry.feed))
            } else {
                None
            }
        });

        match hit {
            Some(feed) => {
                debug!("Cache hit for feed:{}:{}", identity, session_id);
                Some(feed)
            }
            None => {
                // Only evict if the entry is still the stale one we saw
                self.entries
                    .remove_if(&key, |_, entry| now - entry.cached_at >= self.ttl);
                debug!("Cache miss for feed:{}:{}", identity, session_id);
                None
            }
        }
    }

    pub fn insert(&self, identity: &str, session_id: &str, feed: MixedFeed) -> Arc<MixedFeed> {
        self.insert_at(identity, session_id, feed, Utc::now())
    }

    pub fn insert_at(
        &self,
        identity: &str,
        session_id: &str,
        feed: MixedFeed,
        now: DateTime<Utc>,
    ) -> Arc<MixedFeed> {
        let feed = Arc::new(feed);
        self.entries.insert(
            FeedKey::new(identity, session_id),
            CachedFeed {
                feed: Arc::clone(&feed),
                cached_at: now,
            },
        );
        debug!(
            "Cached feed for {}:{} with TTL={}s",
            identity,
            session_id,
            self.ttl.num_seconds()
        );
        feed
    }

    /// Drop every session's feed for an identity (e.g. after a follow change)
    pub fn invalidate(&self, identity: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.identity != identity);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!("Invalidated {} feed caches for user {}", removed, identity);
        }
        removed
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.cached_at < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
