//! Concurrent candidate sourcing with graceful degradation
//!
//! Organic posts, ads and tv posts come from independent stores, so the three
//! reads are issued together. A failing source never fails the feed:
//! - organic posts → empty list
//! - ads → one house fallback ad (or nothing, when disabled)
//! - tv posts → empty list

use crate::error::FeedError;
use crate::metrics;
use crate::models::{Ad, CandidateSet, FeedItem, TvPost};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_AD_LIMIT: usize = 5;
pub const DEFAULT_TV_LIMIT: usize = 10;

/// External candidate stores
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Pre-ranked organic posts for the identity
    async fn organic_posts(&self, identity: &str) -> anyhow::Result<Vec<FeedItem>>;

    /// Auction winners ranked by descending eCPM
    async fn ads(&self, interests: &[String], limit: usize) -> anyhow::Result<Vec<Ad>>;

    /// Recent posts of followed tv profiles, newest first
    async fn tv_posts(&self, followed_profile_ids: &[String], limit: usize)
        -> anyhow::Result<Vec<TvPost>>;
}

#[derive(Debug, Clone, Default)]
pub struct SourcingRequest {
    pub identity: String,
    pub interests: Vec<String>,
    pub followed_tv_profile_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcingConfig {
    pub ad_limit: usize,
    pub tv_limit: usize,
    /// Serve a house ad when the auction fails
    pub fallback_ad: bool,
}

impl Default for SourcingConfig {
    fn default() -> Self {
        Self {
            ad_limit: DEFAULT_AD_LIMIT,
            tv_limit: DEFAULT_TV_LIMIT,
            fallback_ad: true,
        }
    }
}

/// House ad served when the auction is unavailable. Unattributed, so it
/// never counts against creator diversity.
pub fn fallback_ad() -> Ad {
    Ad {
        id: format!("fallback_ad_{}", Uuid::new_v4()),
        advertiser_id: None,
        content: "Check out our partners for amazing offers!".to_string(),
        media_url: None,
        link_url: None,
        target_tags: vec![],
        ecpm: 5.0,
        injection_position: None,
    }
}

#[derive(Clone)]
pub struct CandidateGatherer {
    source: Arc<dyn CandidateSource>,
    config: SourcingConfig,
}

impl CandidateGatherer {
    pub fn new(source: Arc<dyn CandidateSource>, config: SourcingConfig) -> Self {
        Self { source, config }
    }

    pub async fn gather(&self, request: &SourcingRequest) -> CandidateSet {
        let (organic, ads, tv) = tokio::join!(
            self.source.organic_posts(&request.identity),
            self.source.ads(&request.interests, self.config.ad_limit),
            self.fetch_tv_posts(&request.followed_tv_profile_ids),
        );

        let organic_posts = organic.unwrap_or_else(|e| {
            metrics::record_sourcing_substitution("organic_posts");
            warn!(
                "{}, continuing without organic posts (user={})",
                FeedError::Sourcing(format!("organic posts: {}", e)),
                request.identity
            );
            Vec::new()
        });

        let mut ads = ads.unwrap_or_else(|e| {
            metrics::record_sourcing_substitution("ads");
            warn!(
                "{}, using fallback ad (user={})",
                FeedError::Sourcing(format!("ad auction: {}", e)),
                request.identity
            );
            if self.config.fallback_ad {
                vec![fallback_ad()]
            } else {
                Vec::new()
            }
        });
        ads.truncate(self.config.ad_limit);

        let mut tv_posts = tv.unwrap_or_else(|e| {
            metrics::record_sourcing_substitution("tv_posts");
            warn!(
                "{}, continuing without tv posts (user={})",
                FeedError::Sourcing(format!("tv posts: {}", e)),
                request.identity
            );
            Vec::new()
        });
        tv_posts.truncate(self.config.tv_limit);

        info!(
            "Candidates gathered: user_id={}, organic={}, ads={}, tv_posts={}",
            request.identity,
            organic_posts.len(),
            ads.len(),
            tv_posts.len()
        );

        CandidateSet {
            organic_posts,
            ads,
            tv_posts,
        }
    }

    async fn fetch_tv_posts(&self, followed: &[String]) -> anyhow::Result<Vec<TvPost>> {
        if followed.is_empty() {
            return Ok(Vec::new());
        }
        self.source.tv_posts(followed, self.config.tv_limit).await
    }
}
