//! Carousel injection
//!
//! Eligibility and block content come from an external provider (e.g. "user
//! has not seen a carousel in the last N hours"). This module only decides
//! where the block goes and makes sure a slow or failing provider can never
//! break the feed: every failure path returns the feed unchanged.

use crate::error::FeedError;
use crate::metrics::{self, CarouselOutcome};
use crate::models::{Carousel, FeedItem, SessionContext};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

pub const DEFAULT_CAROUSEL_POSITION: usize = 5;
pub const DEFAULT_CAROUSEL_FETCH_TIMEOUT: Duration = Duration::from_millis(800);

/// External source of carousel blocks
#[async_trait]
pub trait CarouselProvider: Send + Sync {
    async fn is_eligible(&self, identity: &str, session: &SessionContext) -> anyhow::Result<bool>;

    async fn fetch(&self, identity: &str, session: &SessionContext)
        -> anyhow::Result<Option<Carousel>>;
}

/// Provider for deployments without carousels
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCarousel;

#[async_trait]
impl CarouselProvider for NoCarousel {
    async fn is_eligible(&self, _identity: &str, _session: &SessionContext) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn fetch(
        &self,
        _identity: &str,
        _session: &SessionContext,
    ) -> anyhow::Result<Option<Carousel>> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarouselRules {
    /// Target index in the post-injection feed, clamped to its length
    pub position: usize,
    /// Upper bound for eligibility check plus fetch
    pub fetch_timeout: Duration,
}

impl Default for CarouselRules {
    fn default() -> Self {
        Self {
            position: DEFAULT_CAROUSEL_POSITION,
            fetch_timeout: DEFAULT_CAROUSEL_FETCH_TIMEOUT,
        }
    }
}

/// Insert `carousel` at `position`, or at the tail when the feed is shorter
pub fn insert_carousel(feed: &[FeedItem], mut carousel: Carousel, position: usize) -> Vec<FeedItem> {
    let at = position.min(feed.len());
    carousel.injection_position = Some(at);

    let mut out = Vec::with_capacity(feed.len() + 1);
    out.extend_from_slice(&feed[..at]);
    out.push(FeedItem::Carousel(carousel));
    out.extend_from_slice(&feed[at..]);
    out
}

enum CarouselFetch {
    Ineligible,
    Empty,
    Ready(Carousel),
}

#[derive(Clone)]
pub struct CarouselInjector {
    provider: Arc<dyn CarouselProvider>,
    rules: CarouselRules,
}

impl CarouselInjector {
    pub fn new(provider: Arc<dyn CarouselProvider>, rules: CarouselRules) -> Self {
        Self { provider, rules }
    }

    /// Returns the (possibly) extended feed and whether a carousel was placed
    pub async fn maybe_inject(
        &self,
        feed: Vec<FeedItem>,
        identity: &str,
        session: &SessionContext,
    ) -> (Vec<FeedItem>, bool) {
        let fetched = timeout(self.rules.fetch_timeout, self.fetch_if_eligible(identity, session)).await;

        let (feed, outcome) = match fetched {
            Ok(Ok(CarouselFetch::Ready(carousel))) => {
                let feed = insert_carousel(&feed, carousel, self.rules.position);
                debug!("Carousel injected for user {}", identity);
                (feed, CarouselOutcome::Placed)
            }
            Ok(Ok(CarouselFetch::Ineligible)) => {
                debug!("User {} not eligible for carousel", identity);
                (feed, CarouselOutcome::Ineligible)
            }
            Ok(Ok(CarouselFetch::Empty)) => {
                debug!("No carousel available for user {}", identity);
                (feed, CarouselOutcome::Empty)
            }
            Ok(Err(e)) => {
                warn!("{} (user={}), serving feed without carousel", e, identity);
                (feed, CarouselOutcome::Failed)
            }
            Err(_) => {
                let e = FeedError::Carousel(format!(
                    "fetch timed out after {:?}",
                    self.rules.fetch_timeout
                ));
                warn!("{} (user={}), serving feed without carousel", e, identity);
                (feed, CarouselOutcome::TimedOut)
            }
        };

        metrics::record_carousel_outcome(outcome);
        (feed, outcome == CarouselOutcome::Placed)
    }

    async fn fetch_if_eligible(
        &self,
        identity: &str,
        session: &SessionContext,
    ) -> Result<CarouselFetch, FeedError> {
        let eligible = self
            .provider
            .is_eligible(identity, session)
            .await
            .map_err(|e| FeedError::Carousel(format!("eligibility check failed: {}", e)))?;

        if !eligible {
            return Ok(CarouselFetch::Ineligible);
        }

        let carousel = self
            .provider
            .fetch(identity, session)
            .await
            .map_err(|e| FeedError::Carousel(format!("fetch failed: {}", e)))?;

        Ok(carousel.map_or(CarouselFetch::Empty, CarouselFetch::Ready))
    }
}
