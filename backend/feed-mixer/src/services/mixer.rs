//! Feed mixer
//!
//! Fixed pipeline per request:
//! 1. dedupe organic posts against the seen set
//! 2. enforce creator diversity
//! 3. inject ads
//! 4. inject tv posts (after ads, so tv slots avoid ad slots)
//! 5. maybe inject a carousel (the only awaited step)
//! 6. truncate to the global maximum length
//!
//! Stages 1-4 and 6 are synchronous and pure. The mixer itself only holds
//! immutable configuration; any bookkeeping lives inside one `mix` call, so a
//! single instance can serve concurrent requests behind an `Arc`.

use crate::config::MixerConfig;
use crate::metrics;
use crate::models::{
    CandidateSet, FeedItem, FeedVariant, MixStats, MixedFeed, SeenSet, SessionContext,
};
use crate::services::carousel::{CarouselInjector, CarouselProvider, CarouselRules};
use crate::services::dedup::dedupe;
use crate::services::diversity::DiversityEnforcer;
use crate::services::injector::{InjectionRules, SlottedInjector};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub const DEFAULT_MAX_FEED_LENGTH: usize = 100;

#[derive(Clone)]
pub struct FeedMixer {
    diversity: DiversityEnforcer,
    ad_injector: SlottedInjector,
    tv_injector: SlottedInjector,
    carousel: CarouselInjector,
    max_feed_length: usize,
}

impl FeedMixer {
    pub fn new(
        diversity: DiversityEnforcer,
        ad_rules: InjectionRules,
        tv_rules: InjectionRules,
        carousel: CarouselInjector,
        max_feed_length: usize,
    ) -> Self {
        Self {
            diversity,
            ad_injector: SlottedInjector::new(ad_rules),
            tv_injector: SlottedInjector::new(tv_rules),
            carousel,
            max_feed_length,
        }
    }

    /// Default rules: window 1, ad and tv presets, carousel at index 5, 100 items
    pub fn with_defaults(provider: Arc<dyn CarouselProvider>) -> Self {
        Self::new(
            DiversityEnforcer::default(),
            InjectionRules::ads(),
            InjectionRules::tv_posts(),
            CarouselInjector::new(provider, CarouselRules::default()),
            DEFAULT_MAX_FEED_LENGTH,
        )
    }

    pub fn from_config(config: &MixerConfig, provider: Arc<dyn CarouselProvider>) -> Self {
        Self::new(
            DiversityEnforcer::new(config.diversity_window),
            config.ad_rules,
            config.tv_rules,
            CarouselInjector::new(provider, config.carousel),
            config.max_feed_length,
        )
    }

    pub fn max_feed_length(&self) -> usize {
        self.max_feed_length
    }

    /// Steps 1-2: organic posts only, deduplicated and diversified
    pub fn prepare_organic(&self, organic_posts: &[FeedItem], seen: &SeenSet) -> Vec<FeedItem> {
        self.diversity.enforce(dedupe(organic_posts, seen))
    }

    pub async fn mix(
        &self,
        candidates: &CandidateSet,
        identity: &str,
        session: &SessionContext,
        seen: &SeenSet,
    ) -> MixedFeed {
        self.mix_with_stats(candidates, identity, session, seen).await.0
    }

    pub async fn mix_with_stats(
        &self,
        candidates: &CandidateSet,
        identity: &str,
        session: &SessionContext,
        seen: &SeenSet,
    ) -> (MixedFeed, MixStats) {
        let start = Instant::now();
        let mut stats = MixStats {
            organic_in: candidates.organic_posts.len(),
            ..Default::default()
        };

        let unique = dedupe(&candidates.organic_posts, seen);
        stats.deduplicated = stats.organic_in - unique.len();

        let diverse = self.diversity.rerank(unique);
        stats.deferred_by_diversity = diverse.deferred;

        let with_ads = self.ad_injector.apply(&diverse.posts, &candidates.ads);
        stats.ads_injected = with_ads.injected;

        let with_tv = self.tv_injector.apply(&with_ads.feed, &candidates.tv_posts);
        stats.tv_posts_injected = with_tv.injected;

        let (mut feed, carousel_injected) =
            self.carousel.maybe_inject(with_tv.feed, identity, session).await;
        stats.carousel_injected = carousel_injected;

        if feed.len() > self.max_feed_length {
            stats.truncated = feed.len() - self.max_feed_length;
            feed.truncate(self.max_feed_length);
        }
        stats.final_len = feed.len();

        metrics::record_injected(FeedVariant::Ad.as_str(), stats.ads_injected);
        metrics::record_injected(FeedVariant::TvPost.as_str(), stats.tv_posts_injected);
        metrics::record_truncated(stats.truncated);
        metrics::record_mix_duration(start.elapsed());

        info!(
            "Feed mixed: user_id={}, session={}, organic_in={}, deduplicated={}, deferred={}, ads={}, tv_posts={}, carousel={}, truncated={}, final={}",
            identity,
            session.session_id,
            stats.organic_in,
            stats.deduplicated,
            stats.deferred_by_diversity,
            stats.ads_injected,
            stats.tv_posts_injected,
            stats.carousel_injected,
            stats.truncated,
            stats.final_len
        );

        (MixedFeed::from(feed), stats)
    }
}
