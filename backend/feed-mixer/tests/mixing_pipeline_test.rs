//! Integration Tests: Feed Mixer - full pipeline
//!
//! Coverage:
//! - Mixed output with no ads/tv posts equals dedupe + diversity, truncated
//! - Injected variants respect min position, max count and spacing
//! - Carousel failures never break the feed
//! - Paging over a cached mixed feed
//! - Sourcing → mixing end to end with failing sources
//! - A shared mixer gives identical results across concurrent requests

use async_trait::async_trait;
use chrono::Utc;
use feed_mixer::{
    paginate, Ad, CandidateGatherer, CandidateSet, CandidateSource, Carousel, CarouselInjector,
    CarouselProvider, CarouselRules, DiversityEnforcer, FeedItem, FeedMixer, FeedVariant,
    InjectionRules, MixedFeedCache, NoCarousel, OrganicPost, PageCursor, SeenSet, SessionContext,
    SourcingConfig, SourcingRequest, TvPost,
};
use std::sync::Arc;

fn post(id: usize, creator: &str) -> FeedItem {
    FeedItem::OrganicPost(OrganicPost {
        id: format!("post-{}", id),
        creator_id: creator.to_string(),
        content: format!("post body {}", id),
        media_urls: vec![],
        created_at: 1_700_000_000 - id as i64,
        ranking_score: 1.0 - id as f64 * 0.001,
    })
}

fn distinct_posts(n: usize) -> Vec<FeedItem> {
    (0..n).map(|i| post(i, &format!("creator-{}", i))).collect()
}

fn ads(n: usize) -> Vec<Ad> {
    (0..n)
        .map(|i| Ad {
            id: format!("ad-{}", i),
            advertiser_id: Some(format!("advertiser-{}", i)),
            content: "Sponsored".to_string(),
            media_url: None,
            link_url: Some("https://example.com/ad".to_string()),
            target_tags: vec!["music".to_string()],
            ecpm: 20.0 - i as f64,
            injection_position: None,
        })
        .collect()
}

fn tv_posts(n: usize) -> Vec<TvPost> {
    (0..n)
        .map(|i| TvPost {
            id: format!("tv-{}", i),
            tv_profile_id: format!("tv-profile-{}", i % 2),
            title: format!("Clip {}", i),
            url: format!("https://example.com/tv/{}", i),
            description: None,
            image_url: None,
            published_at: Utc::now(),
            likes_count: 3,
            comments_count: 1,
            injection_position: None,
        })
        .collect()
}

struct StaticCarousel;

#[async_trait]
impl CarouselProvider for StaticCarousel {
    async fn is_eligible(&self, _: &str, _: &SessionContext) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn fetch(&self, _: &str, _: &SessionContext) -> anyhow::Result<Option<Carousel>> {
        Ok(Some(Carousel {
            id: "carousel-people".to_string(),
            title: Some("People you may know".to_string()),
            entries: vec![serde_json::json!({"userId": "u-9"})],
            injection_position: None,
        }))
    }
}

struct BrokenCarousel;

#[async_trait]
impl CarouselProvider for BrokenCarousel {
    async fn is_eligible(&self, _: &str, _: &SessionContext) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn fetch(&self, _: &str, _: &SessionContext) -> anyhow::Result<Option<Carousel>> {
        Err(anyhow::anyhow!("carousel collection missing"))
    }
}

fn positions(feed: &[FeedItem], variant: FeedVariant) -> Vec<usize> {
    feed.iter()
        .enumerate()
        .filter(|(_, i)| i.variant() == variant)
        .map(|(idx, _)| idx)
        .collect()
}

#[tokio::test]
async fn test_no_ads_no_tv_equals_organic_pipeline() {
    let organic: Vec<FeedItem> = ["A", "B", "A", "A", "C", "C", "D", "E", "A", "F"]
        .iter()
        .enumerate()
        .map(|(i, c)| post(i, c))
        .collect();
    let candidates = CandidateSet {
        organic_posts: organic.clone(),
        ads: vec![],
        tv_posts: vec![],
    };
    let seen: SeenSet = ["post-1"].into_iter().collect();

    let mixer = FeedMixer::with_defaults(Arc::new(NoCarousel));
    let feed = mixer
        .mix(&candidates, "user-1", &SessionContext::new("s1"), &seen)
        .await;

    let mut expected = DiversityEnforcer::new(1).enforce(feed_mixer::dedupe(&organic, &seen));
    expected.truncate(mixer.max_feed_length());

    assert_eq!(feed.items(), expected.as_slice());
    assert_eq!(feed.len(), 9);
}

#[tokio::test]
async fn test_injected_variants_obey_their_rules() {
    let ad_rules = InjectionRules::ads();
    let tv_rules = InjectionRules::tv_posts();
    let candidates = CandidateSet {
        organic_posts: distinct_posts(80),
        ads: ads(10),
        tv_posts: tv_posts(10),
    };

    let mixer = FeedMixer::with_defaults(Arc::new(NoCarousel));
    let feed = mixer
        .mix(&candidates, "user-1", &SessionContext::new("s1"), &SeenSet::new())
        .await;
    let items = feed.items();

    assert_eq!(feed.count_variant(FeedVariant::Ad), ad_rules.max_per_feed);
    assert_eq!(feed.count_variant(FeedVariant::TvPost), tv_rules.max_per_feed);
    assert_eq!(feed.len(), 80 + ad_rules.max_per_feed + tv_rules.max_per_feed);

    for (variant, rules) in [(FeedVariant::Ad, ad_rules), (FeedVariant::TvPost, tv_rules)] {
        let placed = positions(items, variant);

        for idx in &placed {
            let marker = items[*idx].injection_position().unwrap();
            assert!(marker >= rules.min_position);
            assert!(*idx >= rules.min_position);
        }

        for pair in placed.windows(2) {
            let others = items[pair[0] + 1..pair[1]]
                .iter()
                .filter(|i| i.variant() != variant)
                .count();
            assert!(others >= rules.frequency_cap);
            assert!(pair[1] - pair[0] >= rules.frequency_cap);
        }
    }

    // Highest eCPM ads are placed first, in order
    let placed_ads: Vec<&str> = items
        .iter()
        .filter(|i| i.variant() == FeedVariant::Ad)
        .map(|i| i.id())
        .collect();
    assert_eq!(placed_ads, vec!["ad-0", "ad-1", "ad-2"]);
}

#[tokio::test]
async fn test_tv_posts_never_share_a_slot_with_ads() {
    let candidates = CandidateSet {
        organic_posts: distinct_posts(60),
        ads: ads(3),
        tv_posts: tv_posts(5),
    };

    let feed = FeedMixer::with_defaults(Arc::new(NoCarousel))
        .mix(&candidates, "user-1", &SessionContext::new("s1"), &SeenSet::new())
        .await;

    // Organic order survives every insertion
    let organic_ids: Vec<&str> = feed
        .items()
        .iter()
        .filter(|i| i.variant() == FeedVariant::OrganicPost)
        .map(|i| i.id())
        .collect();
    let expected: Vec<String> = (0..60).map(|i| format!("post-{}", i)).collect();
    assert_eq!(organic_ids, expected.iter().map(|s| s.as_str()).collect::<Vec<_>>());

    for pair in feed.items().windows(2) {
        assert!(
            !(pair[0].variant() == FeedVariant::TvPost && pair[1].variant() == FeedVariant::Ad),
            "tv post injected directly before an ad"
        );
    }
}

#[tokio::test]
async fn test_carousel_is_placed_and_failures_are_swallowed() {
    let candidates = CandidateSet {
        organic_posts: distinct_posts(20),
        ads: vec![],
        tv_posts: vec![],
    };
    let session = SessionContext::new("s1");

    let with_carousel = FeedMixer::with_defaults(Arc::new(StaticCarousel))
        .mix(&candidates, "user-1", &session, &SeenSet::new())
        .await;
    assert_eq!(with_carousel.len(), 21);
    assert_eq!(with_carousel.get(5).map(|i| i.variant()), Some(FeedVariant::Carousel));

    let without = FeedMixer::with_defaults(Arc::new(BrokenCarousel))
        .mix(&candidates, "user-1", &session, &SeenSet::new())
        .await;
    assert_eq!(without.len(), 20);
    assert_eq!(without.count_variant(FeedVariant::Carousel), 0);
}

#[tokio::test]
async fn test_global_cap_applies_after_carousel() {
    let mixer = FeedMixer::new(
        DiversityEnforcer::default(),
        InjectionRules::ads(),
        InjectionRules::tv_posts(),
        CarouselInjector::new(
            Arc::new(StaticCarousel),
            CarouselRules {
                position: 1000,
                ..CarouselRules::default()
            },
        ),
        30,
    );
    let candidates = CandidateSet {
        organic_posts: distinct_posts(30),
        ads: ads(3),
        tv_posts: tv_posts(3),
    };

    let feed = mixer
        .mix(&candidates, "user-1", &SessionContext::new("s1"), &SeenSet::new())
        .await;

    // The carousel is clamped to the tail and then cut by the cap
    assert_eq!(feed.len(), 30);
    assert_eq!(feed.count_variant(FeedVariant::Carousel), 0);
}

#[tokio::test]
async fn test_paging_over_cached_feed() {
    let cache = MixedFeedCache::default();
    let mixer = FeedMixer::with_defaults(Arc::new(NoCarousel));
    let session = SessionContext::new("session-42");
    let candidates = CandidateSet {
        organic_posts: distinct_posts(45),
        ads: ads(2),
        tv_posts: vec![],
    };

    let feed = mixer
        .mix(&candidates, "user-1", &session, &SeenSet::new())
        .await;
    cache.insert("user-1", &session.session_id, feed);

    let mut cursor: Option<String> = None;
    let mut collected = Vec::new();
    loop {
        let feed = cache.get("user-1", &session.session_id).unwrap();
        let offset = PageCursor::decode(cursor.as_deref()).unwrap();
        let page = paginate(&feed, offset as i64, 20);
        collected.extend(page.items.iter().map(|i| i.id().to_string()));
        cursor = page.next_cursor();
        if cursor.is_none() {
            assert_eq!(page.total, 47);
            break;
        }
    }

    let cached = cache.get("user-1", &session.session_id).unwrap();
    let all: Vec<String> = (*cached)
        .clone()
        .into_items()
        .into_iter()
        .map(|i| i.id().to_string())
        .collect();
    assert_eq!(collected, all);
}

struct FlakySource;

#[async_trait]
impl CandidateSource for FlakySource {
    async fn organic_posts(&self, _identity: &str) -> anyhow::Result<Vec<FeedItem>> {
        Ok(distinct_posts(25))
    }

    async fn ads(&self, _interests: &[String], _limit: usize) -> anyhow::Result<Vec<Ad>> {
        Err(anyhow::anyhow!("ads collection missing"))
    }

    async fn tv_posts(&self, _followed: &[String], limit: usize) -> anyhow::Result<Vec<TvPost>> {
        Ok(tv_posts(limit))
    }
}

#[tokio::test]
async fn test_sourcing_failure_degrades_to_fallback_ad() {
    let gatherer = CandidateGatherer::new(Arc::new(FlakySource), SourcingConfig::default());
    let request = SourcingRequest {
        identity: "user-1".to_string(),
        interests: vec!["music".to_string()],
        followed_tv_profile_ids: vec!["tv-profile-0".to_string()],
    };

    let candidates = gatherer.gather(&request).await;
    let feed = FeedMixer::with_defaults(Arc::new(NoCarousel))
        .mix(&candidates, &request.identity, &SessionContext::new("s1"), &SeenSet::new())
        .await;

    assert_eq!(feed.count_variant(FeedVariant::Ad), 1);
    assert_eq!(feed.get(2).map(|i| i.variant()), Some(FeedVariant::Ad));
    assert!(feed.get(2).unwrap().id().starts_with("fallback_ad_"));
    assert_eq!(feed.count_variant(FeedVariant::TvPost), 3);
}

#[tokio::test]
async fn test_shared_mixer_is_deterministic_across_requests() {
    let mixer = Arc::new(FeedMixer::with_defaults(Arc::new(StaticCarousel)));
    let candidates = Arc::new(CandidateSet {
        organic_posts: (0..50).map(|i| post(i, &format!("c{}", i % 4))).collect(),
        ads: ads(4),
        tv_posts: tv_posts(6),
    });

    let mut handles = Vec::new();
    for n in 0..8 {
        let mixer = Arc::clone(&mixer);
        let candidates = Arc::clone(&candidates);
        handles.push(tokio::spawn(async move {
            mixer
                .mix(
                    &candidates,
                    &format!("user-{}", n),
                    &SessionContext::new(format!("s{}", n)),
                    &SeenSet::new(),
                )
                .await
        }));
    }

    let mut feeds = Vec::new();
    for handle in handles {
        feeds.push(handle.await.unwrap());
    }
    for feed in &feeds[1..] {
        assert_eq!(feed, &feeds[0]);
    }
}
