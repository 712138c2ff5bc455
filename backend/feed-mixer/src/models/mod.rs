use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Variant tag of a feed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedVariant {
    OrganicPost,
    Ad,
    TvPost,
    Carousel,
}

impl FeedVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedVariant::OrganicPost => "organic_post",
            FeedVariant::Ad => "ad",
            FeedVariant::TvPost => "tv_post",
            FeedVariant::Carousel => "carousel",
        }
    }

    /// Whether items of this variant are placed by an injector rather than ranked
    pub fn is_injected(&self) -> bool {
        !matches!(self, FeedVariant::OrganicPost)
    }
}

/// Ranked post written by a user (matches the client's FeedPostRaw shape)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganicPost {
    pub id: String,
    pub creator_id: String,
    pub content: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub created_at: i64,
    pub ranking_score: f64,
}

/// Ad selected by the auction, ranked by descending eCPM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    pub id: String,
    /// None for partner/network ads without attribution
    #[serde(default)]
    pub advertiser_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub target_tags: Vec<String>,
    pub ecpm: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injection_position: Option<usize>,
}

/// Post from a followed TV profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TvPost {
    pub id: String,
    pub tv_profile_id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub likes_count: u32,
    #[serde(default)]
    pub comments_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injection_position: Option<usize>,
}

/// Opaque engagement block rendered as one unit by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Carousel {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub entries: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injection_position: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedItem {
    OrganicPost(OrganicPost),
    Ad(Ad),
    TvPost(TvPost),
    Carousel(Carousel),
}

impl FeedItem {
    pub fn id(&self) -> &str {
        match self {
            FeedItem::OrganicPost(p) => &p.id,
            FeedItem::Ad(a) => &a.id,
            FeedItem::TvPost(t) => &t.id,
            FeedItem::Carousel(c) => &c.id,
        }
    }

    pub fn variant(&self) -> FeedVariant {
        match self {
            FeedItem::OrganicPost(_) => FeedVariant::OrganicPost,
            FeedItem::Ad(_) => FeedVariant::Ad,
            FeedItem::TvPost(_) => FeedVariant::TvPost,
            FeedItem::Carousel(_) => FeedVariant::Carousel,
        }
    }

    /// Creator/owner used for diversity checks. Unattributed ads and
    /// carousels have none.
    pub fn creator_id(&self) -> Option<&str> {
        match self {
            FeedItem::OrganicPost(p) => Some(&p.creator_id),
            FeedItem::Ad(a) => a.advertiser_id.as_deref(),
            FeedItem::TvPost(t) => Some(&t.tv_profile_id),
            FeedItem::Carousel(_) => None,
        }
    }

    /// Opportunity index recorded when an injector placed this item
    pub fn injection_position(&self) -> Option<usize> {
        match self {
            FeedItem::OrganicPost(_) => None,
            FeedItem::Ad(a) => a.injection_position,
            FeedItem::TvPost(t) => t.injection_position,
            FeedItem::Carousel(c) => c.injection_position,
        }
    }

    pub fn is_injected(&self) -> bool {
        self.variant().is_injected()
    }
}

impl From<OrganicPost> for FeedItem {
    fn from(post: OrganicPost) -> Self {
        FeedItem::OrganicPost(post)
    }
}

/// Candidate lists handed to the mixer for one request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateSet {
    /// Pre-ranked, order is meaningful
    pub organic_posts: Vec<FeedItem>,
    /// Pre-ranked by descending eCPM
    pub ads: Vec<Ad>,
    /// Pre-ranked by recency, newest first
    pub tv_posts: Vec<TvPost>,
}

/// Read-only session signals. The pipeline never mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scroll_depth: u32,
    #[serde(default)]
    pub signals: HashMap<String, serde_json::Value>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }
}

/// Ids of organic posts already returned to the requesting identity
#[derive(Debug, Clone, Default)]
pub struct SeenSet(HashSet<String>);

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SeenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        SeenSet(iter.into_iter().map(Into::into).collect())
    }
}

/// Final ordered feed. Built once by the mixer, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MixedFeed(Vec<FeedItem>);

impl From<Vec<FeedItem>> for MixedFeed {
    fn from(items: Vec<FeedItem>) -> Self {
        MixedFeed(items)
    }
}

impl MixedFeed {
    pub fn items(&self) -> &[FeedItem] {
        &self.0
    }

    pub fn get(&self, position: usize) -> Option<&FeedItem> {
        self.0.get(position)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_items(self) -> Vec<FeedItem> {
        self.0
    }

    pub fn count_variant(&self, variant: FeedVariant) -> usize {
        self.0.iter().filter(|i| i.variant() == variant).count()
    }
}

/// One paginated window over a MixedFeed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<FeedItem>,
    pub offset: usize,
    pub limit: usize,
    pub total: usize,
    pub has_more: bool,
}

/// Per-request counters collected while mixing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MixStats {
    pub organic_in: usize,
    pub deduplicated: usize,
    pub deferred_by_diversity: usize,
    pub ads_injected: usize,
    pub tv_posts_injected: usize,
    pub carousel_injected: bool,
    pub truncated: usize,
    pub final_len: usize,
}
