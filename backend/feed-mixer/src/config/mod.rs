use crate::cache::DEFAULT_FEED_TTL_SECS;
use crate::error::{FeedError, Result};
use crate::services::carousel::{
    CarouselRules, DEFAULT_CAROUSEL_FETCH_TIMEOUT, DEFAULT_CAROUSEL_POSITION,
};
use crate::services::diversity::DEFAULT_DIVERSITY_WINDOW;
use crate::services::injector::InjectionRules;
use crate::services::mixer::DEFAULT_MAX_FEED_LENGTH;
use crate::services::sourcing::{SourcingConfig, DEFAULT_AD_LIMIT, DEFAULT_TV_LIMIT};
use serde::Deserialize;
use std::time::Duration;

pub const ENV_PREFIX: &str = "FEED_MIXER_";

#[derive(Debug, Clone)]
pub struct Config {
    pub mixer: MixerConfig,
    pub sourcing: SourcingConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerConfig {
    pub max_feed_length: usize,
    pub diversity_window: usize,
    pub ad_rules: InjectionRules,
    pub tv_rules: InjectionRules,
    pub carousel: CarouselRules,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            max_feed_length: DEFAULT_MAX_FEED_LENGTH,
            diversity_window: DEFAULT_DIVERSITY_WINDOW,
            ad_rules: InjectionRules::ads(),
            tv_rules: InjectionRules::tv_posts(),
            carousel: CarouselRules::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub feed_ttl: chrono::Duration,
}

/// Flat view of the `FEED_MIXER_*` environment. Numeric values are signed so
/// that a negative setting is reported as a configuration error instead of a
/// parse error.
#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default = "default_max_feed_length")]
    max_feed_length: i64,
    #[serde(default = "default_diversity_window")]
    diversity_window: i64,

    #[serde(default = "default_ad_frequency_cap")]
    ad_frequency_cap: i64,
    #[serde(default = "default_ad_max_per_feed")]
    ad_max_per_feed: i64,
    #[serde(default = "default_ad_min_position")]
    ad_min_position: i64,

    #[serde(default = "default_tv_frequency_cap")]
    tv_frequency_cap: i64,
    #[serde(default = "default_tv_max_per_feed")]
    tv_max_per_feed: i64,
    #[serde(default = "default_tv_min_position")]
    tv_min_position: i64,

    #[serde(default = "default_carousel_position")]
    carousel_position: i64,
    #[serde(default = "default_carousel_fetch_timeout_ms")]
    carousel_fetch_timeout_ms: u64,

    #[serde(default = "default_sourcing_ad_limit")]
    sourcing_ad_limit: usize,
    #[serde(default = "default_sourcing_tv_limit")]
    sourcing_tv_limit: usize,
    #[serde(default = "default_true")]
    sourcing_fallback_ad: bool,

    #[serde(default = "default_cache_ttl_secs")]
    cache_ttl_secs: i64,
}

impl Config {
    /// Load from the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let raw = envy::prefixed(ENV_PREFIX).from_env::<RawConfig>()?;
        Self::from_raw(raw)
    }

    /// Load from explicit `(KEY, value)` pairs using the same prefix
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw = envy::prefixed(ENV_PREFIX).from_iter::<_, RawConfig>(vars)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let max_feed_length = positive("max_feed_length", raw.max_feed_length)?;
        let diversity_window = usize::try_from(raw.diversity_window).map_err(|_| {
            FeedError::Configuration(format!(
                "diversity_window must be non-negative, got {}",
                raw.diversity_window
            ))
        })?;
        let carousel_position = usize::try_from(raw.carousel_position).map_err(|_| {
            FeedError::Configuration(format!(
                "carousel_position must be non-negative, got {}",
                raw.carousel_position
            ))
        })?;
        if raw.cache_ttl_secs <= 0 {
            return Err(FeedError::Configuration(format!(
                "cache_ttl_secs must be positive, got {}",
                raw.cache_ttl_secs
            )));
        }

        Ok(Config {
            mixer: MixerConfig {
                max_feed_length,
                diversity_window,
                ad_rules: InjectionRules::new(
                    raw.ad_frequency_cap,
                    raw.ad_max_per_feed,
                    raw.ad_min_position,
                )?,
                tv_rules: InjectionRules::new(
                    raw.tv_frequency_cap,
                    raw.tv_max_per_feed,
                    raw.tv_min_position,
                )?,
                carousel: CarouselRules {
                    position: carousel_position,
                    fetch_timeout: Duration::from_millis(raw.carousel_fetch_timeout_ms),
                },
            },
            sourcing: SourcingConfig {
                ad_limit: raw.sourcing_ad_limit,
                tv_limit: raw.sourcing_tv_limit,
                fallback_ad: raw.sourcing_fallback_ad,
            },
            cache: CacheConfig {
                feed_ttl: chrono::Duration::seconds(raw.cache_ttl_secs),
            },
        })
    }
}

fn positive(field: &str, value: i64) -> Result<usize> {
    match usize::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(FeedError::Configuration(format!(
            "{} must be positive, got {}",
            field, value
        ))),
    }
}

fn default_max_feed_length() -> i64 {
    DEFAULT_MAX_FEED_LENGTH as i64
}

fn default_diversity_window() -> i64 {
    DEFAULT_DIVERSITY_WINDOW as i64
}

fn default_ad_frequency_cap() -> i64 {
    InjectionRules::ads().frequency_cap as i64
}

fn default_ad_max_per_feed() -> i64 {
    InjectionRules::ads().max_per_feed as i64
}

fn default_ad_min_position() -> i64 {
    InjectionRules::ads().min_position as i64
}

fn default_tv_frequency_cap() -> i64 {
    InjectionRules::tv_posts().frequency_cap as i64
}

fn default_tv_max_per_feed() -> i64 {
    InjectionRules::tv_posts().max_per_feed as i64
}

fn default_tv_min_position() -> i64 {
    InjectionRules::tv_posts().min_position as i64
}

fn default_carousel_position() -> i64 {
    DEFAULT_CAROUSEL_POSITION as i64
}

fn default_carousel_fetch_timeout_ms() -> u64 {
    DEFAULT_CAROUSEL_FETCH_TIMEOUT.as_millis() as u64
}

fn default_sourcing_ad_limit() -> usize {
    DEFAULT_AD_LIMIT
}

fn default_sourcing_tv_limit() -> usize {
    DEFAULT_TV_LIMIT
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_secs() -> i64 {
    DEFAULT_FEED_TTL_SECS
}
