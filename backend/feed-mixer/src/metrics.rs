//! Feed Mixer Metrics
//!
//! Prometheus metrics for the mixing pipeline, registered in the default
//! registry so the host's `/metrics` handler exports them.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::time::Duration;

pub(crate) static ITEMS_INJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_mixer_items_injected_total",
        "Total items injected into mixed feeds",
        &["variant"]
    )
    .expect("Failed to register feed mixer injected items metric")
});

pub(crate) static CAROUSEL_OUTCOMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_mixer_carousel_outcomes_total",
        "Carousel injection attempts (placed/ineligible/empty/failed/timed_out)",
        &["outcome"]
    )
    .expect("Failed to register feed mixer carousel outcomes metric")
});

pub(crate) static SOURCING_SUBSTITUTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_mixer_sourcing_substitutions_total",
        "Candidate source failures replaced by a substitute",
        &["source"]
    )
    .expect("Failed to register feed mixer sourcing substitutions metric")
});

pub(crate) static ITEMS_TRUNCATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "feed_mixer_items_truncated_total",
        "Total items cut by the maximum feed length"
    )
    .expect("Failed to register feed mixer truncated items metric")
});

static MIX_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "feed_mixer_mix_duration_seconds",
        "Duration of one mix call, carousel fetch included",
        vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register feed mixer mix duration metric")
});

/// Carousel attempt outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselOutcome {
    Placed,
    Ineligible,
    Empty,
    Failed,
    TimedOut,
}

impl CarouselOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarouselOutcome::Placed => "placed",
            CarouselOutcome::Ineligible => "ineligible",
            CarouselOutcome::Empty => "empty",
            CarouselOutcome::Failed => "failed",
            CarouselOutcome::TimedOut => "timed_out",
        }
    }
}

/// Record injected items by variant (ad/tv_post)
pub fn record_injected(variant: &str, count: usize) {
    if count > 0 {
        ITEMS_INJECTED_TOTAL
            .with_label_values(&[variant])
            .inc_by(count as u64);
    }
}

pub fn record_carousel_outcome(outcome: CarouselOutcome) {
    CAROUSEL_OUTCOMES_TOTAL
        .with_label_values(&[outcome.as_str()])
        .inc();
}

/// Record a failed source (organic_posts/ads/tv_posts) replaced by its substitute
pub fn record_sourcing_substitution(source: &str) {
    SOURCING_SUBSTITUTIONS_TOTAL
        .with_label_values(&[source])
        .inc();
}

pub fn record_truncated(count: usize) {
    if count > 0 {
        ITEMS_TRUNCATED_TOTAL.inc_by(count as u64);
    }
}

pub fn record_mix_duration(duration: Duration) {
    MIX_DURATION_SECONDS.observe(duration.as_secs_f64());
}
