//! Slotted injection of secondary ranked lists (ads, tv posts) into a feed
//!
//! One injector type serves every injected variant; the differences between
//! call sites live entirely in `InjectionRules`:
//! - `frequency_cap`: minimum distance between two items of the variant
//! - `max_per_feed`: hard cap on items of the variant in one feed
//! - `min_position`: nothing is injected before this index of the
//!   pre-injection feed
//!
//! Opportunities are computed against the feed as it stands (which may
//! already hold items of other injected variants) and insertion is a single
//! walk over that feed, so earlier placements only ever shift, never reorder.

use crate::error::{FeedError, Result};
use crate::models::{Ad, FeedItem, FeedVariant, TvPost};
use tracing::debug;

/// Position and frequency rules for one injected variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionRules {
    pub frequency_cap: usize,
    pub max_per_feed: usize,
    pub min_position: usize,
}

impl InjectionRules {
    /// Build a rule set from raw (possibly signed) configuration values.
    ///
    /// Negative values are a configuration bug and are rejected here so the
    /// injector itself never has to reason about them.
    pub fn new(frequency_cap: i64, max_per_feed: i64, min_position: i64) -> Result<Self> {
        Ok(Self {
            frequency_cap: non_negative("frequency_cap", frequency_cap)?,
            max_per_feed: non_negative("max_per_feed", max_per_feed)?,
            min_position: non_negative("min_position", min_position)?,
        })
    }

    /// Ads: at most 3 per feed, 5 items apart, never in the first two slots
    pub fn ads() -> Self {
        Self {
            frequency_cap: 5,
            max_per_feed: 3,
            min_position: 2,
        }
    }

    /// TV posts: at most 5 per feed, 10 items apart, starting at index 3
    pub fn tv_posts() -> Self {
        Self {
            frequency_cap: 10,
            max_per_feed: 5,
            min_position: 3,
        }
    }
}

fn non_negative(field: &str, value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        FeedError::Configuration(format!("{} must be non-negative, got {}", field, value))
    })
}

/// Secondary item that can be placed by a `SlottedInjector`
pub trait Injectable: Clone {
    const VARIANT: FeedVariant;

    /// Wrap into a feed item tagged with the opportunity it was placed at
    fn into_injected(self, opportunity: usize) -> FeedItem;
}

impl Injectable for Ad {
    const VARIANT: FeedVariant = FeedVariant::Ad;

    fn into_injected(mut self, opportunity: usize) -> FeedItem {
        self.injection_position = Some(opportunity);
        FeedItem::Ad(self)
    }
}

impl Injectable for TvPost {
    const VARIANT: FeedVariant = FeedVariant::TvPost;

    fn into_injected(mut self, opportunity: usize) -> FeedItem {
        self.injection_position = Some(opportunity);
        FeedItem::TvPost(self)
    }
}

/// Find indices of `feed` where an item of `variant` may be inserted.
///
/// Slots already holding an injected item are never opportunities. Items of
/// the same variant already in the feed constrain spacing on both sides: an
/// opportunity must be at least `frequency_cap` after the previous one
/// (including any before `min_position`) and `frequency_cap` before the next
/// one. The number of opportunities never exceeds the variant's remaining
/// budget (`max_per_feed` minus items of the variant already in the feed).
pub fn find_opportunities(
    feed: &[FeedItem],
    rules: &InjectionRules,
    variant: FeedVariant,
) -> Vec<usize> {
    let existing: Vec<usize> = feed
        .iter()
        .enumerate()
        .filter(|(_, item)| item.variant() == variant)
        .map(|(index, _)| index)
        .collect();
    let budget = rules.max_per_feed.saturating_sub(existing.len());

    let mut opportunities = Vec::new();
    // None acts as a virtual injection far enough back for min_position to qualify
    let mut last_injected = existing
        .iter()
        .copied()
        .take_while(|&index| index < rules.min_position)
        .last();
    let mut upcoming = existing
        .iter()
        .copied()
        .skip_while(|&index| index < rules.min_position)
        .peekable();

    for (index, item) in feed.iter().enumerate().skip(rules.min_position) {
        if opportunities.len() >= budget {
            break;
        }

        while upcoming.next_if(|&next| next <= index).is_some() {}

        if item.is_injected() {
            if item.variant() == variant {
                last_injected = Some(index);
            }
            continue;
        }

        let after_last = match last_injected {
            Some(last) => index - last >= rules.frequency_cap,
            None => true,
        };
        let before_next = match upcoming.peek() {
            Some(&next) => next - index >= rules.frequency_cap,
            None => true,
        };

        if after_last && before_next {
            opportunities.push(index);
            last_injected = Some(index);
        }
    }

    opportunities
}

/// Insert `items` before the feed entries at `opportunities`.
///
/// Items and opportunities are consumed pairwise; surplus on either side is
/// ignored. Opportunities are pre-injection indices: item `k` lands directly
/// before the entry originally at `opportunities[k]`. Indices past the end of
/// the feed are clamped to the tail. Neither input is modified.
pub fn inject<T: Injectable>(feed: &[FeedItem], items: &[T], opportunities: &[usize]) -> Vec<FeedItem> {
    let mut queued: Vec<(usize, &T)> = opportunities.iter().copied().zip(items.iter()).collect();
    if queued.is_empty() {
        return feed.to_vec();
    }
    queued.sort_by_key(|(opportunity, _)| *opportunity);

    let mut out = Vec::with_capacity(feed.len() + queued.len());
    let mut pending = queued.into_iter().peekable();

    for (index, entry) in feed.iter().enumerate() {
        while let Some((opportunity, item)) = pending.next_if(|(o, _)| *o <= index) {
            out.push(item.clone().into_injected(opportunity));
        }
        out.push(entry.clone());
    }

    for (opportunity, item) in pending {
        out.push(item.clone().into_injected(opportunity));
    }

    out
}

#[derive(Debug, Clone)]
pub struct InjectionOutcome {
    pub feed: Vec<FeedItem>,
    pub injected: usize,
}

/// Rule-parameterized injector, instantiated once per injected variant
#[derive(Debug, Clone)]
pub struct SlottedInjector {
    rules: InjectionRules,
}

impl SlottedInjector {
    pub fn new(rules: InjectionRules) -> Self {
        Self { rules }
    }

    pub fn find_opportunities<T: Injectable>(&self, feed: &[FeedItem]) -> Vec<usize> {
        find_opportunities(feed, &self.rules, T::VARIANT)
    }

    pub fn apply<T: Injectable>(&self, feed: &[FeedItem], items: &[T]) -> InjectionOutcome {
        if items.is_empty() {
            return InjectionOutcome {
                feed: feed.to_vec(),
                injected: 0,
            };
        }

        let opportunities = self.find_opportunities::<T>(feed);
        let injected = opportunities.len().min(items.len());

        debug!(
            "Injecting {}: available={} opportunities={} injected={}",
            T::VARIANT.as_str(),
            items.len(),
            opportunities.len(),
            injected
        );

        InjectionOutcome {
            feed: inject(feed, items, &opportunities),
            injected,
        }
    }
}
