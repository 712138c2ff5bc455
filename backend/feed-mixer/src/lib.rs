pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod services;
pub mod telemetry;

pub use cache::MixedFeedCache;
pub use config::Config;
pub use error::{FeedError, Result};

pub use models::{
    Ad, CandidateSet, Carousel, FeedItem, FeedVariant, MixStats, MixedFeed, OrganicPost, Page,
    SeenSet, SessionContext, TvPost,
};
pub use services::{
    dedupe, find_opportunities, inject, paginate, CandidateGatherer, CandidateSource,
    CarouselInjector, CarouselProvider, CarouselRules, DiversityEnforcer, FeedMixer, Injectable,
    InjectionRules, NoCarousel, PageCursor, SlottedInjector, SourcingConfig, SourcingRequest,
};
