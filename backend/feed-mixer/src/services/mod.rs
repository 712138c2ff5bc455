pub mod carousel;
pub mod dedup;
pub mod diversity;
pub mod injector;
pub mod mixer;
pub mod pagination;
pub mod sourcing;

pub use carousel::{CarouselInjector, CarouselProvider, CarouselRules, NoCarousel};
pub use dedup::dedupe;
pub use diversity::DiversityEnforcer;
pub use injector::{find_opportunities, inject, Injectable, InjectionRules, SlottedInjector};
pub use mixer::FeedMixer;
pub use pagination::{paginate, PageCursor};
pub use sourcing::{CandidateGatherer, CandidateSource, SourcingConfig, SourcingRequest};
