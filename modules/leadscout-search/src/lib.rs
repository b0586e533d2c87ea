//! Search proxy for Google Maps leads with WhatsApp presence checks.

pub mod cache;
pub mod demo;
pub mod error;
pub mod presence;
pub mod providers;
pub mod proxy;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use cache::{CacheEntry, SettingsCache};
pub use demo::DemoSource;
pub use error::{Result, SearchError};
pub use providers::HttpProviders;
pub use proxy::{place_to_draft, SearchProxy};
pub use traits::{Place, PlacePage, PlaceSource, PresenceChecker, ProviderFactory, WhatsappStatus};
