//! Persistence for leads, search sessions and tenant settings.
//!
//! [`LeadStore`] is the seam the search proxy and the HTTP layer depend on.
//! [`PgLeadStore`] is the production implementation; [`MemoryStore`] keeps the
//! same semantics in process for tests.

pub mod error;
pub mod pg;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use error::{Result, StoreError};
pub use pg::PgLeadStore;
pub use traits::{LeadStore, PageRecord, RecordedPage};

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStore;
