//! Client-side state over the LeadScout HTTP API: the search session holder
//! and the leads library view.

pub mod backend;
pub mod error;
pub mod library;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use backend::{HttpBackend, LibraryBackend, SearchBackend};
pub use error::{ClientError, Result};
pub use library::LeadsLibrary;
pub use session::{ActiveSession, SearchSessionState};
