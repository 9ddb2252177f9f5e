//! Error handling.
//!
//! Error types are split by concern:
//! - **Connection errors**: driver or open failures, returned to the caller and logged at Warning
//! - **Database errors**: individual insert/delete failures, logged at Critical while work continues
//! - **Revision errors**: tag discovery failures, which degrade to sentinel tags
//! - **Initialization errors**: logger setup failures

mod types;

// Re-export public API
pub use types::{ConnectionError, DatabaseError, InitializationError, RevisionError};
