//! Data layer for a pet and house sitting marketplace.
//!
//! Service seekers post listings, sitters browse the active ones and save
//! the ones they like. The crate wraps a hosted row store with typed
//! services, a query cache that invalidates after mutations, and an
//! explicitly passed session holding the current role.

pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod query;
pub mod services;
pub mod session;
pub mod store;
pub mod validation;

pub use error::{Error, Result};
pub use query::{QueryClient, QueryKey};
pub use session::{Role, Session};
