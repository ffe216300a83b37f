pub mod cache;
pub mod client;
pub mod filter;
pub mod key;

pub use cache::{QueryCache, QueryStatus};
pub use client::{QueryClient, SavedListingDetail};
pub use filter::filter_by_type;
pub use key::{ListingScope, QueryKey, SavedScope};
