pub mod memory;
pub mod rest;
pub mod traits;
pub mod types;

pub use memory::MemoryRowStore;
pub use rest::RestRowStore;
pub use traits::RowStore;
pub use types::{Direction, Filter, Row, SelectQuery, Strictness};
