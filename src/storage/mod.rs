mod schema;
mod state;
mod store;
mod types;

pub use schema::Database;
pub use store::{KeyValueStore, MemoryStore};
pub use types::DatabaseError;
