pub mod pool;
pub mod schema;
pub mod store;

pub use pool::{DbError, DbHandle};
pub use schema::init_schema;
pub use store::{LinkStore, ObjectStore, StorageError, StoreMode};
