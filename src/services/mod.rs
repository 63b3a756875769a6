pub mod favicon;
pub mod link_manager;

pub use favicon::{FaviconStrategy, DEFAULT_FAVICON};
pub use link_manager::{LinkManager, NewLink};
