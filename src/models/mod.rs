pub mod link;

pub use link::{Link, LinkPatch, NewLinkRecord};
