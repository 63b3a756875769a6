pub mod editor;
pub mod favicon;
pub mod health;
pub mod links;
pub mod pages;
