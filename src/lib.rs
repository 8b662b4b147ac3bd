pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod debounce;
pub mod filter;
pub mod image;
pub mod loader;
pub mod model;
pub mod pagination;
pub mod render;
pub mod session;
