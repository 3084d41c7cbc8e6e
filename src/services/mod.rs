pub mod collector;
pub mod fetcher;
pub mod merger;
pub mod parser;
pub mod store;
