pub mod web;

pub use web::{CrawlOptions, discover};
