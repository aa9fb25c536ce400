pub mod bookmarks;
pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod markdown;
pub mod note;
pub mod runs;
pub mod session;
pub mod vault;
