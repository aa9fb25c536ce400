pub mod client;
pub mod errors;

pub use client::{fetch_text, fetch_text_retrying, get_client};
pub use errors::FetchError;
