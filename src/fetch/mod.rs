pub mod client;
pub mod paginator;
pub mod retry;

pub use client::HttpSource;
pub use paginator::{fetch_all_pages, Page, PaginationConfig};
pub use retry::{Backoff, RetryPolicy};
