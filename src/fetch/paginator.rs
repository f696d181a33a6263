use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::FetchError;

/// Page-walking limits for one listing endpoint
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    pub page_size: usize,
    /// Hard cap on pages requested per run
    pub max_pages: u32,
    /// Pause between pages, never after the last one
    pub page_delay: Duration,
}

/// Position of the page being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
    /// 0-based record offset
    pub offset: usize,
    pub limit: usize,
}

/// One decoded page
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// Whether the source says more pages follow
    pub more_available: bool,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, more_available: bool) -> Self {
        Self {
            records,
            more_available,
        }
    }

    /// Convention for sources that only signal the end with a short page
    pub fn from_full_page_rule(records: Vec<T>, limit: usize) -> Self {
        let more_available = records.len() == limit;
        Self::new(records, more_available)
    }
}

/// Fetch every page of a listing and return the records in order.
///
/// Stops when the source reports no more pages, when a page comes back
/// empty, or when `max_pages` is reached. Any page failure aborts the whole
/// walk; retries already happened inside `fetch_page`.
pub async fn fetch_all_pages<T, F, Fut>(
    label: &str,
    config: &PaginationConfig,
    mut fetch_page: F,
) -> Result<Vec<T>, FetchError>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, FetchError>>,
{
    let mut all = Vec::new();
    let mut page = 1;

    loop {
        if page > config.max_pages {
            warn!(
                "⚠️ {}: stopped at page cap ({} pages, {} records)",
                label,
                config.max_pages,
                all.len()
            );
            break;
        }

        let request = PageRequest {
            page,
            offset: (page as usize - 1) * config.page_size,
            limit: config.page_size,
        };

        info!("📦 Fetching {} page {}...", label, page);
        let Page {
            records,
            more_available,
        } = fetch_page(request).await?;

        if records.is_empty() {
            break;
        }

        let count = records.len();
        all.extend(records);
        info!("✅ {} page {}: {} records (total so far: {})", label, page, count, all.len());

        if !more_available || page == config.max_pages {
            if more_available {
                warn!("⚠️ {}: page cap {} reached with more pages available", label, config.max_pages);
            }
            break;
        }

        page += 1;
        if !config.page_delay.is_zero() {
            tokio::time::sleep(config.page_delay).await;
        }
    }

    Ok(all)
}
