//! Cursor-driven pagination over List endpoints
//!
//! The backend reports "there is more" as a continuation URL. The cursor is
//! the value of the `start` query parameter of that URL; a missing URL and a
//! URL without the parameter both mean the sequence has ended.

use crate::client::{ListOptions, PageSource};
use crate::error::{CloudError, Result};
use url::Url;

/// Query parameter carrying the pagination cursor
pub const CURSOR_PARAM: &str = "start";

/// Extract the pagination cursor from a continuation URL.
///
/// Relative URLs (`/api/v2/targets?start=...`) are accepted.
pub fn cursor_from_url(next_url: &str) -> Result<Option<String>> {
    let parsed = match Url::parse(next_url) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse("http://localhost")
            .and_then(|base| base.join(next_url))
            .map_err(|e| cursor_error(next_url, e))?,
        Err(e) => return Err(cursor_error(next_url, e)),
    };

    Ok(parsed
        .query_pairs()
        .find(|(key, _)| key == CURSOR_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty()))
}

fn cursor_error(next_url: &str, e: url::ParseError) -> CloudError {
    CloudError::ApiError(format!(
        "error retrieving '{}' query parameter from URL '{}': {}",
        CURSOR_PARAM, next_url, e
    ))
}

/// Iterates the pages of one logical List query.
///
/// Each [`Pager::get_next`] call is independently complete, so a caller can
/// drop the pager at any point without cleanup.
pub struct Pager<'a, S, O>
where
    S: PageSource<O>,
    O: ListOptions + Send + Sync,
{
    source: &'a S,
    options: O,
    has_next: bool,
    next: Option<String>,
    pages_fetched: usize,
}

impl<'a, S, O> Pager<'a, S, O>
where
    S: PageSource<O>,
    O: ListOptions + Send + Sync,
{
    /// Create a pager starting at the first page.
    ///
    /// Fails if `options` already carries a cursor: pagination always starts
    /// from the beginning of a query.
    pub fn new(source: &'a S, options: O) -> Result<Self> {
        if options.start().is_some_and(|s| !s.is_empty()) {
            return Err(CloudError::InvalidConfig(format!(
                "the '{}' option must not be set when creating a pager",
                CURSOR_PARAM
            )));
        }

        Ok(Self {
            source,
            options,
            has_next: true,
            next: None,
            pages_fetched: 0,
        })
    }

    /// True until a page comes back without a continuation cursor
    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page
    pub async fn get_next(&mut self) -> Result<Vec<S::Item>> {
        if !self.has_next {
            return Err(CloudError::NoMoreResults);
        }

        let current = self.next.clone();
        self.options.set_start(current.clone());

        let page = self.source.list_page(&self.options).await?;

        let next = match page.next_url.as_deref() {
            Some(url) => cursor_from_url(url)?,
            None => None,
        };

        if let (Some(next_cursor), Some(used)) = (&next, &current) {
            if next_cursor == used {
                self.has_next = false;
                return Err(CloudError::CursorLoopDetected(next_cursor.clone()));
            }
        }

        self.pages_fetched += 1;
        tracing::debug!(
            "Fetched page {} ({} items, more: {})",
            self.pages_fetched,
            page.items.len(),
            next.is_some()
        );

        self.has_next = next.is_some();
        self.next = next;
        Ok(page.items)
    }

    /// Fetch every remaining page, concatenated in fetch order
    pub async fn get_all(&mut self) -> Result<Vec<S::Item>> {
        let mut all_items = Vec::new();
        while self.has_next() {
            let page = self.get_next().await?;
            all_items.extend(page);
        }
        Ok(all_items)
    }
}
