//! Lazy paged listings.
//!
//! A `Listing` fetches one page per exhausted buffer and stops at the first
//! empty page. A short page is not the end: the authority may cap pages
//! below the requested size. `restart` rewinds to the starting offset so the
//! same listing can be walked again against fresh data.

use crate::error::ClientResult;
use std::collections::VecDeque;

/// Upper bound the authority enforces on one page.
pub const MAX_PAGE_SIZE: u32 = 500;

type FetchPage<'a, T> = Box<dyn Fn(u32, u32) -> ClientResult<Vec<T>> + 'a>;

/// Restartable iterator over a paged collection.
pub struct Listing<'a, T> {
    fetch: FetchPage<'a, T>,
    page_size: u32,
    start: u32,
    offset: u32,
    buffer: VecDeque<T>,
    exhausted: bool,
}

impl<'a, T> Listing<'a, T> {
    /// `fetch(offset, limit)` returns one page. `page_size` is clamped to
    /// `1..=MAX_PAGE_SIZE`.
    pub fn new<F>(start: u32, page_size: u32, fetch: F) -> Self
    where
        F: Fn(u32, u32) -> ClientResult<Vec<T>> + 'a,
    {
        Self {
            fetch: Box::new(fetch),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            start,
            offset: start,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Rewinds to the first page.
    pub fn restart(&mut self) {
        self.offset = self.start;
        self.buffer.clear();
        self.exhausted = false;
    }

    fn fill(&mut self) -> ClientResult<()> {
        let page = (self.fetch)(self.offset, self.page_size)?;
        if page.is_empty() {
            self.exhausted = true;
            return Ok(());
        }
        let fetched = u32::try_from(page.len()).unwrap_or(u32::MAX);
        self.offset = self.offset.saturating_add(fetched);
        self.buffer.extend(page);
        Ok(())
    }
}

impl<T> Iterator for Listing<'_, T> {
    type Item = ClientResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(err) = self.fill() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::Listing;
    use crate::error::ClientError;
    use std::cell::Cell;

    fn serve(items: &[u32], offset: u32, limit: u32, cap: u32) -> Vec<u32> {
        let start = (offset as usize).min(items.len());
        let end = (start + limit.min(cap) as usize).min(items.len());
        items[start..end].to_vec()
    }

    #[test]
    fn pages_until_empty_page() {
        let calls = Cell::new(0);
        let items: Vec<u32> = (0..5).collect();
        let listing = Listing::new(0, 2, |offset, limit| {
            calls.set(calls.get() + 1);
            Ok(serve(&items, offset, limit, u32::MAX))
        });
        let collected: Vec<u32> = listing.map(Result::unwrap).collect();
        assert_eq!(collected, vec![0, 1, 2, 3, 4]);
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn server_cap_below_page_size_still_yields_everything() {
        let items: Vec<u32> = (0..5).collect();
        let listing = Listing::new(0, 10, |offset, limit| Ok(serve(&items, offset, limit, 2)));
        let collected: Vec<u32> = listing.map(Result::unwrap).collect();
        assert_eq!(collected, items);
    }

    #[test]
    fn fetch_is_lazy_and_restartable() {
        let calls = Cell::new(0);
        let items: Vec<u32> = (0..3).collect();
        let mut listing = Listing::new(1, 10, |offset, limit| {
            calls.set(calls.get() + 1);
            Ok(serve(&items, offset, limit, u32::MAX))
        });
        assert_eq!(calls.get(), 0);
        assert_eq!(listing.next().unwrap().unwrap(), 1);
        assert_eq!(calls.get(), 1);

        listing.restart();
        let collected: Vec<u32> = listing.map(Result::unwrap).collect();
        assert_eq!(collected, vec![1, 2]);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn error_ends_iteration() {
        let mut listing: Listing<'_, u32> =
            Listing::new(0, 0, |_, _| Err(ClientError::transport("down")));
        assert_eq!(listing.page_size(), 1);
        assert!(listing.next().unwrap().is_err());
        assert!(listing.next().is_none());
    }
}
