// Cursor pagination over Graph API list endpoints

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursors: Option<Cursors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

/// One page of a list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

impl<T> Paged<T> {
    /// Cursor for the following page; `None` once the collection is exhausted
    pub fn next_cursor(&self) -> Option<&str> {
        let paging = self.paging.as_ref()?;
        paging.next.as_ref()?;
        paging.cursors.as_ref()?.after.as_deref()
    }

    pub fn has_next(&self) -> bool {
        self.next_cursor().is_some()
    }
}

/// Lazily walk every page produced by `fetch_page`.
///
/// `fetch_page` receives `None` for the first page and the previous page's
/// `after` cursor afterwards. The stream is forward-only: each page is
/// requested once, and it ends when a page has no next cursor, when a
/// cursor already seen comes back, or after yielding the first error.
pub fn paginate<T, F, Fut>(mut fetch_page: F) -> impl Stream<Item = Result<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Paged<T>>>,
{
    async_stream::try_stream! {
        let mut after: Option<String> = None;
        let mut seen: HashSet<String> = HashSet::new();
        let mut pages: usize = 0;

        loop {
            let page = fetch_page(after.clone()).await?;
            pages += 1;
            let next = page.next_cursor().map(str::to_owned);

            tracing::trace!(page = pages, items = page.data.len(), "Fetched page");

            for item in page.data {
                yield item;
            }

            match next {
                None => break,
                Some(cursor) if !seen.insert(cursor.clone()) => {
                    tracing::warn!(
                        cursor = %cursor,
                        page = pages,
                        "Pagination cursor repeated, stopping"
                    );
                    break;
                }
                Some(cursor) => after = Some(cursor),
            }
        }
    }
}
