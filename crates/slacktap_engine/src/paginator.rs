//! Pagination.
//!
//! A paginator looks at a response body and decides which page to ask for
//! next. Each call first waits on the resource's rate limiter, including the
//! final call that finds no further page, so the pause after every request
//! is attributed to pagination rather than to the fetch. Paginators never
//! retry.

use crate::rate_limit::RateLimiter;
use serde_json::Value;
use slacktap_protocol::PageToken;
use std::sync::Arc;
use tracing::warn;

/// Computes the token of the next page from the current response.
pub trait Paginator: Send {
    /// Returns the next page token, or `None` at the end of pagination.
    fn next_token(&mut self, body: &Value) -> Option<PageToken>;
}

/// Declarative pagination strategy of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginatorKind {
    /// Opaque cursor read from a JSON pointer.
    Cursor {
        /// JSON pointer to the next cursor.
        pointer: String,
        /// Query parameter carrying the cursor.
        param: String,
    },
    /// Page numbers read from JSON pointers.
    PageNumber {
        /// JSON pointer to the current page number.
        page_pointer: String,
        /// JSON pointer to the total page count.
        pages_pointer: String,
        /// Query parameter carrying the page number.
        param: String,
    },
    /// The endpoint returns everything in one response.
    SinglePage,
}

impl PaginatorKind {
    /// Slack's `response_metadata.next_cursor` pagination.
    pub fn slack_cursor() -> Self {
        PaginatorKind::Cursor {
            pointer: "/response_metadata/next_cursor".into(),
            param: "cursor".into(),
        }
    }

    /// Slack's `paging.page` / `paging.pages` pagination.
    pub fn slack_paging() -> Self {
        PaginatorKind::PageNumber {
            page_pointer: "/paging/page".into(),
            pages_pointer: "/paging/pages".into(),
            param: "page".into(),
        }
    }

    /// Query parameter carrying the page token, if any.
    pub fn token_param(&self) -> Option<&str> {
        match self {
            PaginatorKind::Cursor { param, .. } | PaginatorKind::PageNumber { param, .. } => {
                Some(param)
            }
            PaginatorKind::SinglePage => None,
        }
    }

    /// Creates a fresh paginator bound to `limiter`.
    pub fn build(&self, limiter: Arc<RateLimiter>) -> Box<dyn Paginator> {
        match self {
            PaginatorKind::Cursor { pointer, .. } => {
                Box::new(CursorPaginator::new(pointer.clone(), limiter))
            }
            PaginatorKind::PageNumber {
                page_pointer,
                pages_pointer,
                ..
            } => Box::new(PageNumberPaginator::new(
                page_pointer.clone(),
                pages_pointer.clone(),
                limiter,
            )),
            PaginatorKind::SinglePage => Box::new(SinglePagePaginator::new(limiter)),
        }
    }
}

/// Reads an opaque cursor; absent, `null` or empty ends pagination.
pub struct CursorPaginator {
    pointer: String,
    limiter: Arc<RateLimiter>,
    last: Option<String>,
}

impl CursorPaginator {
    /// Creates a cursor paginator reading the JSON pointer `pointer`.
    pub fn new(pointer: impl Into<String>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            pointer: pointer.into(),
            limiter,
            last: None,
        }
    }
}

impl Paginator for CursorPaginator {
    fn next_token(&mut self, body: &Value) -> Option<PageToken> {
        self.limiter.acquire();

        let cursor = body
            .pointer(&self.pointer)
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())?
            .to_string();

        if self.last.as_deref() == Some(cursor.as_str()) {
            warn!(cursor = %cursor, "server repeated the previous cursor, stopping pagination");
            return None;
        }
        self.last = Some(cursor.clone());
        Some(PageToken::Cursor(cursor))
    }
}

/// Walks page numbers until the current page reaches the page count.
pub struct PageNumberPaginator {
    page_pointer: String,
    pages_pointer: String,
    limiter: Arc<RateLimiter>,
}

impl PageNumberPaginator {
    /// Creates a page-number paginator.
    pub fn new(
        page_pointer: impl Into<String>,
        pages_pointer: impl Into<String>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            page_pointer: page_pointer.into(),
            pages_pointer: pages_pointer.into(),
            limiter,
        }
    }
}

impl Paginator for PageNumberPaginator {
    fn next_token(&mut self, body: &Value) -> Option<PageToken> {
        self.limiter.acquire();

        let current = body.pointer(&self.page_pointer).and_then(as_page_number)?;
        let total = body.pointer(&self.pages_pointer).and_then(as_page_number)?;
        (current < total).then(|| PageToken::Page(current + 1))
    }
}

fn as_page_number(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Never returns a token.
pub struct SinglePagePaginator {
    limiter: Arc<RateLimiter>,
}

impl SinglePagePaginator {
    /// Creates a single-page paginator.
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl Paginator for SinglePagePaginator {
    fn next_token(&mut self, _body: &Value) -> Option<PageToken> {
        self.limiter.acquire();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::json;

    fn limiter(rpm: u32) -> (Arc<ManualClock>, Arc<RateLimiter>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let limiter = Arc::new(RateLimiter::per_minute(rpm, clock.clone()));
        (clock, limiter)
    }

    #[test]
    fn cursor_ends_on_empty_or_missing() {
        let (_, limiter) = limiter(0);
        let mut paginator = PaginatorKind::slack_cursor().build(limiter);

        assert_eq!(
            paginator.next_token(&json!({"response_metadata": {"next_cursor": "abc"}})),
            Some(PageToken::Cursor("abc".into()))
        );
        assert_eq!(
            paginator.next_token(&json!({"response_metadata": {"next_cursor": ""}})),
            None
        );
        assert_eq!(paginator.next_token(&json!({"ok": true})), None);
        assert_eq!(
            paginator.next_token(&json!({"response_metadata": {"next_cursor": null}})),
            None
        );
    }

    #[test]
    fn repeated_cursor_stops() {
        let (_, limiter) = limiter(0);
        let mut paginator = CursorPaginator::new("/next", limiter);
        assert!(paginator.next_token(&json!({"next": "same"})).is_some());
        assert!(paginator.next_token(&json!({"next": "same"})).is_none());
    }

    #[test]
    fn page_number_single_page_terminates_immediately() {
        let (_, limiter) = limiter(0);
        let mut paginator = PaginatorKind::slack_paging().build(limiter);
        assert_eq!(
            paginator.next_token(&json!({"paging": {"page": 1, "pages": 1}})),
            None
        );
    }

    #[test]
    fn page_number_advances() {
        let (_, limiter) = limiter(0);
        let mut paginator = PaginatorKind::slack_paging().build(limiter);
        assert_eq!(
            paginator.next_token(&json!({"paging": {"page": 1, "pages": 3}})),
            Some(PageToken::Page(2))
        );
        assert_eq!(
            paginator.next_token(&json!({"paging": {"page": "2", "pages": "3"}})),
            Some(PageToken::Page(3))
        );
        assert_eq!(
            paginator.next_token(&json!({"paging": {"page": 3, "pages": 3}})),
            None
        );
    }

    #[test]
    fn limiter_is_acquired_even_at_the_end() {
        let (clock, limiter) = limiter(60);
        let mut paginator = PaginatorKind::SinglePage.build(limiter.clone());

        assert_eq!(paginator.next_token(&json!({})), None);
        assert_eq!(limiter.stats().acquisitions, 1);
        assert_eq!(clock.total_slept(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn token_params() {
        assert_eq!(PaginatorKind::slack_cursor().token_param(), Some("cursor"));
        assert_eq!(PaginatorKind::slack_paging().token_param(), Some("page"));
        assert_eq!(PaginatorKind::SinglePage.token_param(), None);
    }

    proptest! {
        #[test]
        fn cursor_chain_terminates_after_exactly_n_pages(n in 1usize..40) {
            let (_, limiter) = limiter(0);
            let mut paginator = PaginatorKind::slack_cursor().build(limiter.clone());
            let bodies: Vec<Value> = (0..n)
                .map(|i| {
                    let next = if i + 1 < n { format!("c{}", i + 1) } else { String::new() };
                    json!({"response_metadata": {"next_cursor": next}})
                })
                .collect();

            let mut pages = 0;
            let mut index = 0;
            loop {
                pages += 1;
                match paginator.next_token(&bodies[index]) {
                    Some(PageToken::Cursor(c)) => {
                        index = c[1..].parse().unwrap();
                    }
                    Some(other) => panic!("unexpected token {other:?}"),
                    None => break,
                }
            }
            prop_assert_eq!(pages, n);
            prop_assert_eq!(limiter.stats().acquisitions, n as u64);
        }
    }
}
