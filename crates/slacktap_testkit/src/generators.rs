//! Property-based test generators using proptest.
//!
//! Strategies produce paginated Slack responses whose records carry
//! unique ids, so properties can count pages and records exactly.

use crate::fixtures::{slack_numbered_page, slack_page};
use proptest::prelude::*;
use serde_json::{json, Value};
use slacktap_protocol::datetime_to_slack_ts;

/// First timestamp produced by [`slack_ts_strategy`] (2023-11-14).
pub const MIN_GENERATED_SECS: i64 = 1_700_000_000;

/// Strategy for Slack timestamps within about a year of
/// [`MIN_GENERATED_SECS`].
pub fn slack_ts_strategy() -> impl Strategy<Value = String> {
    (0i64..31_536_000, 0u32..1_000_000).prop_map(|(offset, micros)| {
        let instant = chrono::DateTime::from_timestamp(MIN_GENERATED_SECS + offset, micros * 1000)
            .unwrap_or_default();
        datetime_to_slack_ts(instant)
    })
}

/// Strategy for page sizes of a chain: `1..=max_pages` pages of
/// `0..=max_per_page` records each.
pub fn page_sizes_strategy(
    max_pages: usize,
    max_per_page: usize,
) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..=max_per_page, 1..=max_pages.max(1))
}

/// A scripted chain of pages, with the records each page carries.
#[derive(Debug, Clone)]
pub struct PageChain {
    /// Response bodies in request order.
    pub bodies: Vec<Value>,
    /// Ids of all records across the chain.
    pub ids: Vec<String>,
}

impl PageChain {
    /// Number of pages.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Returns true if the chain has no pages.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

fn page_items(prefix: &str, sizes: &[usize]) -> (Vec<Vec<Value>>, Vec<String>) {
    let mut ids = Vec::new();
    let pages = sizes
        .iter()
        .enumerate()
        .map(|(page, &size)| {
            (0..size)
                .map(|i| {
                    let id = format!("{prefix}{page}x{i}");
                    ids.push(id.clone());
                    json!({"id": id, "name": format!("user {id}")})
                })
                .collect()
        })
        .collect();
    (pages, ids)
}

/// Builds a cursor-paginated chain under `key` from page sizes.
pub fn cursor_chain(key: &str, sizes: &[usize]) -> PageChain {
    let (pages, ids) = page_items("U", sizes);
    let last = pages.len().saturating_sub(1);
    let bodies = pages
        .into_iter()
        .enumerate()
        .map(|(i, items)| {
            let next = (i < last).then(|| format!("c{}", i + 1));
            slack_page(key, items, next.as_deref())
        })
        .collect();
    PageChain { bodies, ids }
}

/// Builds a page-number chain under `key` from page sizes.
pub fn numbered_chain(key: &str, sizes: &[usize]) -> PageChain {
    let (pages, ids) = page_items("L", sizes);
    let total = u32::try_from(pages.len()).unwrap_or(u32::MAX);
    let bodies = pages
        .into_iter()
        .zip(1..)
        .map(|(items, page)| slack_numbered_page(key, items, page, total))
        .collect();
    PageChain { bodies, ids }
}

/// Strategy for cursor chains of users.
pub fn cursor_chain_strategy(max_pages: usize) -> impl Strategy<Value = PageChain> {
    page_sizes_strategy(max_pages, 5).prop_map(|sizes| cursor_chain("members", &sizes))
}
