//! # Pagination
//!
//! GitHub pages REST listings by page number and GraphQL connections by
//! cursor. The two are kept as separate strategies: REST has no total and
//! ends on a short page, GraphQL reports a total and a next-page cursor.

use std::future::Future;

use tracing::trace;

use crate::consts::PAGE_SIZE;
use crate::error::DbError;
use crate::models::PageInfo;

/// One page of a GraphQL connection
#[derive(Debug, Clone)]
pub struct CursorPage<T> {
  pub items: Vec<T>,
  pub total_count: usize,
  pub page_info: PageInfo,
}

/// Follow page numbers from 1 until a page comes back with fewer than
/// [`PAGE_SIZE`] items.
pub async fn collect_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, DbError>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<Vec<T>, DbError>>,
{
  let mut all = Vec::new();
  let mut page = 1u32;

  loop {
    let items = fetch_page(page).await?;
    let received = items.len();
    all.extend(items);
    trace!(page, received, "Fetched REST page");

    if received < PAGE_SIZE {
      return Ok(all);
    }
    page += 1;
  }
}

/// Follow `endCursor` until `limit` items (or the whole connection when
/// `None`) are collected or there is no next page. `fetch_page` receives the
/// page size to request and the cursor to continue after. Returns the items
/// and the connection's total count.
pub async fn collect_cursor<T, F, Fut>(limit: Option<usize>, mut fetch_page: F) -> Result<(Vec<T>, usize), DbError>
where
  F: FnMut(usize, Option<String>) -> Fut,
  Fut: Future<Output = Result<CursorPage<T>, DbError>>,
{
  let mut all: Vec<T> = Vec::new();
  let mut cursor: Option<String> = None;

  loop {
    let remaining = limit.map_or(PAGE_SIZE, |limit| limit.saturating_sub(all.len()));
    let page = fetch_page(remaining.clamp(1, PAGE_SIZE), cursor.take()).await?;
    let total_count = page.total_count;
    let received = page.items.len();
    all.extend(page.items);
    trace!(received, collected = all.len(), total_count, "Fetched GraphQL page");

    let target = limit.map_or(total_count, |limit| limit.min(total_count));
    let done = all.len() >= target || received == 0 || !page.page_info.has_next_page;
    match page.page_info.end_cursor {
      Some(end_cursor) if !done => cursor = Some(end_cursor),
      _ => {
        if let Some(limit) = limit {
          all.truncate(limit);
        }
        return Ok((all, total_count));
      }
    }
  }
}
