//! Opaque cursor paging over already-fetched collections.
//!
//! A cursor is standard base64 over a small JSON object carrying the skip,
//! page size, total count and format version. The page size is pinned by the
//! cursor once paging has started.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::json;

use crate::fleet::{
    error::{FleetError, invalid_cursor},
    types::PageResult,
};

pub const CURSOR_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CursorPayload {
    s: usize,
    p: usize,
    t: usize,
    v: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    pub skip: usize,
    pub page_size: usize,
    pub total_count: usize,
}

pub fn encode_cursor(skip: usize, page_size: usize, total_count: usize) -> String {
    let payload = json!({
        "s": skip,
        "p": page_size,
        "t": total_count,
        "v": CURSOR_VERSION,
    });
    STANDARD.encode(payload.to_string())
}

/// `None` when the token is not base64, not a cursor object, from another
/// version, or carries a zero page size.
pub fn decode_cursor(token: &str) -> Option<PaginationCursor> {
    let bytes = STANDARD.decode(token.trim()).ok()?;
    let payload: CursorPayload = serde_json::from_slice(&bytes).ok()?;
    if payload.v != CURSOR_VERSION || payload.p == 0 {
        return None;
    }
    Some(PaginationCursor {
        skip: payload.s,
        page_size: payload.p,
        total_count: payload.t,
    })
}

/// One page of `items`. A missing or blank cursor starts at the first page.
pub fn paginate<T>(
    items: Vec<T>,
    cursor: Option<&str>,
    default_page_size: usize,
) -> Result<PageResult<T>, FleetError> {
    let (skip, page_size) = match cursor.filter(|token| !token.trim().is_empty()) {
        Some(token) => {
            let cursor =
                decode_cursor(token).ok_or_else(|| invalid_cursor("Invalid cursor format"))?;
            (cursor.skip, cursor.page_size)
        }
        None => (0, default_page_size.max(1)),
    };

    let total_count = items.len();
    let page: Vec<T> = items.into_iter().skip(skip).take(page_size).collect();
    let next_cursor = (skip.saturating_add(page_size) < total_count)
        .then(|| encode_cursor(skip + page_size, page_size, total_count));

    Ok(PageResult {
        items: page,
        has_more: next_cursor.is_some(),
        next_cursor,
        total_count,
        current_page: (skip / page_size).saturating_add(1),
        page_size,
    })
}
