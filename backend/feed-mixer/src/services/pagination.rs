use crate::error::{FeedError, Result};
use crate::models::{MixedFeed, Page};
use base64::{engine::general_purpose, Engine as _};

/// Slice one page out of an already materialized feed.
///
/// Negative offset/limit are treated as 0. An offset past the end yields an
/// empty page with `has_more = false`. The feed is never re-mixed here; the
/// caller keeps the MixedFeed around (see `MixedFeedCache`) between pages.
pub fn paginate(feed: &MixedFeed, offset: i64, limit: i64) -> Page {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    let total = feed.len();

    let start = offset.min(total);
    let end = offset.saturating_add(limit).min(total);
    let items = feed.items()[start..end].to_vec();

    Page {
        items,
        offset,
        limit,
        total,
        has_more: offset.saturating_add(limit) < total,
    }
}

/// Opaque offset cursor: base64 of the decimal offset
pub struct PageCursor;

impl PageCursor {
    pub fn encode(offset: usize) -> String {
        general_purpose::STANDARD.encode(offset.to_string())
    }

    /// Missing or empty cursors start from the top of the feed
    pub fn decode(cursor: Option<&str>) -> Result<usize> {
        match cursor {
            Some(cursor) if !cursor.is_empty() => {
                let decoded = general_purpose::STANDARD
                    .decode(cursor)
                    .map_err(|_| FeedError::InvalidCursor("Invalid cursor format".to_string()))?;
                let offset_str = String::from_utf8(decoded)
                    .map_err(|_| FeedError::InvalidCursor("Invalid cursor encoding".to_string()))?;
                offset_str
                    .parse::<usize>()
                    .map_err(|_| FeedError::InvalidCursor("Invalid cursor value".to_string()))
            }
            _ => Ok(0),
        }
    }
}

impl Page {
    /// Cursor for the page after this one, if any. A zero limit never
    /// advances, so it yields no cursor.
    pub fn next_cursor(&self) -> Option<String> {
        if self.has_more && self.limit > 0 {
            Some(PageCursor::encode(self.offset + self.limit))
        } else {
            None
        }
    }
}
