//! Numbered page windows shared by every listing page.

use std::num::NonZeroU32;

use serde::Serialize;

/// Page size used when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Parse the raw `page` query value into a requested page number.
///
/// Missing or non-numeric input requests the first page. Integers too large
/// for `i64` saturate so that they still clamp to the last page.
pub fn parse_page_param(raw: Option<&str>) -> i64 {
    let Some(raw) = raw.map(str::trim) else {
        return 1;
    };

    if let Ok(value) = raw.parse::<i64>() {
        return value;
    }

    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if negative { i64::MIN } else { i64::MAX }
    } else {
        1
    }
}

/// Position of one page within an ordered collection of `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    number: u64,
    num_pages: u64,
    page_size: u64,
    total: u64,
}

impl PageWindow {
    /// Resolve the raw query value against the collection size.
    pub fn resolve(total: u64, raw_page: Option<&str>, page_size: NonZeroU32) -> Self {
        Self::clamped(total, parse_page_param(raw_page), page_size)
    }

    /// Clamp `requested` to the nearest valid page. An empty collection has
    /// exactly one (empty) page.
    pub fn clamped(total: u64, requested: i64, page_size: NonZeroU32) -> Self {
        let page_size = u64::from(page_size.get());
        let num_pages = total.div_ceil(page_size).max(1);
        let number = if requested < 1 {
            1
        } else {
            (requested as u64).min(num_pages)
        };

        Self {
            number,
            num_pages,
            page_size,
            total,
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn num_pages(&self) -> u64 {
        self.num_pages
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.page_size
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }

    /// Number of items that belong on this page.
    pub fn len(&self) -> u64 {
        self.total.saturating_sub(self.offset()).min(self.page_size)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    /// 1-based index of the first item on this page, or 0 when empty.
    pub fn start_index(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.offset() + 1
        }
    }

    /// 1-based index of the last item on this page, or 0 when empty.
    pub fn end_index(&self) -> u64 {
        self.offset() + self.len()
    }
}

/// One page of items together with its window.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage<T> {
    pub window: PageWindow,
    pub items: Vec<T>,
}

impl<T> FeedPage<T> {
    pub fn new(window: PageWindow, items: Vec<T>) -> Self {
        Self { window, items }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> FeedPage<U> {
        FeedPage {
            window: self.window,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}
