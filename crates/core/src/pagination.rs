//! Page-number pagination.
//!
//! Pages are 1-indexed. Requests outside the valid range are clamped rather
//! than rejected: anything unparsable or below 1 becomes page 1, anything
//! past the end becomes the last page. An empty listing still has one page.

/// How many page links to show on each side of the current page.
const LINK_WINDOW: u64 = 2;

/// Parse a raw `page` query value. Missing, unparsable or non-positive
/// values mean page 1. A positive integer too large to represent saturates,
/// so it still clamps to the last page.
#[must_use]
pub fn parse_page(raw: Option<&str>) -> u64 {
    let Some(digits) = raw.map(str::trim).map(|s| s.strip_prefix('+').unwrap_or(s)) else {
        return 1;
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 1;
    }
    digits.parse::<u64>().unwrap_or(u64::MAX).max(1)
}

/// Splits a listing of known size into fixed-size pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: u64,
}

impl Paginator {
    /// Create a paginator. A page size of zero is treated as one.
    #[must_use]
    pub fn new(per_page: u64) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    /// Page size.
    #[must_use]
    pub const fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Number of pages for `total` items (at least 1).
    #[must_use]
    pub const fn num_pages(&self, total: u64) -> u64 {
        if total == 0 {
            1
        } else {
            total.div_ceil(self.per_page)
        }
    }

    /// Clamp a requested page number into `1..=num_pages(total)`.
    #[must_use]
    pub fn clamp(&self, requested: u64, total: u64) -> u64 {
        requested.clamp(1, self.num_pages(total))
    }

    /// Row offset of the first item on `number`.
    #[must_use]
    pub const fn offset(&self, number: u64) -> u64 {
        number.saturating_sub(1) * self.per_page
    }

    /// Assemble a page from the items already fetched for `number`.
    #[must_use]
    pub fn page<T>(&self, items: Vec<T>, number: u64, total: u64) -> Page<T> {
        Page {
            items,
            number,
            num_pages: self.num_pages(total),
            per_page: self.per_page,
            total,
        }
    }

    /// Slice an in-memory listing. The requested page is clamped first.
    #[must_use]
    pub fn paginate_vec<T>(&self, all: Vec<T>, requested: u64) -> Page<T> {
        let total = all.len() as u64;
        let number = self.clamp(requested, total);
        let items = all
            .into_iter()
            .skip(self.offset(number) as usize)
            .take(self.per_page as usize)
            .collect();
        self.page(items, number, total)
    }

    /// An empty first page.
    #[must_use]
    pub fn empty<T>(&self) -> Page<T> {
        self.page(Vec::new(), 1, 0)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Current page number (1-indexed).
    pub number: u64,
    /// Number of pages (at least 1).
    pub num_pages: u64,
    /// Page size.
    pub per_page: u64,
    /// Total number of items across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    #[must_use]
    pub const fn previous_page(&self) -> Option<u64> {
        if self.has_previous() {
            Some(self.number - 1)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn next_page(&self) -> Option<u64> {
        if self.has_next() {
            Some(self.number + 1)
        } else {
            None
        }
    }

    /// Nearby page numbers to link to, never including the current page.
    #[must_use]
    pub fn links(&self) -> Vec<u64> {
        let first = self.number.saturating_sub(LINK_WINDOW).max(1);
        let last = (self.number + LINK_WINDOW).min(self.num_pages);
        (first..=last).filter(|&n| n != self.number).collect()
    }

    /// Transform the items while keeping the page metadata.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            per_page: self.per_page,
            total: self.total,
        }
    }
}
