use super::price_range::PriceRange;

/// First pagination offset the site accepts.
pub const FIRST_OFFSET: u32 = 1;

/// One fetch attempt against a price window.
///
/// `attempt_count` only grows while the same offset is retried (soft ban,
/// network failure); moving to the next page starts a fresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub range: PriceRange,
    pub pagination_offset: u32,
    pub attempt_count: u32,
}

impl PageRequest {
    pub fn first(range: PriceRange) -> Self {
        Self {
            range,
            pagination_offset: FIRST_OFFSET,
            attempt_count: 1,
        }
    }

    pub fn is_first_page(&self) -> bool {
        self.pagination_offset == FIRST_OFFSET
    }

    /// Same offset, one more attempt.
    pub fn retry(self) -> Self {
        Self {
            attempt_count: self.attempt_count + 1,
            ..self
        }
    }

    pub fn next_page(self, page_size: u32) -> Self {
        Self {
            range: self.range,
            pagination_offset: self.pagination_offset + page_size,
            attempt_count: 1,
        }
    }
}
