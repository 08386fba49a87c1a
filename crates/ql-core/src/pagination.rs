//! # Pagination
//!
//! Fixed-size windows over an ordered result set. Page numbers are 1-based
//! and out-of-range requests land on the last page instead of an error.

use serde::Serialize;

/// Resolves page numbers against a total item count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: u32,
    total: i64,
}

impl Paginator {
    /// `per_page` of zero is treated as one.
    pub fn new(per_page: u32, total: i64) -> Self {
        Self {
            per_page: per_page.max(1),
            total: total.max(0),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    /// Number of pages; an empty result still has one (empty) page.
    pub fn num_pages(&self) -> u32 {
        if self.total == 0 {
            return 1;
        }
        let per_page = i64::from(self.per_page);
        ((self.total + per_page - 1) / per_page) as u32
    }

    /// Parses the raw `?page=` value. Missing or non-numeric input gives
    /// page 1; any number out of range, zero and negatives included, gives
    /// the last page.
    pub fn resolve(&self, requested: Option<&str>) -> u32 {
        let Some(raw) = requested.map(str::trim) else {
            return 1;
        };
        let digits = raw.strip_prefix(&['-', '+'][..]).unwrap_or(raw);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return 1;
        }
        match raw.parse::<i64>() {
            Ok(number) if (1..=i64::from(self.num_pages())).contains(&number) => number as u32,
            _ => self.num_pages(),
        }
    }

    /// `(limit, offset)` for the given resolved page.
    pub fn window(&self, number: u32) -> (i64, i64) {
        let limit = i64::from(self.per_page);
        (limit, i64::from(number.saturating_sub(1)) * limit)
    }

    /// Wraps fetched items into a page.
    pub fn page<T>(&self, number: u32, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number,
            num_pages: self.num_pages(),
            total: self.total,
        }
    }
}

/// A bounded slice of an ordered query result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub num_pages: u32,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_page_number(&self) -> u32 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next_page_number(&self) -> u32 {
        (self.number + 1).min(self.num_pages)
    }

    pub fn has_other_pages(&self) -> bool {
        self.num_pages > 1
    }

    /// One link per page, for rendering the page bar.
    pub fn links(&self) -> Vec<PageLink> {
        (1..=self.num_pages)
            .map(|number| PageLink {
                number,
                current: number == self.number,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub number: u32,
    pub current: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirteen_items_split_ten_and_three() {
        let paginator = Paginator::new(10, 13);
        assert_eq!(paginator.num_pages(), 2);

        let first = paginator.resolve(None);
        assert_eq!(paginator.window(first), (10, 0));

        let second = paginator.resolve(Some("2"));
        let (limit, offset) = paginator.window(second);
        assert_eq!(offset, 10);
        assert_eq!(13 - offset, 3);
        assert!(limit >= 3);
    }

    #[test]
    fn non_numeric_pages_give_the_first_page() {
        let paginator = Paginator::new(10, 13);
        assert_eq!(paginator.resolve(Some("abc")), 1);
        assert_eq!(paginator.resolve(Some("")), 1);
        assert_eq!(paginator.resolve(Some("2.5")), 1);
        assert_eq!(paginator.resolve(Some("-")), 1);
    }

    #[test]
    fn out_of_range_pages_give_the_last_page() {
        let paginator = Paginator::new(10, 13);
        assert_eq!(paginator.resolve(Some("0")), 2);
        assert_eq!(paginator.resolve(Some("-4")), 2);
        assert_eq!(paginator.resolve(Some("99")), 2);
        assert_eq!(paginator.resolve(Some("99999999999999999999")), 2);
        assert_eq!(paginator.resolve(Some(" 1 ")), 1);
    }

    #[test]
    fn empty_result_has_one_page() {
        let paginator = Paginator::new(10, 0);
        assert_eq!(paginator.num_pages(), 1);
        let page = paginator.page::<u8>(paginator.resolve(Some("3")), vec![]);
        assert_eq!(page.number, 1);
        assert!(!page.has_next());
        assert!(!page.has_previous());
        assert!(page.is_empty());
    }

    #[test]
    fn page_navigation() {
        let paginator = Paginator::new(10, 25);
        let page = paginator.page(2, vec![0u8; 10]);
        assert!(page.has_previous());
        assert!(page.has_next());
        assert_eq!(page.previous_page_number(), 1);
        assert_eq!(page.next_page_number(), 3);
        let links = page.links();
        assert_eq!(links.len(), 3);
        assert!(links[1].current);
        assert!(!links[0].current);
    }
}
