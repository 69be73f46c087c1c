//! Page arithmetic and page link windows
//!
//! The total row count is only needed for navigation, so it is supplied as a
//! deferred function and evaluated at most once per paginator.

use serde::Serialize;
use std::cell::OnceCell;

use crate::{DashError, Result};

/// Pages before `current - 2` collapse once the current page reaches this index
const FRONT_COLLAPSE_FROM: u64 = 5;
/// Pages kept on either side of the current page when collapsing
const WINDOW: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageLinkKind {
    Previous,
    Page,
    Ellipsis,
    Next,
}

/// One navigation item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub kind: PageLinkKind,
    /// Zero-based target page; `None` for ellipsis markers and disabled arrows
    pub page: Option<u64>,
    pub label: String,
    pub active: bool,
    pub disabled: bool,
}

impl PageLink {
    fn page(page: u64, current: u64) -> Self {
        Self {
            kind: PageLinkKind::Page,
            page: Some(page),
            label: (page + 1).to_string(),
            active: page == current,
            disabled: false,
        }
    }

    fn ellipsis() -> Self {
        Self {
            kind: PageLinkKind::Ellipsis,
            page: None,
            label: "...".to_string(),
            active: false,
            disabled: true,
        }
    }

    fn arrow(kind: PageLinkKind, label: &str, target: Option<u64>) -> Self {
        Self {
            kind,
            page: target,
            label: label.to_string(),
            active: false,
            disabled: target.is_none(),
        }
    }
}

/// Paginator state handed to templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginatorExport {
    pub links: Vec<PageLink>,
    pub page_count: u64,
    pub total: u64,
    pub current_page: u64,
    pub per_page: u64,
}

pub struct Paginator<'a> {
    per_page: u64,
    current_page: u64,
    counter: Box<dyn Fn() -> Result<u64> + 'a>,
    count: OnceCell<u64>,
}

impl<'a> Paginator<'a> {
    /// Create a paginator; `current_page` is zero-based
    pub fn new(
        per_page: u64,
        current_page: u64,
        counter: impl Fn() -> Result<u64> + 'a,
    ) -> Result<Self> {
        if per_page == 0 {
            return Err(DashError::ValidationError(
                "Items per page must be positive".to_string(),
            ));
        }
        Ok(Self {
            per_page,
            current_page,
            counter: Box::new(counter),
            count: OnceCell::new(),
        })
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    /// Rows to skip for the current page
    pub fn limit_from(&self) -> u64 {
        self.current_page.saturating_mul(self.per_page)
    }

    /// Total row count, evaluated on first use
    pub fn count(&self) -> Result<u64> {
        if let Some(count) = self.count.get() {
            return Ok(*count);
        }
        let count = (self.counter)()?;
        let _ = self.count.set(count);
        Ok(count)
    }

    pub fn page_count(&self) -> Result<u64> {
        Ok(self.count()?.div_ceil(self.per_page))
    }

    /// Previous link, page items with collapsed ranges, next link
    ///
    /// Once the current page is 5 or more, pages between the first page and
    /// `current - 2` collapse into one ellipsis. When at least three pages
    /// follow the current one, everything after `current + 2` collapses into
    /// a trailing ellipsis.
    pub fn export_links(&self) -> Result<Vec<PageLink>> {
        let page_count = self.page_count()?;
        let current = self.current_page;

        let mut links = Vec::new();
        let previous = (current > 0).then(|| current - 1);
        links.push(PageLink::arrow(PageLinkKind::Previous, "Previous", previous));

        let collapse_front = current >= FRONT_COLLAPSE_FROM;
        let collapse_back = page_count > 0 && page_count - 1 >= current + WINDOW + 1;

        for page in 0..page_count {
            if collapse_front && page >= 1 && page < current - WINDOW {
                if page == 1 {
                    links.push(PageLink::ellipsis());
                }
                continue;
            }
            if collapse_back && page > current + WINDOW {
                links.push(PageLink::ellipsis());
                break;
            }
            links.push(PageLink::page(page, current));
        }

        let next = (current + 1 < page_count).then(|| current + 1);
        links.push(PageLink::arrow(PageLinkKind::Next, "Next", next));
        Ok(links)
    }

    pub fn export(&self) -> Result<PaginatorExport> {
        Ok(PaginatorExport {
            links: self.export_links()?,
            page_count: self.page_count()?,
            total: self.count()?,
            current_page: self.current_page,
            per_page: self.per_page,
        })
    }
}

impl std::fmt::Debug for Paginator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("per_page", &self.per_page)
            .field("current_page", &self.current_page)
            .field("count", &self.count.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;

    fn paginator(per_page: u64, current: u64, count: u64) -> Paginator<'static> {
        Paginator::new(per_page, current, move || Ok(count)).unwrap()
    }

    fn shape(links: &[PageLink]) -> Vec<String> {
        links
            .iter()
            .map(|l| match l.kind {
                PageLinkKind::Previous => "<".to_string(),
                PageLinkKind::Next => ">".to_string(),
                PageLinkKind::Ellipsis => "...".to_string(),
                PageLinkKind::Page => l.page.unwrap().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_page_count() {
        assert_eq!(paginator(10, 0, 95).page_count().unwrap(), 10);
        assert_eq!(paginator(10, 0, 100).page_count().unwrap(), 10);
        assert_eq!(paginator(10, 0, 101).page_count().unwrap(), 11);
        assert_eq!(paginator(10, 0, 0).page_count().unwrap(), 0);
    }

    #[test]
    fn test_limit_from() {
        assert_eq!(paginator(10, 0, 95).limit_from(), 0);
        assert_eq!(paginator(25, 3, 95).limit_from(), 75);
    }

    #[test]
    fn test_zero_per_page_rejected() {
        assert!(matches!(
            Paginator::new(0, 0, || Ok(1)),
            Err(DashError::ValidationError(_))
        ));
    }

    #[test]
    fn test_previous_disabled_on_first_page() {
        let links = paginator(10, 0, 95).export_links().unwrap();
        assert!(links.first().unwrap().disabled);
        assert!(!links.last().unwrap().disabled);
        assert!(links[1].active);
    }

    #[test]
    fn test_next_disabled_on_last_page() {
        let links = paginator(10, 9, 95).export_links().unwrap();
        assert!(!links.first().unwrap().disabled);
        assert_eq!(links.first().unwrap().page, Some(8));
        assert!(links.last().unwrap().disabled);
    }

    #[test]
    fn test_no_pages() {
        let links = paginator(10, 0, 0).export_links().unwrap();
        assert_eq!(shape(&links), vec!["<", ">"]);
        assert!(links.iter().all(|l| l.disabled));
    }

    #[test]
    fn test_short_range_not_collapsed() {
        let links = paginator(10, 2, 50).export_links().unwrap();
        assert_eq!(shape(&links), vec!["<", "0", "1", "2", "3", "4", ">"]);
    }

    #[test]
    fn test_collapse_both_ends() {
        let links = paginator(10, 7, 200).export_links().unwrap();
        assert_eq!(
            shape(&links),
            vec!["<", "0", "...", "5", "6", "7", "8", "9", "...", ">"]
        );
        assert!(!links.first().unwrap().disabled);
        assert!(!links.last().unwrap().disabled);
        assert!(links.iter().any(|l| l.active && l.page == Some(7)));
    }

    #[test]
    fn test_collapse_back_only() {
        let links = paginator(10, 0, 200).export_links().unwrap();
        assert_eq!(shape(&links), vec!["<", "0", "1", "2", "...", ">"]);
    }

    #[test]
    fn test_collapse_front_only_near_end() {
        let links = paginator(10, 18, 200).export_links().unwrap();
        assert_eq!(shape(&links), vec!["<", "0", "...", "16", "17", "18", "19", ">"]);
    }

    #[test]
    fn test_front_threshold() {
        let below = paginator(10, 4, 70).export_links().unwrap();
        assert!(!shape(&below)[..3].contains(&"...".to_string()));

        let at = paginator(10, 5, 70).export_links().unwrap();
        assert_eq!(shape(&at), vec!["<", "0", "...", "3", "4", "5", "6", ">"]);
    }

    #[test]
    fn test_count_is_evaluated_once() {
        let calls = Cell::new(0);
        let paginator = Paginator::new(10, 0, || {
            calls.set(calls.get() + 1);
            Ok(42)
        })
        .unwrap();

        assert_eq!(calls.get(), 0);
        paginator.export().unwrap();
        paginator.page_count().unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_count_error_propagates() {
        let paginator =
            Paginator::new(10, 0, || Err(DashError::QueryError("boom".to_string()))).unwrap();
        assert!(matches!(paginator.export(), Err(DashError::QueryError(_))));
    }

    proptest! {
        #[test]
        fn test_page_count_covers_all_rows(per_page in 1u64..200, count in 0u64..100_000) {
            let pages = paginator(per_page, 0, count).page_count().unwrap();
            prop_assert!(pages * per_page >= count);
            if count > 0 {
                prop_assert!((pages - 1) * per_page < count);
            } else {
                prop_assert_eq!(pages, 0);
            }
        }

        #[test]
        fn test_links_are_bracketed_and_current_shown(per_page in 1u64..20, count in 1u64..2_000, seed in 0u64..1_000) {
            let pages = paginator(per_page, 0, count).page_count().unwrap();
            let current = seed % pages;
            let links = paginator(per_page, current, count).export_links().unwrap();

            prop_assert_eq!(links.first().unwrap().kind, PageLinkKind::Previous);
            prop_assert_eq!(links.last().unwrap().kind, PageLinkKind::Next);
            prop_assert_eq!(links.iter().filter(|l| l.active).count(), 1);
            prop_assert!(links.iter().filter(|l| l.kind == PageLinkKind::Ellipsis).count() <= 2);
            prop_assert_eq!(links.iter().any(|l| l.page == Some(0) && l.kind == PageLinkKind::Page), true);
        }
    }
}
