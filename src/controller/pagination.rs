/// Page counts up to this size render one button per page.
pub const MAX_FLAT_PAGES: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

pub fn total_pages(total_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total_count.div_ceil(page_size)
    }
}

/// Page buttons for a pagination bar.
///
/// Short ranges list every page. Longer ones show the first and last page,
/// up to three pages around `page`, and an ellipsis for each gap.
pub fn page_items(page: usize, total_pages: usize) -> Vec<PageItem> {
    if total_pages <= MAX_FLAT_PAGES {
        return (1..=total_pages).map(PageItem::Page).collect();
    }

    let page = page.clamp(1, total_pages);
    let mut items = vec![PageItem::Page(1)];
    if page > 3 {
        items.push(PageItem::Ellipsis);
    }
    let lo = page.saturating_sub(1).max(2);
    let hi = (page + 1).min(total_pages - 1);
    items.extend((lo..=hi).map(PageItem::Page));
    if page + 2 < total_pages {
        items.push(PageItem::Ellipsis);
    }
    items.push(PageItem::Page(total_pages));
    items
}

/// Everything a pagination bar needs to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationModel {
    pub page: usize,
    pub total_pages: usize,
    pub items: Vec<PageItem>,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

impl PaginationModel {
    pub fn new(page: usize, total_pages: usize) -> Self {
        Self {
            page,
            total_pages,
            items: page_items(page, total_pages),
            prev_enabled: total_pages > 0 && page > 1,
            next_enabled: total_pages > 0 && page < total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageItem::{Ellipsis as E, Page as P};

    #[test]
    fn counts_round_up() {
        assert_eq!(total_pages(0, 8), 0);
        assert_eq!(total_pages(8, 8), 1);
        assert_eq!(total_pages(20, 8), 3);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn short_ranges_are_flat() {
        assert_eq!(page_items(2, 3), vec![P(1), P(2), P(3)]);
        assert_eq!(page_items(1, 7).len(), 7);
        assert!(page_items(1, 0).is_empty());
    }

    #[test]
    fn middle_page_has_both_ellipses() {
        assert_eq!(page_items(5, 10), vec![P(1), E, P(4), P(5), P(6), E, P(10)]);
    }

    #[test]
    fn near_edges_skip_redundant_ellipsis() {
        assert_eq!(page_items(1, 10), vec![P(1), P(2), E, P(10)]);
        assert_eq!(page_items(3, 10), vec![P(1), P(2), P(3), P(4), E, P(10)]);
        assert_eq!(page_items(8, 10), vec![P(1), E, P(7), P(8), P(9), P(10)]);
        assert_eq!(page_items(10, 10), vec![P(1), E, P(9), P(10)]);
    }

    #[test]
    fn prev_next_enablement() {
        let first = PaginationModel::new(1, 3);
        assert!(!first.prev_enabled && first.next_enabled);
        let last = PaginationModel::new(3, 3);
        assert!(last.prev_enabled && !last.next_enabled);
        let empty = PaginationModel::new(1, 0);
        assert!(!empty.prev_enabled && !empty.next_enabled);
    }
}
