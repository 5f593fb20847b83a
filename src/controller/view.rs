use std::sync::Arc;
use std::time::Instant;

use super::field::{Record, Schema};
use super::pagination::{PaginationModel, total_pages};
use super::sort::{SortDirection, SortSpec, sort_indices};
use crate::filter::Query;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("unknown field \"{0}\"")]
    UnknownField(String),
}

/// Where paging happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingMode {
    /// The whole collection is in memory.
    Client,
    /// `all` holds a single server page out of `total_count` records.
    Server { total_count: usize },
}

/// What a completed load does to the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Full reload: go back to page 1.
    ResetPage,
    /// Background refresh: keep the page, clamped to the new bounds.
    PreservePage,
}

/// A record tagged with its position in the fetched collection.
#[derive(Debug, Clone)]
pub struct Entry<R> {
    pub original_order: usize,
    pub record: R,
}

/// The rows to render plus the summary line numbers.
#[derive(Debug)]
pub struct VisiblePage<'a, R> {
    pub rows: Vec<&'a R>,
    /// 1-based index of the first row shown, 0 when nothing is shown.
    pub shown_range_start: usize,
    pub shown_range_end: usize,
    pub total_count: usize,
    pub page: usize,
    pub total_pages: usize,
}

/// Sort + filter + paginate over an in-memory record set.
#[derive(Debug)]
pub struct TabularViewController<R: Record> {
    schema: Arc<Schema<R>>,
    all: Vec<Entry<R>>,
    /// Indices into `all`.
    filtered: Vec<usize>,
    query_text: String,
    query: Query,
    sort: SortSpec,
    page: usize,
    page_size: usize,
    paging: PagingMode,
    is_loading: bool,
    has_loaded: bool,
    last_error: Option<String>,
    loaded_at: Option<Instant>,
}

impl<R: Record> TabularViewController<R> {
    /// An unknown sort field falls back to the first schema column.
    pub fn new(schema: Arc<Schema<R>>, sort: SortSpec, page_size: usize, paging: PagingMode) -> Self {
        let sort = if schema.get(&sort.field).is_some() {
            sort
        } else {
            let fallback = schema.get_index(0).map_or("", |f| f.id);
            tracing::warn!(field = %sort.field, fallback, "unknown sort field");
            SortSpec::new(fallback, sort.direction)
        };
        Self {
            schema,
            all: Vec::new(),
            filtered: Vec::new(),
            query_text: String::new(),
            query: Query::default(),
            sort,
            page: 1,
            page_size: page_size.max(1),
            paging,
            is_loading: false,
            has_loaded: false,
            last_error: None,
            loaded_at: None,
        }
    }

    // -- accessors -----------------------------------------------------------

    pub fn schema(&self) -> &Arc<Schema<R>> {
        &self.schema
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn paging(&self) -> PagingMode {
        self.paging
    }

    pub fn query(&self) -> &str {
        &self.query_text
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn has_loaded(&self) -> bool {
        self.has_loaded
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn loaded_at(&self) -> Option<Instant> {
        self.loaded_at
    }

    pub fn entries(&self) -> &[Entry<R>] {
        &self.all
    }

    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.all.iter().map(|e| &e.record)
    }

    /// Records passing the filter, in display order.
    pub fn filtered(&self) -> impl Iterator<Item = &R> {
        self.filtered.iter().map(|&i| &self.all[i].record)
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.all
            .iter()
            .map(|e| &e.record)
            .find(|r| &r.key() == key)
    }

    /// Number of records the pagination is computed over.
    pub fn total_count(&self) -> usize {
        match self.paging {
            PagingMode::Client => self.filtered.len(),
            PagingMode::Server { total_count } => total_count,
        }
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total_count(), self.page_size)
    }

    pub fn pagination(&self) -> PaginationModel {
        PaginationModel::new(self.page, self.total_pages())
    }

    // -- loading -------------------------------------------------------------

    /// Claim the single in-flight fetch slot. Returns false when a fetch is
    /// already outstanding.
    pub fn begin_load(&mut self) -> bool {
        if self.is_loading {
            tracing::debug!("load suppressed: fetch already in flight");
            return false;
        }
        self.is_loading = true;
        true
    }

    /// Apply the outcome of a fetch.
    ///
    /// A failure keeps previously loaded data; only a controller that never
    /// loaded successfully shows an empty set.
    pub fn finish_load(&mut self, result: Result<Vec<R>, String>, policy: LoadPolicy) {
        self.is_loading = false;
        match result {
            Ok(records) => self.replace_all(records, policy),
            Err(message) => {
                tracing::warn!(%message, had_data = self.has_loaded, "load failed");
                if !self.has_loaded {
                    self.all.clear();
                    self.filtered.clear();
                    self.page = 1;
                }
                self.last_error = Some(message);
            }
        }
    }

    /// Apply records from a timed background refresh.
    ///
    /// Ignored (returns false) while a foreground fetch is outstanding: that
    /// reply is newer and owns the in-flight slot, which stays claimed.
    pub fn apply_background(&mut self, records: Vec<R>) -> bool {
        if self.is_loading {
            tracing::debug!("background refresh dropped: foreground fetch in flight");
            return false;
        }
        self.replace_all(records, LoadPolicy::PreservePage);
        true
    }

    /// Release the in-flight slot without applying the reply, e.g. a server
    /// page that no longer matches the requested page.
    pub fn abandon_load(&mut self) {
        self.is_loading = false;
    }

    /// Update the server-side record count (server paging only).
    pub fn set_server_total(&mut self, total_count: usize) {
        if let PagingMode::Server { .. } = self.paging {
            self.paging = PagingMode::Server { total_count };
        }
    }

    // -- view parameters -----------------------------------------------------

    /// Re-filter from `all`, re-apply the sort and return to page 1.
    pub fn apply_filter(&mut self, input: &str) {
        self.query_text = input.to_owned();
        self.query = Query::parse(input, &self.schema);
        self.recompute();
        self.page = 1;
    }

    /// Sort by `field`. The current field flips direction; a new field
    /// starts ascending. The page number is kept.
    pub fn sort_by(&mut self, field: &str) -> Result<(), ControllerError> {
        if self.schema.get(field).is_none() {
            return Err(ControllerError::UnknownField(field.to_owned()));
        }
        self.sort = if self.sort.field == field {
            SortSpec::new(field, self.sort.direction.toggled())
        } else {
            SortSpec::new(field, SortDirection::Ascending)
        };
        self.apply_sort();
        Ok(())
    }

    /// Sort by the 0-based column position of the schema.
    pub fn sort_by_column(&mut self, column: usize) -> Result<(), ControllerError> {
        let field = self
            .schema
            .get_index(column)
            .map(|f| f.id)
            .ok_or_else(|| ControllerError::UnknownField(format!("#{}", column + 1)))?;
        self.sort_by(field)
    }

    /// Returns false (and changes nothing) for a zero size.
    pub fn set_page_size(&mut self, n: usize) -> bool {
        if n == 0 {
            return false;
        }
        self.page_size = n;
        self.page = 1;
        true
    }

    /// Returns true when the page actually changed.
    pub fn go_to_page(&mut self, n: usize) -> bool {
        if n < 1 || n > self.total_pages() || n == self.page {
            return false;
        }
        self.page = n;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        self.go_to_page(self.page.saturating_sub(1))
    }

    pub fn first_page(&mut self) -> bool {
        self.go_to_page(1)
    }

    pub fn last_page(&mut self) -> bool {
        self.go_to_page(self.total_pages())
    }

    // -- derived output ------------------------------------------------------

    pub fn compute_visible_page(&self) -> VisiblePage<'_, R> {
        let offset = (self.page - 1) * self.page_size;
        let rows: Vec<&R> = match self.paging {
            PagingMode::Client => self
                .filtered
                .iter()
                .skip(offset)
                .take(self.page_size)
                .map(|&i| &self.all[i].record)
                .collect(),
            PagingMode::Server { .. } => self.filtered().collect(),
        };
        let (shown_range_start, shown_range_end) = if rows.is_empty() {
            (0, 0)
        } else {
            (offset + 1, offset + rows.len())
        };
        VisiblePage {
            rows,
            shown_range_start,
            shown_range_end,
            total_count: self.total_count(),
            page: self.page,
            total_pages: self.total_pages(),
        }
    }

    // -- local mutation ------------------------------------------------------

    /// Drop one record after a confirmed server-side delete.
    ///
    /// Later records shift their `original_order` down by one, and the page
    /// is clamped if it became empty.
    pub fn remove_by_key(&mut self, key: &R::Key) -> Option<R> {
        let pos = self.all.iter().position(|e| &e.record.key() == key)?;
        let removed = self.all.remove(pos);
        for entry in &mut self.all {
            if entry.original_order > removed.original_order {
                entry.original_order -= 1;
            }
        }
        self.filtered.retain(|&i| i != pos);
        for i in &mut self.filtered {
            if *i > pos {
                *i -= 1;
            }
        }
        if let PagingMode::Server { total_count } = self.paging {
            self.paging = PagingMode::Server {
                total_count: total_count.saturating_sub(1),
            };
        }
        self.clamp_page();
        Some(removed.record)
    }

    // -- internals -----------------------------------------------------------

    fn replace_all(&mut self, records: Vec<R>, policy: LoadPolicy) {
        self.all = records
            .into_iter()
            .enumerate()
            .map(|(original_order, record)| Entry {
                original_order,
                record,
            })
            .collect();
        self.has_loaded = true;
        self.last_error = None;
        self.loaded_at = Some(Instant::now());
        self.recompute();
        match policy {
            LoadPolicy::ResetPage => self.page = 1,
            LoadPolicy::PreservePage => self.clamp_page(),
        }
    }

    fn recompute(&mut self) {
        let schema = &self.schema;
        let query = &self.query;
        self.filtered = self
            .all
            .iter()
            .enumerate()
            .filter(|(_, e)| query.is_empty() || query.matches(schema, &e.record))
            .map(|(i, _)| i)
            .collect();
        self.apply_sort();
    }

    fn apply_sort(&mut self) {
        let Some(field) = self.schema.get(&self.sort.field) else {
            return;
        };
        sort_indices(
            &mut self.filtered,
            &self.all,
            |e: &Entry<R>| &e.record,
            field,
            self.sort.direction,
        );
    }

    fn clamp_page(&mut self) {
        self.page = self.page.clamp(1, self.total_pages().max(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::field::{FieldDescriptor, FieldValue};

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        name: String,
        score: f64,
    }

    impl Record for Item {
        type Key = u32;
        fn key(&self) -> u32 {
            self.id
        }
    }

    fn schema() -> Arc<Schema<Item>> {
        Arc::new(Schema::new([
            FieldDescriptor::numeric("id", "ID", |i: &Item| FieldValue::Number(f64::from(i.id))),
            FieldDescriptor::text("name", "Name", |i: &Item| FieldValue::text(&i.name)).searchable(),
            FieldDescriptor::numeric("score", "Score", |i: &Item| FieldValue::Number(i.score)),
        ]))
    }

    fn items(n: u32) -> Vec<Item> {
        (0..n)
            .map(|id| Item {
                id,
                name: format!("item-{id:02}"),
                score: f64::from(id % 3),
            })
            .collect()
    }

    fn loaded(n: u32, page_size: usize) -> TabularViewController<Item> {
        let mut c = TabularViewController::new(
            schema(),
            SortSpec::ascending("id"),
            page_size,
            PagingMode::Client,
        );
        assert!(c.begin_load());
        c.finish_load(Ok(items(n)), LoadPolicy::ResetPage);
        c
    }

    fn visible_ids(c: &TabularViewController<Item>) -> Vec<u32> {
        c.compute_visible_page().rows.iter().map(|i| i.id).collect()
    }

    #[test]
    fn begin_load_rejects_reentry() {
        let mut c = loaded(0, 5);
        assert!(c.begin_load());
        assert!(!c.begin_load());
        c.finish_load(Ok(items(3)), LoadPolicy::ResetPage);
        assert!(!c.is_loading());
        assert!(c.begin_load());
    }

    #[test]
    fn background_refresh_waits_for_the_foreground_fetch() {
        let mut c = loaded(30, 10);
        assert!(c.go_to_page(3));
        assert!(c.begin_load());

        assert!(!c.apply_background(items(12)));
        assert!(c.is_loading());
        assert!(!c.begin_load());
        assert_eq!(c.filtered_len(), 30);

        c.finish_load(Ok(items(25)), LoadPolicy::ResetPage);
        assert_eq!((c.page(), c.filtered_len()), (1, 25));

        assert!(c.go_to_page(3));
        assert!(c.apply_background(items(12)));
        assert_eq!((c.page(), c.filtered_len()), (2, 12));
        assert!(c.begin_load());
    }

    #[test]
    fn reset_and_preserve_policies() {
        let mut c = loaded(30, 10);
        assert!(c.go_to_page(3));
        c.finish_load(Ok(items(30)), LoadPolicy::PreservePage);
        assert_eq!(c.page(), 3);
        c.finish_load(Ok(items(12)), LoadPolicy::PreservePage);
        assert_eq!(c.page(), 2);
        c.finish_load(Ok(items(30)), LoadPolicy::ResetPage);
        assert_eq!(c.page(), 1);
    }

    #[test]
    fn failed_refresh_keeps_data_but_failed_first_load_is_empty() {
        let mut c = loaded(4, 10);
        c.finish_load(Err("boom".to_owned()), LoadPolicy::PreservePage);
        assert_eq!(c.filtered_len(), 4);
        assert_eq!(c.last_error(), Some("boom"));

        let mut fresh =
            TabularViewController::new(schema(), SortSpec::ascending("id"), 10, PagingMode::Client);
        fresh.finish_load(Err("down".to_owned()), LoadPolicy::ResetPage);
        assert!(!fresh.has_loaded());
        assert_eq!(fresh.compute_visible_page().shown_range_start, 0);
    }

    #[test]
    fn unknown_sort_field_is_an_error() {
        let mut c = loaded(3, 10);
        assert_eq!(
            c.sort_by("nope"),
            Err(ControllerError::UnknownField("nope".to_owned()))
        );
        assert_eq!(c.sort().field, "id");
    }

    #[test]
    fn unknown_initial_sort_falls_back_to_first_column() {
        let c = TabularViewController::new(
            schema(),
            SortSpec::descending("bogus"),
            10,
            PagingMode::Client,
        );
        assert_eq!(c.sort(), &SortSpec::descending("id"));
    }

    #[test]
    fn sort_preserves_page() {
        let mut c = loaded(30, 10);
        assert!(c.go_to_page(2));
        c.sort_by("id").expect("known field");
        assert_eq!(c.page(), 2);
        assert_eq!(visible_ids(&c), (10..20).rev().collect::<Vec<_>>());
    }

    #[test]
    fn filter_resets_page_and_keeps_sort() {
        let mut c = loaded(30, 5);
        c.sort_by("id").expect("known field");
        assert!(c.go_to_page(3));
        c.apply_filter("item-1");
        assert_eq!(c.page(), 1);
        assert_eq!(visible_ids(&c), vec![19, 18, 17, 16, 15]);
        assert_eq!(c.filtered_len(), 10);
    }

    #[test]
    fn set_page_size_ignores_zero() {
        let mut c = loaded(30, 10);
        assert!(c.go_to_page(2));
        assert!(!c.set_page_size(0));
        assert_eq!((c.page(), c.page_size()), (2, 10));
        assert!(c.set_page_size(4));
        assert_eq!((c.page(), c.total_pages()), (1, 8));
    }

    #[test]
    fn page_navigation_helpers() {
        let mut c = loaded(25, 10);
        assert!(!c.prev_page());
        assert!(c.next_page());
        assert!(c.last_page());
        assert_eq!(c.page(), 3);
        assert!(!c.next_page());
        assert!(c.first_page());
        assert_eq!(c.page(), 1);
    }

    #[test]
    fn server_paging_offsets_ranges() {
        let mut c = TabularViewController::new(
            schema(),
            SortSpec::ascending("id"),
            8,
            PagingMode::Server { total_count: 0 },
        );
        assert!(c.begin_load());
        c.set_server_total(20);
        c.finish_load(Ok(items(8)), LoadPolicy::ResetPage);
        assert_eq!(c.total_pages(), 3);
        assert!(c.go_to_page(3));
        c.set_server_total(20);
        c.finish_load(Ok(items(4)), LoadPolicy::PreservePage);
        let page = c.compute_visible_page();
        assert_eq!(page.rows.len(), 4);
        assert_eq!((page.shown_range_start, page.shown_range_end), (17, 20));
        assert_eq!(page.total_count, 20);
    }

    #[test]
    fn remove_in_server_mode_decrements_total() {
        let mut c = TabularViewController::new(
            schema(),
            SortSpec::ascending("id"),
            8,
            PagingMode::Server { total_count: 9 },
        );
        c.finish_load(Ok(items(8)), LoadPolicy::ResetPage);
        assert!(c.remove_by_key(&0).is_some());
        assert_eq!(c.total_count(), 8);
        assert!(c.remove_by_key(&0).is_none());
    }

    #[test]
    fn get_finds_by_key() {
        let c = loaded(5, 10);
        assert_eq!(c.get(&3).map(|i| i.name.as_str()), Some("item-03"));
        assert!(c.get(&42).is_none());
    }
}
