use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime};

use crate::color::ColorDepth;
use crate::components::footer::FooterColors;
use crate::components::help_overlay::{HelpOverlayBuildConfig, RenderedHelpOverlay};
use crate::components::modal::ModalColors;
use crate::components::pagination_bar::{PaginationColors, RenderedPaginationBar};
use crate::config::keybindings::{BuiltinAction, MergedBindings, ViewContext};
use crate::controller::{Record, TabularViewController};
use crate::engine::Event;
use crate::theme::ResolvedTheme;
use crate::types::REPORT_PAGE_SIZES;

/// Reply channel a view hands to the engine with each request.
pub(crate) type EventChannel = (Sender<Event>, Arc<Mutex<Receiver<Event>>>);

pub(crate) fn event_channel() -> EventChannel {
    let (tx, rx) = std::sync::mpsc::channel::<Event>();
    (tx, Arc::new(Mutex::new(rx)))
}

/// Take every event queued so far without blocking.
pub(crate) fn drain_events(rx: &Mutex<Receiver<Event>>) -> Vec<Event> {
    let Ok(rx) = rx.lock() else {
        return Vec::new();
    };
    let mut events = Vec::new();
    while let Ok(evt) = rx.try_recv() {
        events.push(evt);
    }
    events
}

pub(crate) fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// Search debounce
// ---------------------------------------------------------------------------

/// How often a view checks its pending search deadline. A query lands at
/// most this long after its debounce delay.
pub(crate) const SEARCH_POLL: Duration = Duration::from_millis(25);

/// True once the deadline armed by the last keystroke has passed. Every
/// keystroke pushes the deadline out by the full debounce delay.
pub(crate) fn search_is_due(deadline: Option<Instant>, now: Instant) -> bool {
    deadline.is_some_and(|d| now >= d)
}

// ---------------------------------------------------------------------------
// Table navigation
// ---------------------------------------------------------------------------

/// What a navigation key did to a table view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NavOutcome {
    /// Not a navigation action, or nothing to do.
    Ignored,
    /// Cursor or sort changed; the loaded rows are still valid.
    Redraw,
    /// Page or page size changed. Server-paged views must fetch.
    PageChanged,
}

/// Apply cursor, paging, page-size and sort actions to a controller.
///
/// `cursor` is the row index within the visible page. Moving past the last
/// row continues on the next page.
pub(crate) fn apply_table_action<R: Record>(
    ctrl: &mut TabularViewController<R>,
    action: BuiltinAction,
    cursor: &mut usize,
) -> NavOutcome {
    let page_changed = |changed: bool, cursor: &mut usize, to: usize| {
        if changed {
            *cursor = to;
            NavOutcome::PageChanged
        } else {
            NavOutcome::Ignored
        }
    };

    match action {
        BuiltinAction::MoveDown => {
            let rows = ctrl.compute_visible_page().rows.len();
            if *cursor + 1 < rows {
                *cursor += 1;
                NavOutcome::Redraw
            } else {
                let changed = ctrl.next_page();
                page_changed(changed, cursor, 0)
            }
        }
        BuiltinAction::MoveUp => {
            if *cursor > 0 {
                *cursor -= 1;
                NavOutcome::Redraw
            } else {
                let last_row = ctrl.page_size().saturating_sub(1);
                let changed = ctrl.prev_page();
                page_changed(changed, cursor, last_row)
            }
        }
        BuiltinAction::NextPage => {
            let changed = ctrl.next_page();
            page_changed(changed, cursor, 0)
        }
        BuiltinAction::PrevPage => {
            let changed = ctrl.prev_page();
            page_changed(changed, cursor, 0)
        }
        BuiltinAction::FirstPage => {
            let changed = ctrl.first_page();
            page_changed(changed, cursor, 0)
        }
        BuiltinAction::LastPage => {
            let changed = ctrl.last_page();
            page_changed(changed, cursor, 0)
        }
        BuiltinAction::CyclePageSize => {
            let changed = ctrl.set_page_size(next_page_size(ctrl.page_size()));
            page_changed(changed, cursor, 0)
        }
        BuiltinAction::SortColumn(n) => match ctrl.sort_by_column(n.saturating_sub(1)) {
            Ok(()) => NavOutcome::Redraw,
            Err(e) => {
                tracing::debug!("sort ignored: {e}");
                NavOutcome::Ignored
            }
        },
        _ => NavOutcome::Ignored,
    }
}

/// The page size after `current` in the 8/16/32/48 cycle. Sizes outside the
/// cycle restart it.
pub(crate) fn next_page_size(current: usize) -> usize {
    REPORT_PAGE_SIZES
        .iter()
        .copied()
        .find(|&s| s > current)
        .unwrap_or(REPORT_PAGE_SIZES[0])
}

/// Keep a cursor inside the rows actually shown.
pub(crate) fn clamp_cursor(cursor: usize, rows: usize) -> Option<usize> {
    (rows > 0).then(|| cursor.min(rows - 1))
}

// ---------------------------------------------------------------------------
// Theme plumbing
// ---------------------------------------------------------------------------

pub(crate) fn footer_colors(theme: &ResolvedTheme) -> FooterColors {
    FooterColors {
        text: theme.text_faint,
        border: theme.border_faint,
        info: theme.text_accent,
        success: theme.text_success,
        error: theme.text_error,
    }
}

pub(crate) fn modal_colors(theme: &ResolvedTheme) -> ModalColors {
    ModalColors {
        text: theme.text_primary,
        title: theme.text_accent,
        border: theme.border_primary,
        hint: theme.text_faint,
    }
}

pub(crate) fn pagination_bar<R: Record>(
    ctrl: &TabularViewController<R>,
    theme: &ResolvedTheme,
    depth: ColorDepth,
) -> RenderedPaginationBar {
    let visible = ctrl.compute_visible_page();
    RenderedPaginationBar::build(
        &ctrl.pagination(),
        (visible.shown_range_start, visible.shown_range_end),
        visible.total_count,
        ctrl.page_size(),
        depth,
        &PaginationColors {
            current: theme.text_accent,
            page: theme.text_secondary,
            disabled: theme.text_faint,
        },
    )
}

pub(crate) fn help_overlay(
    bindings: Option<&MergedBindings>,
    context: ViewContext,
    theme: &ResolvedTheme,
    depth: ColorDepth,
) -> Option<RenderedHelpOverlay> {
    bindings.map(|kb| {
        RenderedHelpOverlay::build(&HelpOverlayBuildConfig {
            bindings: kb,
            context,
            depth,
            title_color: theme.text_primary,
            key_color: theme.text_success,
            desc_color: theme.text_secondary,
            border_color: theme.border_primary,
        })
    })
}

/// Footer context line shared by the table views.
pub(crate) fn table_context<R: Record>(ctrl: &TabularViewController<R>, noun: &str) -> String {
    if ctrl.is_loading() && !ctrl.has_loaded() {
        return format!("Fetching {noun}...");
    }
    if let Some(err) = ctrl.last_error() {
        return format!("Error: {err}");
    }
    let loaded = ctrl.entries().len();
    if ctrl.query().is_empty() {
        format!("{loaded} {noun}")
    } else {
        format!(
            "{} of {loaded} {noun} match \"{}\"",
            ctrl.filtered_len(),
            ctrl.query()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::controller::{PagingMode, SortSpec};
    use crate::types::Product;

    fn product(id: i64) -> Product {
        Product {
            id,
            name: format!("p{id}"),
            calories_per_100g: None,
            proteins_per_100g: None,
            fats_per_100g: None,
            carbs_per_100g: None,
            created_by: None,
            created_at: None,
        }
    }

    fn loaded(n: i64, page_size: usize) -> TabularViewController<Product> {
        let mut c = TabularViewController::new(
            Arc::new(Product::schema()),
            SortSpec::ascending("id"),
            page_size,
            PagingMode::Client,
        );
        c.finish_load(Ok((1..=n).map(product).collect()), crate::controller::LoadPolicy::ResetPage);
        c
    }

    #[test]
    fn search_waits_for_the_full_delay_after_the_last_keystroke() {
        let debounce = Duration::from_millis(200);
        let t0 = Instant::now();
        assert!(!search_is_due(None, t0));

        let deadline = t0 + debounce;
        assert!(!search_is_due(Some(deadline), t0 + Duration::from_millis(199)));

        // Another keystroke at 150 ms re-arms the timer.
        let deadline = t0 + Duration::from_millis(150) + debounce;
        assert!(!search_is_due(Some(deadline), t0 + Duration::from_millis(300)));
        assert!(search_is_due(Some(deadline), t0 + Duration::from_millis(350)));
        assert!(search_is_due(Some(deadline), t0 + Duration::from_millis(350) + SEARCH_POLL));
    }

    #[test]
    fn moving_past_last_row_turns_the_page() {
        let mut c = loaded(10, 4);
        let mut cursor = 3;
        assert_eq!(
            apply_table_action(&mut c, BuiltinAction::MoveDown, &mut cursor),
            NavOutcome::PageChanged
        );
        assert_eq!((c.page(), cursor), (2, 0));
        assert_eq!(
            apply_table_action(&mut c, BuiltinAction::MoveUp, &mut cursor),
            NavOutcome::PageChanged
        );
        assert_eq!((c.page(), cursor), (1, 3));
    }

    #[test]
    fn last_row_of_last_page_stays_put() {
        let mut c = loaded(3, 4);
        let mut cursor = 2;
        assert_eq!(
            apply_table_action(&mut c, BuiltinAction::MoveDown, &mut cursor),
            NavOutcome::Ignored
        );
        assert_eq!(cursor, 2);
    }

    #[test]
    fn sort_column_is_one_based() {
        let mut c = loaded(3, 4);
        let mut cursor = 0;
        apply_table_action(&mut c, BuiltinAction::SortColumn(2), &mut cursor);
        assert_eq!(c.sort().field, "name");
        assert_eq!(
            apply_table_action(&mut c, BuiltinAction::SortColumn(42), &mut cursor),
            NavOutcome::Ignored
        );
    }

    #[test]
    fn page_size_cycles() {
        assert_eq!(next_page_size(8), 16);
        assert_eq!(next_page_size(16), 32);
        assert_eq!(next_page_size(48), 8);
        assert_eq!(next_page_size(10), 16);
        assert_eq!(next_page_size(100), 8);
    }

    #[test]
    fn cursor_clamps_to_rows() {
        assert_eq!(clamp_cursor(5, 3), Some(2));
        assert_eq!(clamp_cursor(0, 0), None);
    }
}
