use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use iocraft::prelude::*;

use crate::app::ViewKind;
use crate::color::ColorDepth;
use crate::components::day_strip::{self, DayStrip, DayStripConfig, RenderedDayStrip};
use crate::components::footer::{self, Footer, RenderedFooter, StatusMessage};
use crate::components::help_overlay::HelpOverlay;
use crate::components::modal::{Modal, ModalLine, RenderedModal};
use crate::components::pagination_bar::PaginationBar;
use crate::components::stats_bar::{RenderedStatsBar, StatsBar};
use crate::components::tab_bar::{RenderedTabBar, TabBar};
use crate::components::table::{
    Cell, RenderedTable, Row, ScrollableTable, TableBuildConfig, columns_from_schema,
};
use crate::components::text_input::{self, RenderedTextInput, TextInput};
use crate::config::keybindings::{BuiltinAction, MergedBindings, ViewContext, key_event_to_string};
use crate::config::types::ReportsConfig;
use crate::controller::{
    DateRange, DayWindow, LoadPolicy, PagingMode, RangeSelection, TabularViewController,
};
use crate::engine::{EngineHandle, Event, FetchTarget, Mutation, Request};
use crate::theme::ResolvedTheme;
use crate::types::{
    CreateReportRequest, NutrientGoals, PeriodError, REPORT_PAGE_SIZES, Report, ReportData,
    ReportStats, validate_period,
};
use crate::util::{format_days, format_duration_ms, format_raw_datetime};

use super::common::{self, NavOutcome};

/// Days the period picker offers, ending today.
const PICKER_DAYS: u64 = 90;

fn report_row(r: &Report, theme: &ResolvedTheme, date_format: &str, now: NaiveDateTime) -> Row {
    vec![
        Cell::colored(r.id.to_string(), theme.text_faint),
        Cell::colored(
            r.period()
                .map_or_else(|| "-".to_owned(), |p| format_days(p.days())),
            theme.text_secondary,
        ),
        Cell::colored(r.status.label(), theme.report_status(r.status)),
        Cell::colored(
            format_raw_datetime(r.created_at.as_deref(), date_format, now),
            theme.text_faint,
        ),
        Cell::colored(
            format_raw_datetime(r.completed_at.as_deref(), date_format, now),
            theme.text_faint,
        ),
        Cell::colored(
            r.total_execution_time
                .map_or_else(|| "-".to_owned(), format_duration_ms),
            theme.text_secondary,
        ),
        Cell::colored(r.period_label(), theme.text_primary),
    ]
}

/// Page size the view starts with; the endpoint only takes a fixed set.
fn initial_page_size(configured: usize) -> usize {
    if REPORT_PAGE_SIZES.contains(&configured) {
        configured
    } else {
        tracing::warn!(
            configured,
            "reports page size not one of {REPORT_PAGE_SIZES:?}; using {}",
            REPORT_PAGE_SIZES[0]
        );
        REPORT_PAGE_SIZES[0]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    ConfirmRetry(i64),
    ConfirmRegenerate(CreateReportRequest),
}

// ---------------------------------------------------------------------------
// Period picker
// ---------------------------------------------------------------------------

/// Keyboard-driven range picker over the trailing days.
#[derive(Debug, Clone, PartialEq)]
struct Picker {
    window: DayWindow,
    selection: RangeSelection,
    cursor: NaiveDate,
    scroll: usize,
    error: Option<String>,
    /// Waiting for the existence check.
    checking: bool,
}

impl Picker {
    fn new(today: NaiveDate, strip_width: u16) -> Self {
        let window = DayWindow::trailing(today, PICKER_DAYS);
        Self {
            window,
            selection: RangeSelection::default_for(today),
            cursor: today,
            scroll: day_strip::scroll_to_show(0, today, &window, strip_width),
            error: None,
            checking: false,
        }
    }

    fn move_cursor(&mut self, delta: i64, strip_width: u16) {
        let Some(next) = self.cursor.checked_add_signed(TimeDelta::days(delta)) else {
            return;
        };
        if !self.window.is_selectable(next) {
            return;
        }
        self.cursor = next;
        self.selection.pointer_move(next, &self.window);
        self.scroll = day_strip::scroll_to_show(self.scroll, next, &self.window, strip_width);
    }

    fn toggle_anchor(&mut self) {
        if self.selection.is_selecting() {
            self.selection.pointer_up();
        } else {
            self.selection.pointer_down(self.cursor, &self.window);
        }
        self.error = None;
    }

    fn preset(&mut self, range: DateRange, strip_width: u16) {
        self.selection.set(range);
        self.cursor = range.end;
        self.scroll = day_strip::scroll_to_show(self.scroll, range.start, &self.window, strip_width);
        self.scroll = day_strip::scroll_to_show(self.scroll, range.end, &self.window, strip_width);
        self.error = None;
    }

    /// Commit any open drag and check the range.
    fn submit(&mut self, today: NaiveDate) -> Result<CreateReportRequest, PeriodError> {
        if self.selection.is_selecting() {
            self.selection.pointer_up();
        }
        let range = self.selection.committed();
        validate_period(range.start, range.end, today)
    }
}

/// Columns the picker strip may use inside its bordered panel.
fn picker_strip_width(screen_width: u16) -> u16 {
    screen_width.saturating_sub(4 + day_strip::LABEL_WIDTH)
}

// ---------------------------------------------------------------------------
// Report modal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum ReportModal {
    Closed,
    Loading(i64),
    Loaded {
        id: i64,
        data: ReportData,
        content: Option<String>,
    },
    Failed(i64, String),
}

impl ReportModal {
    fn waiting_for(&self) -> Option<i64> {
        match self {
            Self::Loading(id) => Some(*id),
            _ => None,
        }
    }
}

fn report_modal_lines(modal: &ReportModal, theme: &ResolvedTheme) -> Vec<ModalLine> {
    const LABEL: usize = 16;
    match modal {
        ReportModal::Closed => Vec::new(),
        ReportModal::Loading(id) => vec![ModalLine::colored(
            format!("Loading report #{id}..."),
            theme.text_faint,
        )],
        ReportModal::Failed(id, message) => vec![
            ModalLine::heading(format!("Report #{id}")),
            ModalLine::blank(),
            ModalLine::colored(message.clone(), theme.text_error),
        ],
        ReportModal::Loaded { id, data, content } => {
            let mut lines = vec![
                ModalLine::heading(format!("Report #{id}")),
                ModalLine::blank(),
                ModalLine::colored(
                    format!("{:<LABEL$}  {}", "Status", data.status.label()),
                    theme.report_status(data.status),
                ),
                ModalLine::field(
                    "Period start",
                    data.period_start.as_deref().unwrap_or("-"),
                    LABEL,
                ),
                ModalLine::field("Period end", data.period_end.as_deref().unwrap_or("-"), LABEL),
                ModalLine::field(
                    "Execution time",
                    data.total_execution_time
                        .map_or_else(|| "-".to_owned(), format_duration_ms),
                    LABEL,
                ),
                ModalLine::blank(),
            ];
            match content.as_deref().filter(|c| !c.trim().is_empty()) {
                Some(text) => lines.extend(text.lines().map(ModalLine::plain)),
                None => lines.push(ModalLine::colored("No content yet", theme.text_faint)),
            }
            lines
        }
    }
}

#[derive(Default, Props)]
pub struct ReportsViewProps<'a> {
    pub config: Option<&'a ReportsConfig>,
    pub engine: Option<&'a EngineHandle>,
    pub theme: Option<&'a ResolvedTheme>,
    pub keybindings: Option<&'a MergedBindings>,
    pub color_depth: ColorDepth,
    pub width: u16,
    pub height: u16,
    pub search_debounce_ms: u64,
    pub date_format: Option<&'a str>,
    /// Directory downloaded CSVs go to; the working directory when unset.
    pub download_dir: Option<&'a Path>,
    pub should_exit: Option<State<bool>>,
    pub switch_view: Option<State<bool>>,
    pub switch_view_back: Option<State<bool>>,
    pub is_active: bool,
}

#[component]
#[allow(clippy::too_many_lines)]
pub fn ReportsView<'a>(props: &ReportsViewProps<'a>, mut hooks: Hooks) -> impl Into<AnyElement<'a>> {
    let theme = props.theme.cloned().unwrap_or_else(super::default_theme);
    let depth = props.color_depth;
    let is_active = props.is_active;
    let should_exit = props.should_exit;
    let switch_view = props.switch_view;
    let switch_view_back = props.switch_view_back;
    let view_cfg = props.config.cloned().unwrap_or_default();
    let debounce = Duration::from_millis(props.search_debounce_ms.max(50));
    let date_format = props.date_format.unwrap_or("relative");
    let strip_width = picker_strip_width(props.width);
    let download_dir: PathBuf = props.download_dir.map_or_else(
        || std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        Path::to_path_buf,
    );

    let initial_sort = view_cfg.sort.clone();
    let page_size = initial_page_size(view_cfg.page_size);
    let mut ctrl = hooks.use_state(move || {
        TabularViewController::new(
            Arc::new(Report::schema()),
            initial_sort,
            page_size,
            PagingMode::Server { total_count: 0 },
        )
    });
    let mut cursor = hooks.use_state(|| 0usize);
    let mut input_mode = hooks.use_state(|| InputMode::Normal);
    let mut search_input = hooks.use_state(String::new);
    let mut search_due = hooks.use_state(|| None::<Instant>);
    let mut action_status = hooks.use_state(|| Option::<StatusMessage>::None);
    let mut picker = hooks.use_state(|| Option::<Picker>::None);
    let mut report_modal = hooks.use_state(|| ReportModal::Closed);
    let mut modal_scroll = hooks.use_state(|| 0usize);
    let mut help_visible = hooks.use_state(|| false);

    let mut needs_fetch = hooks.use_state(|| true);
    let mut force_refresh = hooks.use_state(|| false);

    let event_channel = hooks.use_state(common::event_channel);
    let (event_tx, event_rx) = event_channel.read().clone();
    let engine: Option<EngineHandle> = props.engine.cloned();

    let loading = ctrl.read().is_loading();
    if needs_fetch.get()
        && is_active
        && !loading
        && let Some(ref eng) = engine
    {
        let (page, size) = {
            let mut c = ctrl.write();
            c.begin_load();
            (c.page(), c.page_size())
        };
        needs_fetch.set(false);
        let force = force_refresh.get();
        if force {
            force_refresh.set(false);
        }
        eng.send(Request::FetchReportsPage {
            page,
            size,
            force,
            reply_tx: event_tx.clone(),
        });
    }

    let engine_ev = engine.clone();
    let event_tx_ev = event_tx.clone();
    hooks.use_future(async move {
        loop {
            smol::Timer::after(Duration::from_millis(100)).await;
            for evt in common::drain_events(&event_rx) {
                match evt {
                    Event::ReportsPageFetched {
                        page,
                        size,
                        reports,
                        total_count,
                        background,
                    } => {
                        let (current, loading) = {
                            let c = ctrl.read();
                            ((c.page(), c.page_size()), c.is_loading())
                        };
                        if (page, size) != current {
                            // A page the user already navigated away from.
                            if !background {
                                ctrl.write().abandon_load();
                            }
                            continue;
                        }
                        if background && loading {
                            continue;
                        }
                        let clamped = {
                            let mut c = ctrl.write();
                            c.set_server_total(total_count);
                            c.finish_load(Ok(reports), LoadPolicy::PreservePage);
                            c.page() != page
                        };
                        if clamped {
                            needs_fetch.set(true);
                        }
                        if !background {
                            let rows = ctrl.read().compute_visible_page().rows.len();
                            cursor.set(cursor.get().min(rows.saturating_sub(1)));
                        }
                    }
                    Event::FetchError {
                        target: FetchTarget::Reports,
                        message,
                        background: false,
                    } => {
                        ctrl.write().finish_load(Err(message.clone()), LoadPolicy::PreservePage);
                        action_status.set(Some(StatusMessage::error(message)));
                    }
                    Event::ReportFetched { id, data, content } => {
                        if report_modal.read().waiting_for() == Some(id) {
                            modal_scroll.set(0);
                            report_modal.set(ReportModal::Loaded { id, data, content });
                        }
                    }
                    Event::FetchError {
                        target: FetchTarget::Report,
                        message,
                        ..
                    } => {
                        let waiting = report_modal.read().waiting_for();
                        if let Some(id) = waiting {
                            report_modal.set(ReportModal::Failed(id, message));
                        }
                    }
                    Event::LatestReportFetched { latest } => match latest {
                        Some(latest) => {
                            report_modal.set(ReportModal::Loading(latest.id));
                            if let Some(ref eng) = engine_ev {
                                eng.send(Request::FetchReport {
                                    id: latest.id,
                                    reply_tx: event_tx_ev.clone(),
                                });
                            }
                        }
                        None => action_status.set(Some(StatusMessage::info("No reports yet"))),
                    },
                    Event::FetchError {
                        target: FetchTarget::LatestReport,
                        message,
                        ..
                    } => action_status.set(Some(StatusMessage::error(message))),
                    Event::ReportExists { period, exists } => {
                        let open = picker.read().as_ref().is_some_and(|p| p.checking);
                        if !open {
                            continue;
                        }
                        picker.set(None);
                        if exists {
                            input_mode.set(InputMode::ConfirmRegenerate(period));
                        } else if let Some(ref eng) = engine_ev {
                            action_status.set(Some(StatusMessage::info("Generating report...")));
                            eng.send(Request::GenerateReport {
                                period,
                                reply_tx: event_tx_ev.clone(),
                            });
                        }
                    }
                    Event::FetchError {
                        target: FetchTarget::ReportCheck,
                        message,
                        ..
                    } => {
                        let current = picker.read().clone();
                        if let Some(mut p) = current {
                            p.checking = false;
                            p.error = Some(message);
                            picker.set(Some(p));
                        }
                    }
                    Event::ReportGenerated { creation } => {
                        if creation.is_success() {
                            let id = creation
                                .report_id
                                .map_or_else(String::new, |id| format!(" #{id}"));
                            action_status.set(Some(StatusMessage::success(format!(
                                "Report{id} created"
                            ))));
                        } else {
                            action_status.set(Some(StatusMessage::error(
                                creation
                                    .message
                                    .unwrap_or_else(|| "Report was not created".to_owned()),
                            )));
                        }
                        ctrl.write().first_page();
                        cursor.set(0);
                        needs_fetch.set(true);
                        force_refresh.set(true);
                    }
                    Event::MutationOk {
                        mutation: Mutation::RetryReport { .. },
                        description,
                    } => {
                        action_status.set(Some(StatusMessage::success(description)));
                        needs_fetch.set(true);
                        force_refresh.set(true);
                    }
                    Event::MutationError {
                        mutation: Mutation::RetryReport { .. } | Mutation::GenerateReport,
                        description,
                        message,
                        ..
                    } => {
                        action_status.set(Some(StatusMessage::error(format!("{description}: {message}"))));
                    }
                    Event::ReportDownloaded { id, path } => {
                        action_status.set(Some(StatusMessage::success(format!(
                            "Saved report #{id} to {}",
                            path.display()
                        ))));
                    }
                    Event::FetchError {
                        target: FetchTarget::Download,
                        message,
                        ..
                    } => action_status.set(Some(StatusMessage::error(message))),
                    _ => {}
                }
            }
        }
    });

    // Search debounce: apply the query once the deadline set by the last
    // keystroke has passed.
    hooks.use_future(async move {
        loop {
            smol::Timer::after(common::SEARCH_POLL).await;
            if common::search_is_due(search_due.get(), Instant::now()) {
                search_due.set(None);
                let query = search_input.read().clone();
                ctrl.write().apply_filter(&query);
                cursor.set(0);
            }
        }
    });

    let engine_kb = engine.clone();
    let event_tx_kb = event_tx.clone();
    let keybindings = props.keybindings.cloned();
    hooks.use_terminal_events({
        move |event| match event {
            TerminalEvent::Key(KeyEvent {
                code,
                kind,
                modifiers,
                ..
            }) if kind != KeyEventKind::Release => {
                if !is_active {
                    return;
                }
                if help_visible.get() {
                    if matches!(code, KeyCode::Char('?') | KeyCode::Esc) {
                        help_visible.set(false);
                    }
                    return;
                }
                let send = |req: Request| {
                    if let Some(eng) = engine_kb.as_ref() {
                        eng.send(req);
                    }
                };
                let resolved = key_event_to_string(code, modifiers, kind).and_then(|key| {
                    keybindings
                        .as_ref()
                        .and_then(|kb| kb.resolve(&key, ViewContext::Reports))
                });

                if *report_modal.read() != ReportModal::Closed {
                    match code {
                        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
                            report_modal.set(ReportModal::Closed);
                        }
                        KeyCode::Char('j') | KeyCode::Down => modal_scroll.set(modal_scroll.get() + 1),
                        KeyCode::Char('k') | KeyCode::Up => {
                            modal_scroll.set(modal_scroll.get().saturating_sub(1));
                        }
                        _ => {}
                    }
                    return;
                }

                // Period picker.
                let current_picker = picker.read().clone();
                if let Some(mut p) = current_picker {
                    if p.checking {
                        return;
                    }
                    let today = common::today();
                    match (code, resolved) {
                        (KeyCode::Esc, _) => {
                            if p.selection.is_selecting() {
                                p.selection.cancel();
                            } else {
                                picker.set(None);
                                return;
                            }
                        }
                        (KeyCode::Enter, _) => match p.submit(today) {
                            Ok(period) => {
                                p.checking = true;
                                p.error = None;
                                send(Request::CheckReportExists {
                                    period,
                                    reply_tx: event_tx_kb.clone(),
                                });
                            }
                            Err(e) => p.error = Some(e.to_string()),
                        },
                        (_, Some(BuiltinAction::CursorLeft)) => p.move_cursor(-1, strip_width),
                        (_, Some(BuiltinAction::CursorRight)) => p.move_cursor(1, strip_width),
                        (_, Some(BuiltinAction::ToggleAnchor)) => p.toggle_anchor(),
                        (_, Some(BuiltinAction::PresetWeek)) => {
                            p.preset(DateRange::trailing(today, 7), strip_width);
                        }
                        (_, Some(BuiltinAction::PresetMonth)) => {
                            p.preset(DateRange::month_to_date(today), strip_width);
                        }
                        (_, Some(BuiltinAction::Quit)) => {
                            if let Some(mut exit) = should_exit {
                                exit.set(true);
                            }
                            return;
                        }
                        _ => return,
                    }
                    picker.set(Some(p));
                    return;
                }

                let current_mode = input_mode.read().clone();
                match current_mode {
                    InputMode::ConfirmRetry(id) => {
                        input_mode.set(InputMode::Normal);
                        if matches!(code, KeyCode::Char('y' | 'Y')) {
                            action_status.set(Some(StatusMessage::info(format!(
                                "Retrying report #{id}..."
                            ))));
                            send(Request::RetryReport {
                                id,
                                reply_tx: event_tx_kb.clone(),
                            });
                        } else {
                            action_status.set(None);
                        }
                        return;
                    }
                    InputMode::ConfirmRegenerate(period) => {
                        input_mode.set(InputMode::Normal);
                        if matches!(code, KeyCode::Char('y' | 'Y')) {
                            action_status.set(Some(StatusMessage::info("Generating report...")));
                            send(Request::GenerateReport {
                                period,
                                reply_tx: event_tx_kb.clone(),
                            });
                        } else {
                            action_status.set(Some(StatusMessage::info("Report not created")));
                        }
                        return;
                    }
                    InputMode::Search => {
                        match code {
                            KeyCode::Esc => {
                                input_mode.set(InputMode::Normal);
                                search_due.set(None);
                                search_input.set(String::new());
                                ctrl.write().apply_filter("");
                                cursor.set(0);
                            }
                            KeyCode::Enter => {
                                input_mode.set(InputMode::Normal);
                                search_due.set(None);
                                let query = search_input.read().clone();
                                ctrl.write().apply_filter(&query);
                                cursor.set(0);
                            }
                            _ => {
                                let mut query = search_input.read().clone();
                                if text_input::edit_line(&mut query, code, modifiers) {
                                    search_input.set(query);
                                    search_due.set(Some(Instant::now() + debounce));
                                }
                            }
                        }
                        return;
                    }
                    InputMode::Normal => {}
                }

                if code == KeyCode::Esc {
                    if !ctrl.read().query().is_empty() {
                        search_input.set(String::new());
                        ctrl.write().apply_filter("");
                        cursor.set(0);
                    }
                    action_status.set(None);
                    return;
                }

                let Some(action) = resolved else {
                    return;
                };
                let selected = ctrl
                    .read()
                    .compute_visible_page()
                    .rows
                    .get(cursor.get())
                    .map(|r| (*r).clone());
                match action {
                    BuiltinAction::Quit => {
                        if let Some(mut exit) = should_exit {
                            exit.set(true);
                        }
                    }
                    BuiltinAction::NextView => {
                        if let Some(mut sv) = switch_view {
                            sv.set(true);
                        }
                    }
                    BuiltinAction::PrevView => {
                        if let Some(mut sv) = switch_view_back {
                            sv.set(true);
                        }
                    }
                    BuiltinAction::ToggleHelp => help_visible.set(true),
                    BuiltinAction::Search => {
                        search_input.set(ctrl.read().query().to_owned());
                        input_mode.set(InputMode::Search);
                    }
                    BuiltinAction::Refresh => {
                        ctrl.write().first_page();
                        cursor.set(0);
                        force_refresh.set(true);
                        needs_fetch.set(true);
                        action_status.set(Some(StatusMessage::info("Reloading reports...")));
                    }
                    BuiltinAction::Create => {
                        picker.set(Some(Picker::new(common::today(), strip_width)));
                        action_status.set(None);
                    }
                    BuiltinAction::Details => {
                        if let Some(r) = selected {
                            report_modal.set(ReportModal::Loading(r.id));
                            send(Request::FetchReport {
                                id: r.id,
                                reply_tx: event_tx_kb.clone(),
                            });
                        }
                    }
                    BuiltinAction::Latest => {
                        send(Request::FetchLatestReport {
                            reply_tx: event_tx_kb.clone(),
                        });
                    }
                    BuiltinAction::Retry => {
                        if let Some(r) = selected {
                            if r.status.can_retry() {
                                input_mode.set(InputMode::ConfirmRetry(r.id));
                            } else {
                                action_status.set(Some(StatusMessage::info(format!(
                                    "Report #{} is {}; only created or failed reports can be retried",
                                    r.id,
                                    r.status.label().to_lowercase()
                                ))));
                            }
                        }
                    }
                    BuiltinAction::Download => {
                        if let Some(r) = selected {
                            if r.status.can_download() {
                                action_status.set(Some(StatusMessage::info(format!(
                                    "Downloading report #{}...",
                                    r.id
                                ))));
                                send(Request::DownloadReport {
                                    report: r,
                                    dir: download_dir.clone(),
                                    reply_tx: event_tx_kb.clone(),
                                });
                            } else {
                                action_status.set(Some(StatusMessage::info(format!(
                                    "Report #{} is not completed yet",
                                    r.id
                                ))));
                            }
                        }
                    }
                    other => {
                        let mut c = cursor.get();
                        let outcome = common::apply_table_action(&mut *ctrl.write(), other, &mut c);
                        if outcome != NavOutcome::Ignored {
                            cursor.set(c);
                        }
                        if outcome == NavOutcome::PageChanged {
                            needs_fetch.set(true);
                        }
                    }
                }
            }
            _ => {}
        }
    });

    if !is_active {
        return element! {
            View(flex_direction: FlexDirection::Column)
        }
        .into_any();
    }

    let now = common::now_local();
    let ctrl_ref = ctrl.read();
    let c: &TabularViewController<Report> = &ctrl_ref;
    let visible = c.compute_visible_page();
    let rows: Vec<Row> = visible
        .rows
        .iter()
        .map(|r| report_row(r, &theme, date_format, now))
        .collect();
    let columns = columns_from_schema(
        c.schema().as_ref(),
        &[
            ("id", 0.06),
            ("period", 0.1),
            ("status", 0.12),
            ("created", 0.14),
            ("completed", 0.14),
            ("executionTime", 0.1),
        ],
    );
    let empty_message = if c.query().is_empty() {
        "No reports"
    } else {
        "No reports on this page match the search"
    };
    let rendered_table = RenderedTable::build(&TableBuildConfig {
        columns: &columns,
        rows: &rows,
        cursor: common::clamp_cursor(cursor.get(), rows.len()),
        sort: Some(c.sort()),
        total_width: props.width,
        depth,
        selected_bg: Some(theme.bg_selected),
        header_color: Some(theme.text_secondary),
        border_color: Some(theme.border_faint),
        faint_color: Some(theme.text_faint),
        empty_message: (!c.is_loading()).then_some(empty_message),
    });

    let stats = ReportStats::compute(c.records(), c.total_count());
    let rendered_stats = RenderedStatsBar::build(
        vec![
            ("Reports", stats.total.to_string()),
            ("On page: completed", stats.completed.to_string()),
            ("processing", stats.processing.to_string()),
            ("failed", stats.failed.to_string()),
        ],
        depth,
        theme.text_faint,
        theme.text_primary,
    );

    let rendered_tab_bar = RenderedTabBar::build(
        ViewKind::Reports,
        Some(c.total_count()),
        depth,
        theme.text_accent,
        theme.text_inverted,
        theme.text_secondary,
        theme.border_faint,
    );
    let rendered_pagination = common::pagination_bar(c, &theme, depth);

    let picker_snapshot = picker.read().clone();
    let goals = NutrientGoals::default();
    let rendered_picker = picker_snapshot.as_ref().map(|p| {
        RenderedDayStrip::build(&DayStripConfig {
            window: &p.window,
            grid: None,
            selection: p.selection.selection(),
            cursor: Some(p.cursor),
            scroll_cols: p.scroll,
            width: strip_width,
            goals: &goals,
            zero_is_empty: true,
            theme: &theme,
            depth,
        })
    });
    let picker_info = picker_snapshot.as_ref().map(|p| {
        let range = p.selection.selection();
        let summary = format!(
            "{} \u{2192} {}  ({})",
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d"),
            format_days(range.days())
        );
        let (hint, hint_color) = if p.checking {
            ("Checking for an existing report...".to_owned(), theme.text_faint)
        } else if let Some(err) = &p.error {
            (err.clone(), theme.text_error)
        } else if p.selection.is_selecting() {
            ("\u{2190}/\u{2192} extend  space finish  Esc cancel".to_owned(), theme.text_faint)
        } else {
            (
                "\u{2190}/\u{2192} move  space start range  w week  m month  Enter create  Esc close"
                    .to_owned(),
                theme.text_faint,
            )
        };
        (
            summary,
            hint,
            hint_color.to_crossterm_color(depth),
            theme.text_primary.to_crossterm_color(depth),
            theme.border_primary.to_crossterm_color(depth),
        )
    });

    let rendered_text_input = match &*input_mode.read() {
        InputMode::Search => Some(RenderedTextInput::build(
            "/",
            &search_input.read(),
            depth,
            theme.text_primary,
            theme.text_secondary,
            theme.border_faint,
        )),
        InputMode::ConfirmRetry(id) => Some(RenderedTextInput::question(
            &format!("Retry report #{id}? (y/n)"),
            depth,
            theme.text_warning,
            theme.border_faint,
        )),
        InputMode::ConfirmRegenerate(period) => Some(RenderedTextInput::question(
            &format!(
                "A report for {} \u{2192} {} already exists. Create another? (y/n)",
                period.start_date, period.end_date
            ),
            depth,
            theme.text_warning,
            theme.border_faint,
        )),
        InputMode::Normal => None,
    };

    let rendered_footer = RenderedFooter::build(
        common::table_context(c, "reports"),
        footer::format_updated_ago(c.loaded_at()),
        action_status.read().as_ref(),
        depth,
        &common::footer_colors(&theme),
    );

    let modal_state = report_modal.read().clone();
    let rendered_modal = (modal_state != ReportModal::Closed).then(|| {
        RenderedModal::build(
            "Report",
            &report_modal_lines(&modal_state, &theme),
            modal_scroll.get(),
            "j/k scroll  Esc close",
            (props.width, props.height),
            depth,
            &common::modal_colors(&theme),
        )
    });

    let rendered_help = if help_visible.get() {
        common::help_overlay(props.keybindings, ViewContext::Reports, &theme, depth)
    } else {
        None
    };

    let width = u32::from(props.width);
    let height = u32::from(props.height);

    element! {
        View(flex_direction: FlexDirection::Column, width, height) {
            TabBar(tab_bar: rendered_tab_bar)
            StatsBar(stats: rendered_stats)
            View(flex_grow: 1.0, flex_direction: FlexDirection::Column, overflow: Overflow::Hidden) {
                ScrollableTable(table: rendered_table)
            }
            PaginationBar(bar: rendered_pagination)
            #(picker_info.map(|(summary, hint, hint_fg, text_fg, border_fg)| element! {
                View(
                    flex_direction: FlexDirection::Column,
                    border_style: BorderStyle::Round,
                    border_color: border_fg,
                    padding_left: 1,
                    padding_right: 1,
                ) {
                    Text(content: format!("New report  {summary}"), color: text_fg, weight: Weight::Bold, wrap: TextWrap::NoWrap)
                    DayStrip(strip: rendered_picker)
                    Text(content: hint, color: hint_fg, wrap: TextWrap::NoWrap)
                }
            }))
            TextInput(input: rendered_text_input)
            Footer(footer: rendered_footer)
            Modal(modal: rendered_modal)
            HelpOverlay(overlay: rendered_help, width: props.width, height: props.height)
        }
    }
    .into_any()
}
