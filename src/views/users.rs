use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use iocraft::prelude::*;

use crate::app::ViewKind;
use crate::color::ColorDepth;
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
use crate::config::types::TableViewConfig;
use crate::controller::{LoadPolicy, PagingMode, SortSpec, TabularViewController};
use crate::engine::{EngineHandle, Event, FetchTarget, RefreshTarget, Request};
use crate::theme::ResolvedTheme;
use crate::types::{UserDetails, UserStats, UserSummary};
use crate::util::{format_days, format_number, format_raw_datetime};

use super::common::{self, NavOutcome};

fn user_row(user: &UserSummary, theme: &ResolvedTheme, date_format: &str, now: NaiveDateTime) -> Row {
    let active_today = user.last_activity_date() == Some(now.date());
    vec![
        Cell::colored(user.login.clone(), theme.text_primary),
        Cell::colored(user.email.clone().unwrap_or_default(), theme.text_secondary),
        Cell::colored(user.fio.clone().unwrap_or_default(), theme.text_primary),
        Cell::colored(
            user.streak
                .as_ref()
                .map_or_else(String::new, |s| format_number(s.as_f64())),
            theme.text_accent,
        ),
        Cell::colored(
            format_raw_datetime(user.last_activity.as_deref(), date_format, now),
            if active_today {
                theme.text_success
            } else {
                theme.text_faint
            },
        ),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
}

/// Details modal lifecycle.
#[derive(Debug, Clone, PartialEq)]
enum DetailsModal {
    Closed,
    Loading(String),
    Loaded(UserDetails),
    Failed(String, String),
}

fn details_lines(
    modal: &DetailsModal,
    theme: &ResolvedTheme,
    date_format: &str,
    now: NaiveDateTime,
) -> Vec<ModalLine> {
    const LABEL: usize = 16;
    let or_dash = |v: Option<&str>| v.filter(|s| !s.is_empty()).unwrap_or("-").to_owned();
    match modal {
        DetailsModal::Closed => Vec::new(),
        DetailsModal::Loading(login) => vec![ModalLine::colored(
            format!("Loading {login}..."),
            theme.text_faint,
        )],
        DetailsModal::Failed(login, message) => vec![
            ModalLine::heading(login.clone()),
            ModalLine::blank(),
            ModalLine::colored(message.clone(), theme.text_error),
        ],
        DetailsModal::Loaded(d) => {
            let full_name = d.full_name();
            vec![
                ModalLine::heading(if full_name.is_empty() {
                    d.login.clone()
                } else {
                    full_name
                }),
                ModalLine::blank(),
                ModalLine::field("Login", &d.login, LABEL),
                ModalLine::field("Email", or_dash(d.email.as_deref()), LABEL),
                ModalLine::field("Surname", or_dash(d.surname.as_deref()), LABEL),
                ModalLine::field("Name", or_dash(d.name.as_deref()), LABEL),
                ModalLine::field("Patronymic", or_dash(d.patronymic.as_deref()), LABEL),
                ModalLine::blank(),
                ModalLine::field(
                    "Current streak",
                    d.current_streak.map_or_else(|| "-".to_owned(), format_days),
                    LABEL,
                ),
                ModalLine::field("Activity level", or_dash(d.activity_level.as_deref()), LABEL),
                ModalLine::field(
                    "Calorie goal",
                    d.daily_calorie_goal
                        .map_or_else(|| "-".to_owned(), |g| format!("{g} kcal")),
                    LABEL,
                ),
                ModalLine::blank(),
                ModalLine::field(
                    "Last activity",
                    format_raw_datetime(d.last_activity.as_deref(), date_format, now),
                    LABEL,
                ),
                ModalLine::field(
                    "Registered",
                    format_raw_datetime(d.created_at.as_deref(), date_format, now),
                    LABEL,
                ),
            ]
        }
    }
}

#[derive(Default, Props)]
pub struct UsersViewProps<'a> {
    pub config: Option<&'a TableViewConfig>,
    pub engine: Option<&'a EngineHandle>,
    pub theme: Option<&'a ResolvedTheme>,
    pub keybindings: Option<&'a MergedBindings>,
    pub color_depth: ColorDepth,
    pub width: u16,
    pub height: u16,
    pub search_debounce_ms: u64,
    pub date_format: Option<&'a str>,
    pub should_exit: Option<State<bool>>,
    pub switch_view: Option<State<bool>>,
    pub switch_view_back: Option<State<bool>>,
    /// Whether this view is the currently active (visible) one.
    pub is_active: bool,
}

#[component]
#[allow(clippy::too_many_lines)]
pub fn UsersView<'a>(props: &UsersViewProps<'a>, mut hooks: Hooks) -> impl Into<AnyElement<'a>> {
    let theme = props.theme.cloned().unwrap_or_else(super::default_theme);
    let depth = props.color_depth;
    let is_active = props.is_active;
    let should_exit = props.should_exit;
    let switch_view = props.switch_view;
    let switch_view_back = props.switch_view_back;
    let view_cfg = props.config.cloned().unwrap_or_default();
    let debounce = Duration::from_millis(props.search_debounce_ms.max(50));
    let date_format = props.date_format.unwrap_or("relative");

    let initial_sort = view_cfg
        .sort
        .clone()
        .unwrap_or_else(|| SortSpec::descending("lastActivity"));
    let page_size = view_cfg.page_size.max(1);
    let mut ctrl = hooks.use_state(move || {
        TabularViewController::new(
            Arc::new(UserSummary::schema()),
            initial_sort,
            page_size,
            PagingMode::Client,
        )
    });
    let mut cursor = hooks.use_state(|| 0usize);
    let mut input_mode = hooks.use_state(|| InputMode::Normal);
    let mut search_input = hooks.use_state(String::new);
    let mut search_due = hooks.use_state(|| None::<Instant>);
    let mut action_status = hooks.use_state(|| Option::<StatusMessage>::None);
    let mut details_modal = hooks.use_state(|| DetailsModal::Closed);
    let mut help_visible = hooks.use_state(|| false);

    // Consumed by the lazy fetch below once no load is in flight.
    let mut needs_fetch = hooks.use_state(|| true);
    let mut force_refresh = hooks.use_state(|| false);
    let mut refresh_registered = hooks.use_state(|| false);

    let event_channel = hooks.use_state(common::event_channel);
    let (event_tx, event_rx) = event_channel.read().clone();
    let engine: Option<EngineHandle> = props.engine.cloned();

    if !refresh_registered.get()
        && view_cfg.refresh_interval_minutes > 0
        && let Some(ref eng) = engine
    {
        eng.send(Request::RegisterRefresh {
            target: RefreshTarget::Users,
            interval: Duration::from_secs(u64::from(view_cfg.refresh_interval_minutes) * 60),
            notify_tx: event_tx.clone(),
        });
        refresh_registered.set(true);
    }

    let loading = ctrl.read().is_loading();
    if needs_fetch.get()
        && is_active
        && !loading
        && let Some(ref eng) = engine
    {
        ctrl.write().begin_load();
        needs_fetch.set(false);
        let force = force_refresh.get();
        if force {
            force_refresh.set(false);
        }
        eng.send(Request::FetchUsers {
            force,
            reply_tx: event_tx.clone(),
        });
    }

    // Event polling: drain replies from the engine.
    hooks.use_future(async move {
        loop {
            smol::Timer::after(Duration::from_millis(100)).await;
            for evt in common::drain_events(&event_rx) {
                match evt {
                    Event::UsersFetched { users, background } => {
                        if background {
                            ctrl.write().apply_background(users);
                        } else {
                            ctrl.write().finish_load(Ok(users), LoadPolicy::ResetPage);
                            cursor.set(0);
                        }
                    }
                    Event::UserDetailsFetched { login, details } => {
                        let waiting =
                            matches!(&*details_modal.read(), DetailsModal::Loading(l) if *l == login);
                        if waiting {
                            details_modal.set(DetailsModal::Loaded(details));
                        }
                    }
                    Event::FetchError {
                        target: FetchTarget::Users,
                        message,
                        background,
                    } => {
                        if !background {
                            ctrl.write().finish_load(Err(message.clone()), LoadPolicy::ResetPage);
                            action_status.set(Some(StatusMessage::error(message)));
                        }
                    }
                    Event::FetchError {
                        target: FetchTarget::UserDetails,
                        message,
                        ..
                    } => {
                        let login = match &*details_modal.read() {
                            DetailsModal::Loading(login) => Some(login.clone()),
                            _ => None,
                        };
                        if let Some(login) = login {
                            details_modal.set(DetailsModal::Failed(login, message));
                        }
                    }
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
                if *details_modal.read() != DetailsModal::Closed {
                    if matches!(code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                        details_modal.set(DetailsModal::Closed);
                    }
                    return;
                }

                if input_mode.get() == InputMode::Search {
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

                // Esc in normal mode drops an applied search.
                if code == KeyCode::Esc {
                    if !ctrl.read().query().is_empty() {
                        search_input.set(String::new());
                        ctrl.write().apply_filter("");
                        cursor.set(0);
                    }
                    action_status.set(None);
                    return;
                }

                let Some(key) = key_event_to_string(code, modifiers, kind) else {
                    return;
                };
                let Some(action) = keybindings
                    .as_ref()
                    .and_then(|kb| kb.resolve(&key, ViewContext::Users))
                else {
                    return;
                };
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
                        force_refresh.set(true);
                        needs_fetch.set(true);
                        action_status.set(Some(StatusMessage::info("Reloading users...")));
                    }
                    BuiltinAction::Details => {
                        let login = ctrl
                            .read()
                            .compute_visible_page()
                            .rows
                            .get(cursor.get())
                            .map(|u| u.login.clone());
                        if let Some(login) = login
                            && let Some(ref eng) = engine_kb
                        {
                            details_modal.set(DetailsModal::Loading(login.clone()));
                            eng.send(Request::FetchUserDetails {
                                login,
                                reply_tx: event_tx_kb.clone(),
                            });
                        }
                    }
                    other => {
                        let mut c = cursor.get();
                        let outcome = common::apply_table_action(&mut *ctrl.write(), other, &mut c);
                        if outcome != NavOutcome::Ignored {
                            cursor.set(c);
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
    let c: &TabularViewController<UserSummary> = &ctrl_ref;
    let visible = c.compute_visible_page();
    let rows: Vec<Row> = visible
        .rows
        .iter()
        .map(|u| user_row(u, &theme, date_format, now))
        .collect();
    let columns = columns_from_schema(
        c.schema().as_ref(),
        &[("login", 0.16), ("email", 0.26), ("fio", 0.28), ("streak", 0.1)],
    );
    let empty_message = if c.query().is_empty() {
        "No users"
    } else {
        "No users match the search"
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

    let stats = UserStats::compute(c.records(), now.date());
    let rendered_stats = RenderedStatsBar::build(
        vec![
            ("Users", stats.total.to_string()),
            ("Active today", stats.active_today.to_string()),
            ("Average streak", format_days(stats.average_streak)),
        ],
        depth,
        theme.text_faint,
        theme.text_primary,
    );

    let rendered_tab_bar = RenderedTabBar::build(
        ViewKind::Users,
        Some(c.entries().len()),
        depth,
        theme.text_accent,
        theme.text_inverted,
        theme.text_secondary,
        theme.border_faint,
    );
    let rendered_pagination = common::pagination_bar(c, &theme, depth);

    let rendered_text_input = (input_mode.get() == InputMode::Search).then(|| {
        RenderedTextInput::build(
            "/",
            &search_input.read(),
            depth,
            theme.text_primary,
            theme.text_secondary,
            theme.border_faint,
        )
    });

    let rendered_footer = RenderedFooter::build(
        common::table_context(c, "users"),
        footer::format_updated_ago(c.loaded_at()),
        action_status.read().as_ref(),
        depth,
        &common::footer_colors(&theme),
    );

    let modal_state = details_modal.read().clone();
    let rendered_modal = (modal_state != DetailsModal::Closed).then(|| {
        RenderedModal::build(
            "User details",
            &details_lines(&modal_state, &theme, date_format, now),
            0,
            "Esc close",
            (props.width, props.height),
            depth,
            &common::modal_colors(&theme),
        )
    });

    let rendered_help = if help_visible.get() {
        common::help_overlay(props.keybindings, ViewContext::Users, &theme, depth)
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
            TextInput(input: rendered_text_input)
            Footer(footer: rendered_footer)
            Modal(modal: rendered_modal)
            HelpOverlay(overlay: rendered_help, width: props.width, height: props.height)
        }
    }
    .into_any()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("valid")
    }

    #[test]
    fn row_follows_schema_order() {
        let theme = ResolvedTheme::default();
        let user: UserSummary = serde_json::from_str(
            r#"{"login":"anna","email":"a@x.io","fio":"Ivanova Anna","streak":"7","lastActivity":"2025-03-14 09:00:00"}"#,
        )
        .expect("valid json");
        let row = user_row(&user, &theme, "%Y-%m-%d", now());
        let texts: Vec<&str> = row.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["anna", "a@x.io", "Ivanova Anna", "7", "2025-03-14"]);
        assert_eq!(row.len(), UserSummary::schema().len());
        assert_eq!(row[4].color, Some(theme.text_success));
    }

    #[test]
    fn missing_fields_render_blank() {
        let theme = ResolvedTheme::default();
        let user: UserSummary = serde_json::from_str(r#"{"login":"vera"}"#).expect("valid json");
        let row = user_row(&user, &theme, "relative", now());
        assert!(row[1..4].iter().all(|c| c.text.is_empty()));
    }

    #[test]
    fn details_show_dash_for_missing_values() {
        let theme = ResolvedTheme::default();
        let details: UserDetails =
            serde_json::from_str(r#"{"login":"bob","name":"Bob","dailyCalorieGoal":2100}"#)
                .expect("valid json");
        let lines = details_lines(&DetailsModal::Loaded(details), &theme, "relative", now());
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts[0], "Bob");
        assert!(texts.iter().any(|t| t.starts_with("Email") && t.ends_with('-')));
        assert!(texts.iter().any(|t| t.ends_with("2100 kcal")));
    }
}
