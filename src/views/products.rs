use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use indexmap::IndexMap;
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
use crate::engine::{EngineHandle, Event, FetchTarget, Mutation, RefreshTarget, Request};
use crate::theme::ResolvedTheme;
use crate::types::{Product, ProductDraft, ProductField, ProductFormError, ProductStats};
use crate::util::{format_number, format_raw_datetime};

use super::common::{self, NavOutcome};

fn opt_number(v: Option<f64>) -> String {
    v.map(format_number).unwrap_or_default()
}

fn product_row(p: &Product, theme: &ResolvedTheme, date_format: &str, now: NaiveDateTime) -> Row {
    vec![
        Cell::colored(p.id.to_string(), theme.text_faint),
        Cell::colored(p.name.clone(), theme.text_primary),
        Cell::colored(opt_number(p.calories_per_100g), theme.text_accent),
        Cell::colored(opt_number(p.proteins_per_100g), theme.text_secondary),
        Cell::colored(opt_number(p.fats_per_100g), theme.text_secondary),
        Cell::colored(opt_number(p.carbs_per_100g), theme.text_secondary),
        Cell::colored(
            p.owner_label(),
            if p.is_user_created() {
                theme.text_primary
            } else {
                theme.text_faint
            },
        ),
        Cell::colored(
            format_raw_datetime(p.created_at.as_deref(), date_format, now),
            theme.text_faint,
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    ConfirmDelete { id: i64, name: String },
}

/// State of the edit-product form.
#[derive(Debug, Clone, PartialEq)]
struct EditForm {
    draft: ProductDraft,
    focus: ProductField,
    errors: IndexMap<ProductField, String>,
    saving: bool,
    message: Option<String>,
}

impl EditForm {
    fn open(product: &Product) -> Self {
        Self {
            draft: ProductDraft::from_product(product),
            focus: ProductField::Name,
            errors: IndexMap::new(),
            saving: false,
            message: None,
        }
    }

    /// Map server-side validation keys onto form fields. Unknown keys are
    /// folded into the form message.
    fn apply_server_errors(&mut self, message: String, field_errors: IndexMap<String, String>) {
        self.saving = false;
        self.errors.clear();
        let mut unmatched = Vec::new();
        for (key, msg) in field_errors {
            match ProductField::from_wire_name(&key) {
                Some(field) => {
                    self.errors.insert(field, msg);
                }
                None => unmatched.push(format!("{key}: {msg}")),
            }
        }
        if let Some(first) = self.errors.keys().next() {
            self.focus = *first;
        }
        self.message = Some(if unmatched.is_empty() {
            message
        } else {
            format!("{message} ({})", unmatched.join(", "))
        });
    }

    fn lines(&self, theme: &ResolvedTheme) -> Vec<ModalLine> {
        let mut lines = vec![ModalLine::colored(
            format!("Product #{}", self.draft.id),
            theme.text_faint,
        )];
        lines.push(ModalLine::blank());
        for field in ProductField::ALL {
            let focused = field == self.focus;
            let marker = if focused { '\u{203a}' } else { ' ' };
            let cursor = if focused && !self.saving { "\u{2588}" } else { "" };
            let text = format!(
                "{marker} {:<16} {}{cursor}",
                field.label(),
                self.draft.value(field)
            );
            lines.push(if focused {
                ModalLine {
                    text,
                    color: Some(theme.text_accent),
                    bold: true,
                }
            } else {
                ModalLine::plain(text)
            });
            if let Some(err) = self.errors.get(&field) {
                lines.push(ModalLine::colored(format!("  {:<16} {err}", ""), theme.text_error));
            }
        }
        lines.push(ModalLine::blank());
        if self.saving {
            lines.push(ModalLine::colored("Saving...", theme.text_faint));
        } else if let Some(msg) = &self.message {
            lines.push(ModalLine::colored(msg.clone(), theme.text_error));
        }
        lines
    }
}

fn product_details_lines(
    p: &Product,
    theme: &ResolvedTheme,
    date_format: &str,
    now: NaiveDateTime,
) -> Vec<ModalLine> {
    const LABEL: usize = 18;
    let or_dash = |v: Option<f64>| v.map_or_else(|| "-".to_owned(), format_number);
    vec![
        ModalLine::heading(p.name.clone()),
        ModalLine::colored(format!("#{}", p.id), theme.text_faint),
        ModalLine::blank(),
        ModalLine::field("Calories / 100g", or_dash(p.calories_per_100g), LABEL),
        ModalLine::field("Proteins / 100g", or_dash(p.proteins_per_100g), LABEL),
        ModalLine::field("Fats / 100g", or_dash(p.fats_per_100g), LABEL),
        ModalLine::field("Carbs / 100g", or_dash(p.carbs_per_100g), LABEL),
        ModalLine::blank(),
        ModalLine::field("Created by", p.owner_label(), LABEL),
        ModalLine::field(
            "Created",
            format_raw_datetime(p.created_at.as_deref(), date_format, now),
            LABEL,
        ),
    ]
}

#[derive(Default, Props)]
pub struct ProductsViewProps<'a> {
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
    pub is_active: bool,
}

#[component]
#[allow(clippy::too_many_lines)]
pub fn ProductsView<'a>(
    props: &ProductsViewProps<'a>,
    mut hooks: Hooks,
) -> impl Into<AnyElement<'a>> {
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
        .unwrap_or_else(|| SortSpec::ascending("name"));
    let page_size = view_cfg.page_size.max(1);
    let mut ctrl = hooks.use_state(move || {
        TabularViewController::new(
            Arc::new(Product::schema()),
            initial_sort,
            page_size,
            PagingMode::Client,
        )
    });
    let mut stats = hooks.use_state(ProductStats::default);
    let mut cursor = hooks.use_state(|| 0usize);
    let mut input_mode = hooks.use_state(|| InputMode::Normal);
    let mut search_input = hooks.use_state(String::new);
    let mut search_due = hooks.use_state(|| None::<Instant>);
    let mut action_status = hooks.use_state(|| Option::<StatusMessage>::None);
    let mut edit_form = hooks.use_state(|| Option::<EditForm>::None);
    let mut details = hooks.use_state(|| Option::<Product>::None);
    let mut help_visible = hooks.use_state(|| false);

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
            target: RefreshTarget::Products,
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
        eng.send(Request::FetchProducts {
            force,
            reply_tx: event_tx.clone(),
        });
    }

    hooks.use_future(async move {
        loop {
            smol::Timer::after(Duration::from_millis(100)).await;
            for evt in common::drain_events(&event_rx) {
                match evt {
                    Event::ProductsFetched {
                        products,
                        background,
                    } => {
                        let computed = ProductStats::compute(&products);
                        if background {
                            if ctrl.write().apply_background(products) {
                                stats.set(computed);
                            }
                        } else {
                            ctrl.write().finish_load(Ok(products), LoadPolicy::ResetPage);
                            stats.set(computed);
                            cursor.set(0);
                        }
                    }
                    Event::FetchError {
                        target: FetchTarget::Products,
                        message,
                        background: false,
                    } => {
                        ctrl.write().finish_load(Err(message.clone()), LoadPolicy::ResetPage);
                        action_status.set(Some(StatusMessage::error(message)));
                    }
                    Event::MutationOk {
                        mutation: Mutation::DeleteProduct { id },
                        description,
                    } => {
                        let removed = ctrl.write().remove_by_key(&id);
                        if let Some(product) = removed {
                            stats.write().record_removal(&product);
                        }
                        let rows = ctrl.read().compute_visible_page().rows.len();
                        cursor.set(cursor.get().min(rows.saturating_sub(1)));
                        action_status.set(Some(StatusMessage::success(description)));
                    }
                    Event::MutationOk {
                        mutation: Mutation::UpdateProduct { .. },
                        description,
                    } => {
                        edit_form.set(None);
                        action_status.set(Some(StatusMessage::success(description)));
                        needs_fetch.set(true);
                        force_refresh.set(true);
                    }
                    Event::MutationError {
                        mutation: Mutation::UpdateProduct { id },
                        description,
                        message,
                        field_errors,
                    } => {
                        let form = edit_form.read().clone();
                        match form {
                            Some(mut form) if form.draft.id == id => {
                                form.apply_server_errors(message, field_errors);
                                edit_form.set(Some(form));
                            }
                            _ => action_status
                                .set(Some(StatusMessage::error(format!("{description}: {message}")))),
                        }
                    }
                    Event::MutationError {
                        mutation: Mutation::DeleteProduct { .. },
                        description,
                        message,
                        ..
                    } => {
                        action_status.set(Some(StatusMessage::error(format!("{description}: {message}"))));
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
                if details.read().is_some() {
                    if matches!(code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                        details.set(None);
                    }
                    return;
                }

                // Edit form owns the keyboard while open.
                let form = edit_form.read().clone();
                if let Some(mut form) = form {
                    if form.saving {
                        return;
                    }
                    match code {
                        KeyCode::Esc => {
                            edit_form.set(None);
                            return;
                        }
                        KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
                        KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.prev(),
                        KeyCode::Enter => match form.draft.validate() {
                            Ok(request) => {
                                let Some(ref eng) = engine_kb else {
                                    return;
                                };
                                form.errors.clear();
                                form.message = None;
                                form.saving = true;
                                eng.send(Request::UpdateProduct {
                                    request,
                                    reply_tx: event_tx_kb.clone(),
                                });
                            }
                            Err(ProductFormError(errors)) => {
                                if let Some(first) = errors.keys().next() {
                                    form.focus = *first;
                                }
                                form.errors = errors;
                                form.message = None;
                            }
                        },
                        _ => {
                            let focus = form.focus;
                            if !text_input::edit_line(form.draft.value_mut(focus), code, modifiers) {
                                return;
                            }
                            form.errors.shift_remove(&focus);
                        }
                    }
                    edit_form.set(Some(form));
                    return;
                }

                let current_mode = input_mode.read().clone();
                match current_mode {
                    InputMode::ConfirmDelete { id, name } => {
                        input_mode.set(InputMode::Normal);
                        if matches!(code, KeyCode::Char('y' | 'Y'))
                            && let Some(ref eng) = engine_kb
                        {
                            action_status.set(Some(StatusMessage::info(format!(
                                "Deleting \"{name}\"..."
                            ))));
                            eng.send(Request::DeleteProduct {
                                id,
                                reply_tx: event_tx_kb.clone(),
                            });
                        } else {
                            action_status.set(Some(StatusMessage::info("Delete cancelled")));
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

                let Some(key) = key_event_to_string(code, modifiers, kind) else {
                    return;
                };
                let Some(action) = keybindings
                    .as_ref()
                    .and_then(|kb| kb.resolve(&key, ViewContext::Products))
                else {
                    return;
                };
                let selected = ctrl
                    .read()
                    .compute_visible_page()
                    .rows
                    .get(cursor.get())
                    .map(|p| (*p).clone());
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
                        action_status.set(Some(StatusMessage::info("Reloading products...")));
                    }
                    BuiltinAction::Details => {
                        if selected.is_some() {
                            details.set(selected);
                        }
                    }
                    BuiltinAction::Edit => {
                        if let Some(p) = selected {
                            edit_form.set(Some(EditForm::open(&p)));
                        }
                    }
                    BuiltinAction::Delete => {
                        if let Some(p) = selected {
                            input_mode.set(InputMode::ConfirmDelete {
                                id: p.id,
                                name: p.name,
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
    let c: &TabularViewController<Product> = &ctrl_ref;
    let visible = c.compute_visible_page();
    let rows: Vec<Row> = visible
        .rows
        .iter()
        .map(|p| product_row(p, &theme, date_format, now))
        .collect();
    let columns = columns_from_schema(
        c.schema().as_ref(),
        &[
            ("id", 0.06),
            ("name", 0.3),
            ("calories", 0.08),
            ("proteins", 0.1),
            ("fats", 0.08),
            ("carbs", 0.08),
            ("createdBy", 0.15),
        ],
    );
    let empty_message = if c.query().is_empty() {
        "No products"
    } else {
        "No products match the search"
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

    let s = stats.get();
    let rendered_stats = RenderedStatsBar::build(
        vec![
            ("Products", s.total.to_string()),
            ("User-created", s.user_created.to_string()),
            ("System", s.total.saturating_sub(s.user_created).to_string()),
        ],
        depth,
        theme.text_faint,
        theme.text_primary,
    );

    let rendered_tab_bar = RenderedTabBar::build(
        ViewKind::Products,
        Some(c.entries().len()),
        depth,
        theme.text_accent,
        theme.text_inverted,
        theme.text_secondary,
        theme.border_faint,
    );
    let rendered_pagination = common::pagination_bar(c, &theme, depth);

    let rendered_text_input = match &*input_mode.read() {
        InputMode::Search => Some(RenderedTextInput::build(
            "/",
            &search_input.read(),
            depth,
            theme.text_primary,
            theme.text_secondary,
            theme.border_faint,
        )),
        InputMode::ConfirmDelete { name, .. } => Some(RenderedTextInput::question(
            &format!("Delete product \"{name}\"? (y/n)"),
            depth,
            theme.text_warning,
            theme.border_faint,
        )),
        InputMode::Normal => None,
    };

    let rendered_footer = RenderedFooter::build(
        common::table_context(c, "products"),
        footer::format_updated_ago(c.loaded_at()),
        action_status.read().as_ref(),
        depth,
        &common::footer_colors(&theme),
    );

    let rendered_modal = if let Some(form) = edit_form.read().as_ref() {
        Some(RenderedModal::build(
            "Edit product",
            &form.lines(&theme),
            0,
            "Tab/\u{2193} next  \u{21e7}Tab/\u{2191} prev  Enter save  Esc cancel",
            (props.width, props.height),
            depth,
            &common::modal_colors(&theme),
        ))
    } else {
        details.read().as_ref().map(|p| {
            RenderedModal::build(
                "Product",
                &product_details_lines(p, &theme, date_format, now),
                0,
                "Esc close",
                (props.width, props.height),
                depth,
                &common::modal_colors(&theme),
            )
        })
    };

    let rendered_help = if help_visible.get() {
        common::help_overlay(props.keybindings, ViewContext::Products, &theme, depth)
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
