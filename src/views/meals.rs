use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate};
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
use crate::engine::{EngineHandle, Event, FetchTarget, Mutation, Request};
use crate::theme::ResolvedTheme;
use crate::types::{MAX_MEAL_PRODUCTS, Meal, MealDraft, MealFormError, MealStats};
use crate::util::format_number;

use super::common::{self, NavOutcome};

fn meal_row(m: &Meal, theme: &ResolvedTheme) -> Row {
    vec![
        Cell::colored(m.id.to_string(), theme.text_faint),
        Cell::colored(m.meal_type.clone(), theme.text_primary),
        Cell::colored(m.products_label(), theme.text_secondary),
        Cell::colored(m.total_grams().to_string(), theme.text_secondary),
        Cell::colored(format_number(m.nutrition.calories), theme.text_accent),
        Cell::colored(format_number(m.nutrition.proteins), theme.text_secondary),
        Cell::colored(format_number(m.nutrition.fats), theme.text_secondary),
        Cell::colored(format_number(m.nutrition.carbs), theme.text_secondary),
    ]
}

/// Move `date` by `delta` days. The future holds no meals, so stepping
/// stops at `today`.
fn step_day(date: NaiveDate, delta: i64, today: NaiveDate) -> NaiveDate {
    let days = Days::new(delta.unsigned_abs());
    let moved = if delta < 0 {
        date.checked_sub_days(days)
    } else {
        date.checked_add_days(days)
    };
    moved.unwrap_or(date).min(today)
}

fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    match (today - date).num_days() {
        0 => format!("Today, {}", date.format("%d %b %Y")),
        1 => format!("Yesterday, {}", date.format("%d %b %Y")),
        _ => date.format("%a %d %b %Y").to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    ConfirmDelete { id: i64, label: String },
}

/// Choices offered by the meal form pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct MealCatalog {
    meal_types: Vec<String>,
    products: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormFocus {
    MealType,
    Product(usize),
    Grams(usize),
}

/// Step through `options` from `current`, wrapping at both ends. An unknown
/// or empty value starts from the first (or last) option.
fn cycle_option(options: &[String], current: &str, step: isize) -> Option<String> {
    if options.is_empty() {
        return None;
    }
    let len = options.len();
    let next = match options.iter().position(|o| o == current) {
        Some(i) => (i + len).wrapping_add_signed(step) % len,
        None if step < 0 => len - 1,
        None => 0,
    };
    options.get(next).cloned()
}

/// Next option after `current` starting with `initial`, case-insensitive.
fn jump_to_initial(options: &[String], current: &str, initial: char) -> Option<String> {
    let start = options
        .iter()
        .position(|o| o == current)
        .map_or(0, |i| i + 1);
    let wanted = initial.to_lowercase().to_string();
    options
        .iter()
        .cycle()
        .skip(start)
        .take(options.len())
        .find(|o| o.to_lowercase().starts_with(&wanted))
        .cloned()
}

/// State of the create/edit meal form.
#[derive(Debug, Clone, PartialEq)]
struct MealForm {
    draft: MealDraft,
    focus: FormFocus,
    error: Option<String>,
    error_row: Option<usize>,
    saving: bool,
}

impl MealForm {
    fn create() -> Self {
        Self::with_draft(MealDraft::default())
    }

    fn edit(meal: &Meal) -> Self {
        Self::with_draft(MealDraft::from_meal(meal))
    }

    fn with_draft(draft: MealDraft) -> Self {
        Self {
            draft,
            focus: FormFocus::MealType,
            error: None,
            error_row: None,
            saving: false,
        }
    }

    fn focus_order(&self) -> Vec<FormFocus> {
        let mut order = vec![FormFocus::MealType];
        for i in 0..self.draft.rows.len() {
            order.push(FormFocus::Product(i));
            order.push(FormFocus::Grams(i));
        }
        order
    }

    fn move_focus(&mut self, step: isize) {
        let order = self.focus_order();
        let i = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = (i + order.len()).wrapping_add_signed(step) % order.len();
        self.focus = order[next];
    }

    fn focused_row(&self) -> Option<usize> {
        match self.focus {
            FormFocus::MealType => None,
            FormFocus::Product(i) | FormFocus::Grams(i) => Some(i),
        }
    }

    /// Left/right on a picker field.
    fn cycle(&mut self, catalog: &MealCatalog, step: isize) -> bool {
        let (options, value) = match self.focus {
            FormFocus::MealType => (&catalog.meal_types, &mut self.draft.meal_type),
            FormFocus::Product(i) => match self.draft.rows.get_mut(i) {
                Some(row) => (&catalog.products, &mut row.product),
                None => return false,
            },
            FormFocus::Grams(_) => return false,
        };
        match cycle_option(options, value, step) {
            Some(choice) => {
                *value = choice;
                true
            }
            None => false,
        }
    }

    /// Apply a typed key to the focused field. Pickers jump by initial
    /// letter; the weight field takes digits only.
    fn type_key(&mut self, catalog: &MealCatalog, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match self.focus {
            FormFocus::Grams(i) => {
                let Some(row) = self.draft.rows.get_mut(i) else {
                    return false;
                };
                match code {
                    KeyCode::Char(c)
                        if !c.is_ascii_digit() && !modifiers.contains(KeyModifiers::CONTROL) =>
                    {
                        false
                    }
                    _ => text_input::edit_line(&mut row.grams, code, modifiers),
                }
            }
            FormFocus::MealType | FormFocus::Product(_) => {
                let (options, value) = match self.focus {
                    FormFocus::Product(i) => match self.draft.rows.get_mut(i) {
                        Some(row) => (&catalog.products, &mut row.product),
                        None => return false,
                    },
                    _ => (&catalog.meal_types, &mut self.draft.meal_type),
                };
                match code {
                    KeyCode::Backspace => {
                        let changed = !value.is_empty();
                        value.clear();
                        changed
                    }
                    KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
                        match jump_to_initial(options, value, c) {
                            Some(choice) => {
                                *value = choice;
                                true
                            }
                            None => false,
                        }
                    }
                    _ => false,
                }
            }
        }
    }

    fn add_row(&mut self) -> bool {
        if !self.draft.add_row() {
            self.error = Some(format!("at most {MAX_MEAL_PRODUCTS} products per meal"));
            return false;
        }
        self.focus = FormFocus::Product(self.draft.rows.len() - 1);
        true
    }

    fn remove_row(&mut self) -> bool {
        let Some(row) = self.focused_row() else {
            return false;
        };
        if !self.draft.remove_row(row) {
            return false;
        }
        let last = self.draft.rows.len() - 1;
        self.focus = FormFocus::Product(row.min(last));
        self.error_row = None;
        true
    }

    fn lines(&self, theme: &ResolvedTheme, catalog: Option<&MealCatalog>) -> Vec<ModalLine> {
        let focused = |f: FormFocus| f == self.focus && !self.saving;
        let field = |f: FormFocus, text: String| {
            if focused(f) {
                ModalLine {
                    text,
                    color: Some(theme.text_accent),
                    bold: true,
                }
            } else {
                ModalLine::plain(text)
            }
        };
        let picker = |value: &str| {
            if value.is_empty() {
                "\u{2039} choose \u{203a}".to_owned()
            } else {
                format!("\u{2039} {value} \u{203a}")
            }
        };
        let marker = |f: FormFocus| if focused(f) { '\u{203a}' } else { ' ' };

        let mut lines = vec![ModalLine::colored(
            match self.draft.id {
                Some(id) => format!("Meal #{id}"),
                None => "Logged for today".to_owned(),
            },
            theme.text_faint,
        )];
        lines.push(ModalLine::blank());
        lines.push(field(
            FormFocus::MealType,
            format!(
                "{} {:<10} {}",
                marker(FormFocus::MealType),
                "Meal type",
                picker(&self.draft.meal_type)
            ),
        ));
        lines.push(ModalLine::blank());
        for (i, row) in self.draft.rows.iter().enumerate() {
            lines.push(field(
                FormFocus::Product(i),
                format!(
                    "{} {:<10} {}",
                    marker(FormFocus::Product(i)),
                    format!("Product {}", i + 1),
                    picker(&row.product)
                ),
            ));
            let cursor = if focused(FormFocus::Grams(i)) { "\u{2588}" } else { "" };
            lines.push(field(
                FormFocus::Grams(i),
                format!("{} {:<10} {}{cursor} g", marker(FormFocus::Grams(i)), "", row.grams),
            ));
            if self.error_row == Some(i)
                && let Some(err) = &self.error
            {
                lines.push(ModalLine::colored(format!("  {:<10} {err}", ""), theme.text_error));
            }
        }
        lines.push(ModalLine::blank());
        if self.saving {
            lines.push(ModalLine::colored("Saving...", theme.text_faint));
        } else if catalog.is_none() {
            lines.push(ModalLine::colored("Loading meal types and products...", theme.text_faint));
        } else if self.error_row.is_none()
            && let Some(err) = &self.error
        {
            lines.push(ModalLine::colored(err.clone(), theme.text_error));
        }
        lines
    }
}

fn meal_details_lines(m: &Meal, date: NaiveDate, theme: &ResolvedTheme) -> Vec<ModalLine> {
    const LABEL: usize = 12;
    let mut lines = vec![
        ModalLine::heading(m.meal_type.clone()),
        ModalLine::colored(format!("#{}  {}", m.id, date.format("%Y-%m-%d")), theme.text_faint),
        ModalLine::blank(),
    ];
    if m.meal_entries.is_empty() {
        lines.push(ModalLine::colored("No products recorded", theme.text_faint));
    }
    for entry in &m.meal_entries {
        lines.push(ModalLine::field(
            &entry.product_name,
            format!("{} g", entry.quantity_grams),
            LABEL.max(entry.product_name.chars().count()),
        ));
    }
    lines.push(ModalLine::blank());
    lines.push(ModalLine::field("Calories", format_number(m.nutrition.calories), LABEL));
    lines.push(ModalLine::field("Proteins", format_number(m.nutrition.proteins), LABEL));
    lines.push(ModalLine::field("Fats", format_number(m.nutrition.fats), LABEL));
    lines.push(ModalLine::field("Carbs", format_number(m.nutrition.carbs), LABEL));
    lines
}

#[derive(Default, Props)]
pub struct MealsViewProps<'a> {
    pub config: Option<&'a TableViewConfig>,
    pub engine: Option<&'a EngineHandle>,
    pub theme: Option<&'a ResolvedTheme>,
    pub keybindings: Option<&'a MergedBindings>,
    pub color_depth: ColorDepth,
    pub width: u16,
    pub height: u16,
    pub search_debounce_ms: u64,
    pub should_exit: Option<State<bool>>,
    pub switch_view: Option<State<bool>>,
    pub switch_view_back: Option<State<bool>>,
    pub is_active: bool,
}

#[component]
#[allow(clippy::too_many_lines)]
pub fn MealsView<'a>(props: &MealsViewProps<'a>, mut hooks: Hooks) -> impl Into<AnyElement<'a>> {
    let theme = props.theme.cloned().unwrap_or_else(super::default_theme);
    let depth = props.color_depth;
    let is_active = props.is_active;
    let should_exit = props.should_exit;
    let switch_view = props.switch_view;
    let switch_view_back = props.switch_view_back;
    let view_cfg = props.config.cloned().unwrap_or_default();
    let debounce = Duration::from_millis(props.search_debounce_ms.max(50));

    let initial_sort = view_cfg
        .sort
        .clone()
        .unwrap_or_else(|| SortSpec::ascending("id"));
    let page_size = view_cfg.page_size.max(1);
    let mut ctrl = hooks.use_state(move || {
        TabularViewController::new(
            Arc::new(Meal::schema()),
            initial_sort,
            page_size,
            PagingMode::Client,
        )
    });
    let mut date = hooks.use_state(common::today);
    let mut stats = hooks.use_state(MealStats::default);
    let mut cursor = hooks.use_state(|| 0usize);
    let mut input_mode = hooks.use_state(|| InputMode::Normal);
    let mut search_input = hooks.use_state(String::new);
    let mut search_due = hooks.use_state(|| None::<Instant>);
    let mut action_status = hooks.use_state(|| Option::<StatusMessage>::None);
    let mut meal_form = hooks.use_state(|| Option::<MealForm>::None);
    let mut catalog = hooks.use_state(|| Option::<MealCatalog>::None);
    let mut details = hooks.use_state(|| Option::<Meal>::None);
    let mut help_visible = hooks.use_state(|| false);

    let mut needs_fetch = hooks.use_state(|| true);
    let mut force_refresh = hooks.use_state(|| false);
    let mut needs_catalog = hooks.use_state(|| true);

    let event_channel = hooks.use_state(common::event_channel);
    let (event_tx, event_rx) = event_channel.read().clone();
    let engine: Option<EngineHandle> = props.engine.cloned();

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
        eng.send(Request::FetchMeals {
            date: date.get(),
            force,
            reply_tx: event_tx.clone(),
        });
    }

    if needs_catalog.get()
        && is_active
        && let Some(ref eng) = engine
    {
        needs_catalog.set(false);
        eng.send(Request::FetchMealCatalog {
            reply_tx: event_tx.clone(),
        });
    }

    hooks.use_future(async move {
        loop {
            smol::Timer::after(Duration::from_millis(100)).await;
            for evt in common::drain_events(&event_rx) {
                match evt {
                    Event::MealsFetched { date: day, meals } => {
                        if day == date.get() {
                            stats.set(MealStats::compute(&meals));
                            ctrl.write().finish_load(Ok(meals), LoadPolicy::ResetPage);
                            cursor.set(0);
                        } else {
                            // The day changed in flight; its own fetch is queued.
                            ctrl.write().abandon_load();
                        }
                    }
                    Event::FetchError {
                        target: FetchTarget::Meals,
                        message,
                        ..
                    } => {
                        ctrl.write().finish_load(Err(message.clone()), LoadPolicy::ResetPage);
                        stats.set(MealStats::default());
                        action_status.set(Some(StatusMessage::error(message)));
                    }
                    Event::MealCatalogFetched {
                        meal_types,
                        product_names,
                    } => {
                        catalog.set(Some(MealCatalog {
                            meal_types: meal_types.into_iter().map(|t| t.name).collect(),
                            products: product_names,
                        }));
                    }
                    Event::FetchError {
                        target: FetchTarget::MealCatalog,
                        message,
                        ..
                    } => {
                        action_status.set(Some(StatusMessage::error(format!(
                            "Meal form options: {message}"
                        ))));
                    }
                    Event::MutationOk {
                        mutation: Mutation::SaveMeal { .. },
                        description,
                    } => {
                        meal_form.set(None);
                        action_status.set(Some(StatusMessage::success(description)));
                        needs_fetch.set(true);
                        force_refresh.set(true);
                    }
                    Event::MutationError {
                        mutation: Mutation::SaveMeal { .. },
                        description,
                        message,
                        field_errors,
                    } => {
                        let form = meal_form.read().clone();
                        let mut message = message;
                        if !field_errors.is_empty() {
                            let fields: Vec<String> =
                                field_errors.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                            message = format!("{message} ({})", fields.join(", "));
                        }
                        match form {
                            Some(mut form) => {
                                form.saving = false;
                                form.error_row = None;
                                form.error = Some(message);
                                meal_form.set(Some(form));
                            }
                            None => action_status
                                .set(Some(StatusMessage::error(format!("{description}: {message}")))),
                        }
                    }
                    Event::MutationOk {
                        mutation: Mutation::DeleteMeal { id },
                        description,
                    } => {
                        let removed = ctrl.write().remove_by_key(&id);
                        if let Some(meal) = removed {
                            stats.write().record_removal(&meal);
                        }
                        let rows = ctrl.read().compute_visible_page().rows.len();
                        cursor.set(cursor.get().min(rows.saturating_sub(1)));
                        action_status.set(Some(StatusMessage::success(description)));
                    }
                    Event::MutationError {
                        mutation: Mutation::DeleteMeal { .. },
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

                // The form owns the keyboard while open.
                let form = meal_form.read().clone();
                if let Some(mut form) = form {
                    if form.saving {
                        return;
                    }
                    let options = catalog.read().clone().unwrap_or_default();
                    let ctrl_key = modifiers.contains(KeyModifiers::CONTROL);
                    match code {
                        KeyCode::Esc => {
                            meal_form.set(None);
                            return;
                        }
                        KeyCode::Tab | KeyCode::Down => form.move_focus(1),
                        KeyCode::BackTab | KeyCode::Up => form.move_focus(-1),
                        KeyCode::Left => {
                            form.cycle(&options, -1);
                        }
                        KeyCode::Right => {
                            form.cycle(&options, 1);
                        }
                        KeyCode::Char('n') if ctrl_key => {
                            if form.add_row() {
                                form.error = None;
                            }
                        }
                        KeyCode::Char('d') if ctrl_key => {
                            form.remove_row();
                        }
                        KeyCode::Enter => match form.draft.validate() {
                            Ok(request) => {
                                let Some(ref eng) = engine_kb else {
                                    return;
                                };
                                form.error = None;
                                form.error_row = None;
                                form.saving = true;
                                eng.send(Request::SaveMeal {
                                    request,
                                    reply_tx: event_tx_kb.clone(),
                                });
                            }
                            Err(err) => {
                                form.error_row = err.row();
                                form.focus = match err {
                                    MealFormError::IncompleteRow(row) => FormFocus::Product(row),
                                    MealFormError::BadWeight(row) => FormFocus::Grams(row),
                                    MealFormError::NoProducts => FormFocus::Product(0),
                                    MealFormError::NoMealType => FormFocus::MealType,
                                };
                                form.error = Some(err.to_string());
                            }
                        },
                        _ => {
                            if !form.type_key(&options, code, modifiers) {
                                return;
                            }
                            if form.error_row == form.focused_row() {
                                form.error = None;
                                form.error_row = None;
                            }
                        }
                    }
                    meal_form.set(Some(form));
                    return;
                }

                let current_mode = input_mode.read().clone();
                match current_mode {
                    InputMode::ConfirmDelete { id, label } => {
                        input_mode.set(InputMode::Normal);
                        if matches!(code, KeyCode::Char('y' | 'Y'))
                            && let Some(ref eng) = engine_kb
                        {
                            action_status.set(Some(StatusMessage::info(format!(
                                "Deleting {label}..."
                            ))));
                            eng.send(Request::DeleteMeal {
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
                    .and_then(|kb| kb.resolve(&key, ViewContext::Meals))
                else {
                    return;
                };
                let selected = ctrl
                    .read()
                    .compute_visible_page()
                    .rows
                    .get(cursor.get())
                    .map(|m| (*m).clone());
                let today = common::today();
                let shown_day = date.get();
                let mut new_day = None;
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
                        if catalog.read().is_none() {
                            needs_catalog.set(true);
                        }
                        action_status.set(Some(StatusMessage::info("Reloading meals...")));
                    }
                    BuiltinAction::CursorLeft => new_day = Some(step_day(shown_day, -1, today)),
                    BuiltinAction::CursorRight => new_day = Some(step_day(shown_day, 1, today)),
                    BuiltinAction::Today => new_day = Some(today),
                    BuiltinAction::Details => {
                        if selected.is_some() {
                            details.set(selected);
                        }
                    }
                    BuiltinAction::Create => {
                        if shown_day == today {
                            meal_form.set(Some(MealForm::create()));
                        } else {
                            action_status.set(Some(StatusMessage::info(
                                "New meals are logged for today",
                            )));
                        }
                    }
                    BuiltinAction::Edit => {
                        if let Some(m) = selected {
                            meal_form.set(Some(MealForm::edit(&m)));
                        }
                    }
                    BuiltinAction::Delete => {
                        if let Some(m) = selected {
                            input_mode.set(InputMode::ConfirmDelete {
                                id: m.id,
                                label: format!("{} #{}", m.meal_type, m.id),
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
                if let Some(day) = new_day
                    && day != shown_day
                {
                    date.set(day);
                    cursor.set(0);
                    needs_fetch.set(true);
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

    let today = common::today();
    let day = date.get();
    let ctrl_ref = ctrl.read();
    let c: &TabularViewController<Meal> = &ctrl_ref;
    let visible = c.compute_visible_page();
    let rows: Vec<Row> = visible.rows.iter().map(|m| meal_row(m, &theme)).collect();
    let columns = columns_from_schema(
        c.schema().as_ref(),
        &[
            ("id", 0.06),
            ("mealType", 0.14),
            ("products", 0.34),
            ("grams", 0.08),
            ("calories", 0.08),
            ("proteins", 0.1),
            ("fats", 0.08),
        ],
    );
    let empty_message = if c.query().is_empty() {
        "No meals logged on this day"
    } else {
        "No meals match the search"
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
            ("Day", day_label(day, today)),
            ("Meals", s.meals.to_string()),
            ("Kcal", format_number(s.totals.calories)),
            ("Proteins", format_number(s.totals.proteins)),
            ("Fats", format_number(s.totals.fats)),
            ("Carbs", format_number(s.totals.carbs)),
        ],
        depth,
        theme.text_faint,
        theme.text_primary,
    );

    let rendered_tab_bar = RenderedTabBar::build(
        ViewKind::Meals,
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
        InputMode::ConfirmDelete { label, .. } => Some(RenderedTextInput::question(
            &format!("Delete {label}? (y/n)"),
            depth,
            theme.text_warning,
            theme.border_faint,
        )),
        InputMode::Normal => None,
    };

    let rendered_footer = RenderedFooter::build(
        common::table_context(c, "meals"),
        footer::format_updated_ago(c.loaded_at()),
        action_status.read().as_ref(),
        depth,
        &common::footer_colors(&theme),
    );

    let rendered_modal = if let Some(form) = meal_form.read().as_ref() {
        let title = if form.draft.id.is_some() {
            "Edit meal"
        } else {
            "Log a meal"
        };
        Some(RenderedModal::build(
            title,
            &form.lines(&theme, catalog.read().as_ref()),
            0,
            "Tab next  \u{2190}/\u{2192} choose  ^N add row  ^D remove row  Enter save  Esc cancel",
            (props.width, props.height),
            depth,
            &common::modal_colors(&theme),
        ))
    } else {
        details.read().as_ref().map(|m| {
            RenderedModal::build(
                "Meal",
                &meal_details_lines(m, day, &theme),
                0,
                "Esc close",
                (props.width, props.height),
                depth,
                &common::modal_colors(&theme),
            )
        })
    };

    let rendered_help = if help_visible.get() {
        common::help_overlay(props.keybindings, ViewContext::Meals, &theme, depth)
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

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).expect("valid date")
    }

    fn lunch() -> Meal {
        serde_json::from_str(
            r#"{"id":4,"mealType":"Lunch","mealEntries":[
                {"productName":"Rice","quantityGrams":180},
                {"productName":"Chicken","quantityGrams":120}]}"#,
        )
        .expect("valid json")
    }

    fn catalog() -> MealCatalog {
        MealCatalog {
            meal_types: vec!["Breakfast".into(), "Lunch".into(), "Dinner".into()],
            products: vec!["Apple".into(), "Avocado".into(), "Chicken".into(), "Rice".into()],
        }
    }

    #[test]
    fn row_has_one_cell_per_column() {
        let mut meal = lunch();
        meal.nutrition.calories = 474.0;
        let row = meal_row(&meal, &ResolvedTheme::default());
        assert_eq!(row.len(), Meal::schema().len());
        let texts: Vec<&str> = row.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(&texts[..5], ["4", "Lunch", "Rice, Chicken", "300", "474"]);
    }

    #[test]
    fn days_step_back_freely_but_stop_at_today() {
        let today = d(3, 14);
        assert_eq!(step_day(d(3, 1), -1, today), d(2, 28));
        assert_eq!(step_day(d(3, 13), 1, today), today);
        assert_eq!(step_day(today, 1, today), today);
        assert_eq!(day_label(today, today), "Today, 14 Mar 2025");
        assert_eq!(day_label(d(3, 13), today), "Yesterday, 13 Mar 2025");
        assert_eq!(day_label(d(3, 10), today), "Mon 10 Mar 2025");
    }

    #[test]
    fn pickers_wrap_and_jump_by_initial() {
        let options = catalog().products;
        assert_eq!(cycle_option(&options, "", 1).as_deref(), Some("Apple"));
        assert_eq!(cycle_option(&options, "", -1).as_deref(), Some("Rice"));
        assert_eq!(cycle_option(&options, "Rice", 1).as_deref(), Some("Apple"));
        assert_eq!(cycle_option(&options, "Apple", -1).as_deref(), Some("Rice"));
        assert_eq!(jump_to_initial(&options, "", 'a').as_deref(), Some("Apple"));
        assert_eq!(jump_to_initial(&options, "Apple", 'a').as_deref(), Some("Avocado"));
        assert_eq!(jump_to_initial(&options, "Avocado", 'A').as_deref(), Some("Apple"));
        assert_eq!(jump_to_initial(&options, "Apple", 'z'), None);
        assert_eq!(cycle_option(&[], "", 1), None);
    }

    #[test]
    fn form_focus_walks_every_row() {
        let mut form = MealForm::edit(&lunch());
        let order = form.focus_order();
        assert_eq!(order.len(), 5);
        form.move_focus(-1);
        assert_eq!(form.focus, FormFocus::Grams(1));
        form.move_focus(1);
        assert_eq!(form.focus, FormFocus::MealType);
    }

    #[test]
    fn weight_field_takes_digits_only() {
        let options = catalog();
        let mut form = MealForm::create();
        form.focus = FormFocus::Grams(0);
        assert!(form.type_key(&options, KeyCode::Char('1'), KeyModifiers::empty()));
        assert!(!form.type_key(&options, KeyCode::Char('x'), KeyModifiers::empty()));
        assert!(form.type_key(&options, KeyCode::Char('5'), KeyModifiers::empty()));
        assert_eq!(form.draft.rows[0].grams, "15");

        form.focus = FormFocus::Product(0);
        assert!(form.type_key(&options, KeyCode::Char('c'), KeyModifiers::empty()));
        assert_eq!(form.draft.rows[0].product, "Chicken");
        assert!(form.cycle(&options, 1));
        assert_eq!(form.draft.rows[0].product, "Rice");
        assert!(form.type_key(&options, KeyCode::Backspace, KeyModifiers::empty()));
        assert!(form.draft.rows[0].product.is_empty());
    }

    #[test]
    fn rows_are_added_up_to_the_limit_and_removed_in_place() {
        let mut form = MealForm::edit(&lunch());
        assert!(form.add_row());
        assert_eq!(form.focus, FormFocus::Product(2));
        while form.add_row() {}
        assert_eq!(form.draft.rows.len(), MAX_MEAL_PRODUCTS);
        assert_eq!(form.error.as_deref(), Some("at most 8 products per meal"));

        form.focus = FormFocus::Grams(0);
        assert!(form.remove_row());
        assert_eq!(form.draft.rows[0].product, "Chicken");
        assert_eq!(form.focus, FormFocus::Product(0));
        form.focus = FormFocus::MealType;
        assert!(!form.remove_row());
    }

    #[test]
    fn form_lines_mark_the_focused_picker_and_row_errors() {
        let theme = ResolvedTheme::default();
        let mut form = MealForm::edit(&lunch());
        form.focus = FormFocus::Product(1);
        form.error_row = Some(1);
        form.error = Some("fill in both product and weight on row 2".to_owned());
        let lines = form.lines(&theme, Some(&catalog()));
        let focused = lines
            .iter()
            .find(|l| l.text.starts_with('\u{203a}'))
            .expect("focused line");
        assert!(focused.text.contains("Product 2") && focused.text.contains("Chicken"));
        assert!(lines.iter().any(|l| l.text.ends_with("on row 2")));
        assert!(lines[0].text.contains("Meal #4"));
    }

    #[test]
    fn details_list_each_product_and_totals() {
        let lines = meal_details_lines(&lunch(), d(3, 14), &ResolvedTheme::default());
        assert_eq!(lines[0].text, "Lunch");
        assert!(lines[1].text.contains("2025-03-14"));
        assert!(lines.iter().any(|l| l.text.starts_with("Rice") && l.text.ends_with("180 g")));
        assert!(lines.iter().any(|l| l.text.starts_with("Calories")));
    }
}
