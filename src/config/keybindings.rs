use std::collections::HashSet;

use iocraft::prelude::{KeyCode, KeyEventKind, KeyModifiers};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// A single key binding: maps a key chord to a built-in action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Keybinding {
    pub key: String,
    pub builtin: String,
    pub name: Option<String>,
}

/// Keybinding overrides from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeybindingsConfig {
    pub universal: Vec<Keybinding>,
    pub users: Vec<Keybinding>,
    pub products: Vec<Keybinding>,
    pub meals: Vec<Keybinding>,
    pub reports: Vec<Keybinding>,
    pub calendar: Vec<Keybinding>,
}

/// View-independent action identifier used for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinAction {
    // Universal
    MoveDown,
    MoveUp,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    CyclePageSize,
    /// Sort by the 1-based column.
    SortColumn(usize),
    Search,
    Refresh,
    Details,
    NextView,
    PrevView,
    ToggleHelp,
    Quit,
    // Products, meals
    Edit,
    Delete,
    // Meals
    Today,
    // Reports, meals
    Create,
    Retry,
    Download,
    Latest,
    PresetWeek,
    PresetMonth,
    // Calendar
    PrevMonth,
    NextMonth,
    CursorLeft,
    CursorRight,
    ToggleAnchor,
}

impl BuiltinAction {
    /// Parse a builtin action name from the config string.
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(n) = name.strip_prefix("sort_column_") {
            return n
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .map(Self::SortColumn);
        }
        Some(match name {
            "move_down" => Self::MoveDown,
            "move_up" => Self::MoveUp,
            "next_page" => Self::NextPage,
            "prev_page" => Self::PrevPage,
            "first_page" => Self::FirstPage,
            "last_page" => Self::LastPage,
            "cycle_page_size" => Self::CyclePageSize,
            "search" => Self::Search,
            "refresh" => Self::Refresh,
            "details" => Self::Details,
            "next_view" => Self::NextView,
            "prev_view" => Self::PrevView,
            "toggle_help" => Self::ToggleHelp,
            "quit" => Self::Quit,
            "edit" => Self::Edit,
            "delete" => Self::Delete,
            "today" => Self::Today,
            "create" => Self::Create,
            "retry" => Self::Retry,
            "download" => Self::Download,
            "latest" => Self::Latest,
            "preset_week" => Self::PresetWeek,
            "preset_month" => Self::PresetMonth,
            "prev_month" => Self::PrevMonth,
            "next_month" => Self::NextMonth,
            "cursor_left" => Self::CursorLeft,
            "cursor_right" => Self::CursorRight,
            "toggle_anchor" => Self::ToggleAnchor,
            _ => return None,
        })
    }

    /// Human-readable description of this action (for help overlay).
    pub fn description(self) -> &'static str {
        match self {
            Self::MoveDown => "Move cursor down",
            Self::MoveUp => "Move cursor up",
            Self::NextPage => "Next page",
            Self::PrevPage => "Previous page",
            Self::FirstPage => "First page",
            Self::LastPage => "Last page",
            Self::CyclePageSize => "Change page size",
            Self::SortColumn(_) => "Sort by column",
            Self::Search => "Search / filter",
            Self::Refresh => "Reload from server",
            Self::Details => "Open details",
            Self::NextView => "Next view",
            Self::PrevView => "Previous view",
            Self::ToggleHelp => "Toggle help overlay",
            Self::Quit => "Quit",
            Self::Edit => "Edit",
            Self::Delete => "Delete",
            Self::Today => "Jump to today",
            Self::Create => "Create",
            Self::Retry => "Retry report",
            Self::Download => "Download CSV",
            Self::Latest => "Open latest report",
            Self::PresetWeek => "Last 7 days",
            Self::PresetMonth => "Month to date",
            Self::PrevMonth => "Previous month",
            Self::NextMonth => "Next month",
            Self::CursorLeft => "Previous day",
            Self::CursorRight => "Next day",
            Self::ToggleAnchor => "Start / finish range",
        }
    }
}

// ---------------------------------------------------------------------------
// Key string conversion
// ---------------------------------------------------------------------------

/// Convert a terminal key event to the canonical key string used in config.
///
/// Examples: `"j"`, `"G"`, `"ctrl+c"`, `"alt+d"`, `"enter"`, `"space"`,
/// `"pagedown"`, `"f5"`.
pub fn key_event_to_string(
    code: KeyCode,
    modifiers: KeyModifiers,
    kind: KeyEventKind,
) -> Option<String> {
    if kind == KeyEventKind::Release {
        return None;
    }

    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    let base: String = match code {
        KeyCode::Char(' ') => "space".into(),
        // Shift is carried by the char itself ('G' vs 'g').
        KeyCode::Char(c) if ctrl => c.to_ascii_lowercase().to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::F(n) => format!("f{n}"),
        other => named_key(other)?.into(),
    };

    let mut chord = String::new();
    if ctrl {
        chord.push_str("ctrl+");
    }
    if modifiers.contains(KeyModifiers::ALT) {
        chord.push_str("alt+");
    }
    chord.push_str(&base);
    Some(chord)
}

fn named_key(code: KeyCode) -> Option<&'static str> {
    Some(match code {
        KeyCode::Enter => "enter",
        KeyCode::Esc => "esc",
        KeyCode::Backspace => "backspace",
        KeyCode::Tab => "tab",
        KeyCode::BackTab => "backtab",
        KeyCode::Delete => "delete",
        KeyCode::Up => "up",
        KeyCode::Down => "down",
        KeyCode::Left => "left",
        KeyCode::Right => "right",
        KeyCode::PageUp => "pageup",
        KeyCode::PageDown => "pagedown",
        KeyCode::Home => "home",
        KeyCode::End => "end",
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Default keybindings
// ---------------------------------------------------------------------------

fn kb(key: &str, builtin: &str, name: &str) -> Keybinding {
    Keybinding {
        key: key.to_owned(),
        builtin: builtin.to_owned(),
        name: Some(name.to_owned()),
    }
}

/// Default universal keybindings (all views).
pub fn default_universal() -> Vec<Keybinding> {
    let mut bindings = vec![
        kb("j", "move_down", "Move cursor down"),
        kb("down", "move_down", "Move cursor down"),
        kb("k", "move_up", "Move cursor up"),
        kb("up", "move_up", "Move cursor up"),
        kb("l", "next_page", "Next page"),
        kb("pagedown", "next_page", "Next page"),
        kb("h", "prev_page", "Previous page"),
        kb("pageup", "prev_page", "Previous page"),
        kb("g", "first_page", "First page"),
        kb("home", "first_page", "First page"),
        kb("G", "last_page", "Last page"),
        kb("end", "last_page", "Last page"),
        kb("z", "cycle_page_size", "Change page size"),
        kb("/", "search", "Search / filter"),
        kb("r", "refresh", "Reload"),
        kb("enter", "details", "Open details"),
        kb("tab", "next_view", "Next view"),
        kb("backtab", "prev_view", "Previous view"),
        kb("?", "toggle_help", "Toggle help"),
        kb("q", "quit", "Quit"),
        kb("ctrl+c", "quit", "Quit"),
    ];
    bindings.extend((1..=9).map(|n| {
        let name = format!("Sort by column {n}");
        kb(&n.to_string(), &format!("sort_column_{n}"), &name)
    }));
    bindings
}

pub fn default_users() -> Vec<Keybinding> {
    Vec::new()
}

pub fn default_products() -> Vec<Keybinding> {
    vec![
        kb("e", "edit", "Edit product"),
        kb("d", "delete", "Delete product"),
        kb("delete", "delete", "Delete product"),
    ]
}

pub fn default_meals() -> Vec<Keybinding> {
    vec![
        kb("n", "create", "Log a meal"),
        kb("e", "edit", "Edit meal"),
        kb("d", "delete", "Delete meal"),
        kb("delete", "delete", "Delete meal"),
        kb("[", "cursor_left", "Previous day"),
        kb("left", "cursor_left", "Previous day"),
        kb("]", "cursor_right", "Next day"),
        kb("right", "cursor_right", "Next day"),
        kb("t", "today", "Jump to today"),
    ]
}

pub fn default_reports() -> Vec<Keybinding> {
    vec![
        kb("n", "create", "Create report"),
        kb("R", "retry", "Retry report"),
        kb("D", "download", "Download CSV"),
        kb("L", "latest", "Open latest report"),
        kb("w", "preset_week", "Last 7 days"),
        kb("m", "preset_month", "Month to date"),
        kb("left", "cursor_left", "Previous day"),
        kb("right", "cursor_right", "Next day"),
        kb("space", "toggle_anchor", "Start / finish range"),
    ]
}

pub fn default_calendar() -> Vec<Keybinding> {
    vec![
        kb("[", "prev_month", "Previous month"),
        kb("p", "prev_month", "Previous month"),
        kb("]", "next_month", "Next month"),
        kb("n", "next_month", "Next month"),
        kb("h", "cursor_left", "Previous day"),
        kb("left", "cursor_left", "Previous day"),
        kb("l", "cursor_right", "Next day"),
        kb("right", "cursor_right", "Next day"),
        kb("space", "toggle_anchor", "Start / finish range"),
        kb("w", "preset_week", "Last 7 days"),
        kb("m", "preset_month", "Month to date"),
    ]
}

// ---------------------------------------------------------------------------
// Merged keybinding set
// ---------------------------------------------------------------------------

/// View context for keybinding resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewContext {
    Users,
    Products,
    Meals,
    Reports,
    Calendar,
}

impl ViewContext {
    pub fn label(self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::Products => "Products",
            Self::Meals => "Meals",
            Self::Reports => "Reports",
            Self::Calendar => "Calendar",
        }
    }
}

/// Defaults merged with user overrides. A user binding replaces the default
/// for the same key within its context.
#[derive(Debug, Clone)]
pub struct MergedBindings {
    pub universal: Vec<Keybinding>,
    pub users: Vec<Keybinding>,
    pub products: Vec<Keybinding>,
    pub meals: Vec<Keybinding>,
    pub reports: Vec<Keybinding>,
    pub calendar: Vec<Keybinding>,
}

impl Default for MergedBindings {
    fn default() -> Self {
        Self::from_config(&KeybindingsConfig::default())
    }
}

impl MergedBindings {
    pub fn from_config(config: &KeybindingsConfig) -> Self {
        Self {
            universal: merge_lists(&default_universal(), &config.universal),
            users: merge_lists(&default_users(), &config.users),
            products: merge_lists(&default_products(), &config.products),
            meals: merge_lists(&default_meals(), &config.meals),
            reports: merge_lists(&default_reports(), &config.reports),
            calendar: merge_lists(&default_calendar(), &config.calendar),
        }
    }

    fn context(&self, context: ViewContext) -> &[Keybinding] {
        match context {
            ViewContext::Users => &self.users,
            ViewContext::Products => &self.products,
            ViewContext::Meals => &self.meals,
            ViewContext::Reports => &self.reports,
            ViewContext::Calendar => &self.calendar,
        }
    }

    /// Context-specific bindings win over universal ones.
    pub fn resolve(&self, key: &str, context: ViewContext) -> Option<BuiltinAction> {
        find_binding(self.context(context), key).or_else(|| find_binding(&self.universal, key))
    }

    /// `(label, bindings)` groups for the help overlay, universal first.
    pub fn all_for_context(&self, context: ViewContext) -> Vec<(&'static str, &[Keybinding])> {
        vec![
            ("Universal", self.universal.as_slice()),
            (context.label(), self.context(context)),
        ]
    }

    /// First key bound to `action`, for footer hints.
    pub fn key_for(&self, action: BuiltinAction, context: ViewContext) -> Option<&str> {
        self.context(context)
            .iter()
            .chain(&self.universal)
            .find(|b| BuiltinAction::from_name(&b.builtin) == Some(action))
            .map(|b| b.key.as_str())
    }
}

fn merge_lists(defaults: &[Keybinding], overrides: &[Keybinding]) -> Vec<Keybinding> {
    let overridden: HashSet<&str> = overrides.iter().map(|b| b.key.as_str()).collect();
    defaults
        .iter()
        .filter(|b| !overridden.contains(b.key.as_str()))
        .chain(overrides)
        .cloned()
        .collect()
}

fn find_binding(bindings: &[Keybinding], key: &str) -> Option<BuiltinAction> {
    bindings
        .iter()
        .filter(|b| b.key == key)
        .find_map(|b| {
            let action = BuiltinAction::from_name(&b.builtin);
            if action.is_none() {
                tracing::warn!(key, builtin = %b.builtin, "unknown builtin action in keybinding");
            }
            action
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_event_to_string_ctrl_and_space() {
        assert_eq!(
            key_event_to_string(KeyCode::Char('D'), KeyModifiers::CONTROL, KeyEventKind::Press),
            Some("ctrl+d".to_owned())
        );
        assert_eq!(
            key_event_to_string(KeyCode::Char(' '), KeyModifiers::empty(), KeyEventKind::Press),
            Some("space".to_owned())
        );
        assert_eq!(
            key_event_to_string(KeyCode::BackTab, KeyModifiers::SHIFT, KeyEventKind::Press),
            Some("backtab".to_owned())
        );
    }

    #[test]
    fn key_release_is_ignored() {
        assert_eq!(
            key_event_to_string(KeyCode::Char('j'), KeyModifiers::empty(), KeyEventKind::Release),
            None
        );
    }

    #[test]
    fn sort_column_names_parse() {
        assert_eq!(
            BuiltinAction::from_name("sort_column_3"),
            Some(BuiltinAction::SortColumn(3))
        );
        assert_eq!(BuiltinAction::from_name("sort_column_0"), None);
        assert_eq!(BuiltinAction::from_name("sort_column_x"), None);
    }

    #[test]
    fn merge_override_replaces_default() {
        let merged = merge_lists(
            &[kb("d", "delete", "Delete"), kb("e", "edit", "Edit")],
            &[kb("d", "details", "Details")],
        );
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|b| b.key == "e" && b.builtin == "edit"));
        assert!(merged.iter().any(|b| b.key == "d" && b.builtin == "details"));
    }

    #[test]
    fn context_binding_shadows_universal() {
        let merged = MergedBindings::default();
        // 'n' means next month in the calendar, create in reports.
        assert_eq!(
            merged.resolve("n", ViewContext::Calendar),
            Some(BuiltinAction::NextMonth)
        );
        assert_eq!(merged.resolve("n", ViewContext::Reports), Some(BuiltinAction::Create));
        assert_eq!(merged.resolve("h", ViewContext::Users), Some(BuiltinAction::PrevPage));
        assert_eq!(
            merged.resolve("h", ViewContext::Calendar),
            Some(BuiltinAction::CursorLeft)
        );
    }

    #[test]
    fn key_for_finds_context_key() {
        let merged = MergedBindings::default();
        assert_eq!(
            merged.key_for(BuiltinAction::Delete, ViewContext::Products),
            Some("d")
        );
        assert_eq!(merged.key_for(BuiltinAction::Quit, ViewContext::Users), Some("q"));
    }
}
