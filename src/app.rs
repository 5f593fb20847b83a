use iocraft::prelude::*;

use crate::color::ColorDepth;
use crate::config::keybindings::MergedBindings;
use crate::config::types::{AppConfig, View as ConfigView};
use crate::engine::EngineHandle;
use crate::theme::ResolvedTheme;
use crate::views::calendar::CalendarView;
use crate::views::meals::MealsView;
use crate::views::products::ProductsView;
use crate::views::reports::ReportsView;
use crate::views::users::UsersView;

// ---------------------------------------------------------------------------
// View kind enum (public for the tab bar)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Users,
    Products,
    Meals,
    Reports,
    Calendar,
}

impl ViewKind {
    pub const ALL: [ViewKind; 5] = [
        ViewKind::Users,
        ViewKind::Products,
        ViewKind::Meals,
        ViewKind::Reports,
        ViewKind::Calendar,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::Products => "Products",
            Self::Meals => "Meals",
            Self::Reports => "Reports",
            Self::Calendar => "Calendar",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Users => Self::Products,
            Self::Products => Self::Meals,
            Self::Meals => Self::Reports,
            Self::Reports => Self::Calendar,
            Self::Calendar => Self::Users,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Users => Self::Calendar,
            Self::Products => Self::Users,
            Self::Meals => Self::Products,
            Self::Reports => Self::Meals,
            Self::Calendar => Self::Reports,
        }
    }
}

impl From<ConfigView> for ViewKind {
    fn from(view: ConfigView) -> Self {
        match view {
            ConfigView::Users => Self::Users,
            ConfigView::Products => Self::Products,
            ConfigView::Meals => Self::Meals,
            ConfigView::Reports => Self::Reports,
            ConfigView::Calendar => Self::Calendar,
        }
    }
}

// ---------------------------------------------------------------------------
// Root App component
// ---------------------------------------------------------------------------

#[derive(Default, Props)]
pub struct AppProps<'a> {
    pub config: Option<&'a AppConfig>,
    pub engine: Option<&'a EngineHandle>,
    pub theme: Option<&'a ResolvedTheme>,
    pub keybindings: Option<&'a MergedBindings>,
    pub color_depth: ColorDepth,
    /// Overrides `defaults.view` from the config.
    pub initial_view: Option<ViewKind>,
}

#[component]
pub fn App<'a>(props: &AppProps<'a>, mut hooks: Hooks) -> impl Into<AnyElement<'a>> {
    let (width, height) = hooks.use_terminal_size();
    let mut system = hooks.use_context_mut::<SystemContext>();
    let should_exit = hooks.use_state(|| false);

    let config = props.config;
    let engine = props.engine;
    let theme = props.theme;
    let keybindings = props.keybindings;
    let depth = props.color_depth;

    let initial_view = props
        .initial_view
        .unwrap_or_else(|| config.map_or(ViewKind::Users, |c| c.defaults.view.into()));
    let mut active_view = hooks.use_state(move || initial_view);

    // Set by a child view to cycle forward.
    let mut switch_signal = hooks.use_state(|| false);
    if switch_signal.get() {
        switch_signal.set(false);
        active_view.set(active_view.get().next());
    }

    let mut switch_back_signal = hooks.use_state(|| false);
    if switch_back_signal.get() {
        switch_back_signal.set(false);
        active_view.set(active_view.get().prev());
    }

    if should_exit.get() {
        system.exit();
    }

    let date_format = config.map(|c| c.defaults.date_format.as_str());
    let search_debounce_ms = config.map_or(200, |c| c.defaults.search_debounce_ms);
    let download_dir = config.and_then(|c| c.defaults.download_dir.as_deref());

    // Every view stays in the tree so its state survives switching.
    let active = active_view.get();
    let display = |kind: ViewKind| if active == kind { Display::Flex } else { Display::None };

    element! {
        View(width: u32::from(width), height: u32::from(height), flex_direction: FlexDirection::Column) {
            View(display: display(ViewKind::Users), flex_grow: 1.0) {
                UsersView(
                    config: config.map(|c| &c.users),
                    engine,
                    theme,
                    keybindings,
                    color_depth: depth,
                    width,
                    height,
                    search_debounce_ms,
                    date_format,
                    should_exit,
                    switch_view: switch_signal,
                    switch_view_back: switch_back_signal,
                    is_active: active == ViewKind::Users,
                )
            }
            View(display: display(ViewKind::Products), flex_grow: 1.0) {
                ProductsView(
                    config: config.map(|c| &c.products),
                    engine,
                    theme,
                    keybindings,
                    color_depth: depth,
                    width,
                    height,
                    search_debounce_ms,
                    date_format,
                    should_exit,
                    switch_view: switch_signal,
                    switch_view_back: switch_back_signal,
                    is_active: active == ViewKind::Products,
                )
            }
            View(display: display(ViewKind::Meals), flex_grow: 1.0) {
                MealsView(
                    config: config.map(|c| &c.meals),
                    engine,
                    theme,
                    keybindings,
                    color_depth: depth,
                    width,
                    height,
                    search_debounce_ms,
                    should_exit,
                    switch_view: switch_signal,
                    switch_view_back: switch_back_signal,
                    is_active: active == ViewKind::Meals,
                )
            }
            View(display: display(ViewKind::Reports), flex_grow: 1.0) {
                ReportsView(
                    config: config.map(|c| &c.reports),
                    engine,
                    theme,
                    keybindings,
                    color_depth: depth,
                    width,
                    height,
                    search_debounce_ms,
                    date_format,
                    download_dir,
                    should_exit,
                    switch_view: switch_signal,
                    switch_view_back: switch_back_signal,
                    is_active: active == ViewKind::Reports,
                )
            }
            View(display: display(ViewKind::Calendar), flex_grow: 1.0) {
                CalendarView(
                    config: config.map(|c| &c.calendar),
                    engine,
                    theme,
                    keybindings,
                    color_depth: depth,
                    width,
                    height,
                    should_exit,
                    switch_view: switch_signal,
                    switch_view_back: switch_back_signal,
                    is_active: active == ViewKind::Calendar,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_cycle_both_ways() {
        for kind in ViewKind::ALL {
            assert_eq!(kind.next().prev(), kind);
        }
        assert_eq!(ViewKind::Calendar.next(), ViewKind::Users);
        assert_eq!(ViewKind::Users.prev(), ViewKind::Calendar);
        assert_eq!(ViewKind::Products.next(), ViewKind::Meals);
    }
}
