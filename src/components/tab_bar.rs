use iocraft::prelude::*;

use crate::app::ViewKind;
use crate::color::{Color as AppColor, ColorDepth};

// ---------------------------------------------------------------------------
// TabBar component
// ---------------------------------------------------------------------------

/// Pre-rendered tab data (all owned, no lifetime issues).
pub struct RenderedTabBar {
    pub tabs: Vec<RenderedTab>,
    pub title: String,
    pub active_bg: Color,
    pub active_fg: Color,
    pub inactive_fg: Color,
    pub border_fg: Color,
}

pub struct RenderedTab {
    pub label: String,
    pub is_active: bool,
}

impl RenderedTabBar {
    /// One tab per view; `count` is appended to the active tab's label.
    pub fn build(
        active: ViewKind,
        count: Option<usize>,
        depth: ColorDepth,
        active_color: AppColor,
        active_text_color: AppColor,
        inactive_color: AppColor,
        border_color: AppColor,
    ) -> Self {
        let tabs = ViewKind::ALL
            .iter()
            .map(|&view| {
                let is_active = view == active;
                let label = match count {
                    Some(n) if is_active => format!(" {} ({n}) ", view.label()),
                    _ => format!(" {} ", view.label()),
                };
                RenderedTab { label, is_active }
            })
            .collect();

        Self {
            tabs,
            title: " nutri-board ".to_owned(),
            active_bg: active_color.to_crossterm_color(depth),
            active_fg: active_text_color.to_crossterm_color(depth),
            inactive_fg: inactive_color.to_crossterm_color(depth),
            border_fg: border_color.to_crossterm_color(depth),
        }
    }
}

#[derive(Default, Props)]
pub struct TabBarProps {
    pub tab_bar: Option<RenderedTabBar>,
}

#[component]
pub fn TabBar(props: &mut TabBarProps) -> impl Into<AnyElement<'static>> {
    let Some(tb) = props.tab_bar.take() else {
        return element! { View }.into_any();
    };

    let active_bg = tb.active_bg;
    let active_fg = tb.active_fg;
    let inactive_fg = tb.inactive_fg;

    element! {
        View(
            border_style: BorderStyle::Single,
            border_edges: Edges::Bottom,
            border_color: tb.border_fg,
            padding_left: 1,
        ) {
            View(padding_right: 2) {
                Text(content: tb.title, color: active_bg, weight: Weight::Bold, wrap: TextWrap::NoWrap)
            }
            #(tb.tabs.into_iter().enumerate().map(|(i, tab)| {
                let (fg, bg, weight) = if tab.is_active {
                    (active_fg, Some(active_bg), Weight::Bold)
                } else {
                    (inactive_fg, None, Weight::Normal)
                };

                element! {
                    View(key: i, padding_right: 1, background_color: bg.unwrap_or(Color::Reset)) {
                        Text(content: tab.label, color: fg, weight, wrap: TextWrap::NoWrap)
                    }
                }
            }))
        }
    }
    .into_any()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_only_on_active_tab() {
        let tb = RenderedTabBar::build(
            ViewKind::Products,
            Some(42),
            ColorDepth::TrueColor,
            AppColor::Ansi(14),
            AppColor::Ansi(0),
            AppColor::Ansi(8),
            AppColor::Ansi(8),
        );
        let labels: Vec<&str> = tb.tabs.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, [" Users ", " Products (42) ", " Meals ", " Reports ", " Calendar "]);
        assert!(tb.tabs[1].is_active);
    }
}
