use std::collections::HashMap;

use iocraft::prelude::*;

use crate::color::{Color as AppColor, ColorDepth};
use crate::config::keybindings::{BuiltinAction, Keybinding, MergedBindings, ViewContext};

// ---------------------------------------------------------------------------
// Help overlay
// ---------------------------------------------------------------------------

/// Pre-rendered help overlay data (owned, 'static-safe).
pub struct RenderedHelpOverlay {
    pub groups: Vec<HelpGroup>,
    pub title_fg: Color,
    pub key_fg: Color,
    pub desc_fg: Color,
    pub border_fg: Color,
}

/// A group of keybindings under a section header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpGroup {
    pub title: String,
    pub rows: Vec<HelpRow>,
}

/// One action and every key bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpRow {
    pub key: String,
    pub description: String,
}

/// Configuration for building a help overlay.
pub struct HelpOverlayBuildConfig<'a> {
    pub bindings: &'a MergedBindings,
    pub context: ViewContext,
    pub depth: ColorDepth,
    pub title_color: AppColor,
    pub key_color: AppColor,
    pub desc_color: AppColor,
    pub border_color: AppColor,
}

impl RenderedHelpOverlay {
    /// Build the help overlay for a given view context.
    pub fn build(cfg: &HelpOverlayBuildConfig<'_>) -> Self {
        Self {
            groups: build_help_groups(cfg.bindings, cfg.context),
            title_fg: cfg.title_color.to_crossterm_color(cfg.depth),
            key_fg: cfg.key_color.to_crossterm_color(cfg.depth),
            desc_fg: cfg.desc_color.to_crossterm_color(cfg.depth),
            border_fg: cfg.border_color.to_crossterm_color(cfg.depth),
        }
    }
}

/// Group bindings by section, folding keys that trigger the same action
/// into one row (`"j / ↓"`).
pub fn build_help_groups(bindings: &MergedBindings, context: ViewContext) -> Vec<HelpGroup> {
    let mut groups = Vec::new();

    for (label, keybindings) in bindings.all_for_context(context) {
        let mut rows: Vec<HelpRow> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for kb in keybindings {
            let desc = description_for_keybinding(kb);
            if let Some(&idx) = seen.get(&desc) {
                rows[idx].key = format!("{} / {}", rows[idx].key, format_key_display(&kb.key));
            } else {
                seen.insert(desc.clone(), rows.len());
                rows.push(HelpRow {
                    key: format_key_display(&kb.key),
                    description: desc,
                });
            }
        }

        if !rows.is_empty() {
            groups.push(HelpGroup {
                title: label.to_owned(),
                rows,
            });
        }
    }

    groups
}

/// Format a key string for display (capitalize special keys).
fn format_key_display(key: &str) -> String {
    match key {
        "space" => "Space".to_owned(),
        "enter" => "Enter".to_owned(),
        "esc" => "Esc".to_owned(),
        "delete" => "Delete".to_owned(),
        "backspace" => "Backspace".to_owned(),
        "pageup" => "PgUp".to_owned(),
        "pagedown" => "PgDn".to_owned(),
        "up" => "\u{2191}".to_owned(),
        "down" => "\u{2193}".to_owned(),
        "left" => "\u{2190}".to_owned(),
        "right" => "\u{2192}".to_owned(),
        "home" => "Home".to_owned(),
        "end" => "End".to_owned(),
        "tab" => "Tab".to_owned(),
        "backtab" => "Shift+Tab".to_owned(),
        s if s.starts_with("ctrl+") => format!("Ctrl+{}", &s[5..]),
        s if s.starts_with("alt+") => format!("Alt+{}", &s[4..]),
        s => s.to_owned(),
    }
}

fn description_for_keybinding(kb: &Keybinding) -> String {
    if let Some(name) = &kb.name {
        return name.clone();
    }
    BuiltinAction::from_name(&kb.builtin)
        .map_or("(unbound)", BuiltinAction::description)
        .to_owned()
}

// ---------------------------------------------------------------------------
// HelpOverlay component
// ---------------------------------------------------------------------------

#[derive(Default, Props)]
pub struct HelpOverlayProps {
    pub overlay: Option<RenderedHelpOverlay>,
    pub width: u16,
    pub height: u16,
}

#[component]
pub fn HelpOverlay(props: &mut HelpOverlayProps) -> impl Into<AnyElement<'static>> {
    let Some(overlay) = props.overlay.take() else {
        return element! { View }.into_any();
    };

    let width = u32::from(props.width);
    let height = u32::from(props.height);

    // Centered, ~60% width, up to 80% height.
    let overlay_width = (width * 3 / 5).max(40).min(width.saturating_sub(4));
    let overlay_height = (height * 4 / 5).max(10).min(height.saturating_sub(2));
    let pad_left = (width.saturating_sub(overlay_width)) / 2;
    let pad_top = (height.saturating_sub(overlay_height)) / 2;

    let mut lines: Vec<(String, Color, Weight)> = Vec::new();
    lines.push(("Keybindings".to_owned(), overlay.title_fg, Weight::Bold));
    lines.push((String::new(), overlay.desc_fg, Weight::Normal));

    for group in &overlay.groups {
        lines.push((format!("  {}", group.title), overlay.title_fg, Weight::Bold));
        for row in &group.rows {
            let line = format!("    {:>14}  {}", row.key, row.description);
            lines.push((line, overlay.desc_fg, Weight::Normal));
        }
        lines.push((String::new(), overlay.desc_fg, Weight::Normal));
    }

    lines.push((
        "  Press ? or Esc to close".to_owned(),
        overlay.key_fg,
        Weight::Normal,
    ));

    let max_lines = overlay_height.saturating_sub(2) as usize;
    lines.truncate(max_lines);

    element! {
        View(
            width,
            height,
            position: Position::Absolute,
        ) {
            View(
                margin_left: pad_left,
                margin_top: pad_top,
                width: overlay_width,
                height: overlay_height,
                flex_direction: FlexDirection::Column,
                border_style: BorderStyle::Double,
                border_color: overlay.border_fg,
                background_color: Color::Reset,
                padding_left: 1,
                padding_right: 1,
                overflow: Overflow::Hidden,
            ) {
                #(lines.into_iter().map(|(text, color, weight)| {
                    element! {
                        Text(content: text, color, weight, wrap: TextWrap::NoWrap)
                    }
                }))
            }
        }
    }
    .into_any()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_for_the_same_action_share_a_row() {
        let groups = build_help_groups(&MergedBindings::default(), ViewContext::Users);
        let universal = &groups[0];
        assert_eq!(universal.title, "Universal");
        let down = universal
            .rows
            .iter()
            .find(|r| r.description == "Move cursor down")
            .expect("move down row");
        assert_eq!(down.key, "j / \u{2193}");
    }

    #[test]
    fn empty_context_group_is_omitted() {
        // The users view adds no bindings of its own by default.
        let groups = build_help_groups(&MergedBindings::default(), ViewContext::Users);
        assert_eq!(groups.len(), 1);
        let groups = build_help_groups(&MergedBindings::default(), ViewContext::Products);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].title, "Products");
    }

    #[test]
    fn special_keys_are_prettified() {
        assert_eq!(format_key_display("ctrl+c"), "Ctrl+c");
        assert_eq!(format_key_display("pagedown"), "PgDn");
        assert_eq!(format_key_display("G"), "G");
    }
}
