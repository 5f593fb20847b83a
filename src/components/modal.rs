use iocraft::prelude::*;

use crate::color::{Color as AppColor, ColorDepth};
use crate::util::truncate_to_width;

/// A styled line inside a modal.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalLine {
    pub text: String,
    pub color: Option<AppColor>,
    pub bold: bool,
}

impl ModalLine {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            bold: false,
        }
    }

    pub fn colored(text: impl Into<String>, color: AppColor) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
            bold: false,
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            bold: true,
        }
    }

    pub fn blank() -> Self {
        Self::plain("")
    }

    /// `"label:  value"` with the label padded to `label_width`.
    pub fn field(label: &str, value: impl AsRef<str>, label_width: usize) -> Self {
        Self::plain(format!("{label:<label_width$}  {}", value.as_ref()))
    }
}

/// A centered box drawn over the view: details, forms and confirmations.
pub struct RenderedModal {
    pub title: String,
    pub lines: Vec<(String, Color, Weight)>,
    pub hint: String,
    pub title_fg: Color,
    pub border_fg: Color,
    pub hint_fg: Color,
    pub width: u32,
    pub height: u32,
    pub pad_left: u32,
    pub pad_top: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

/// Colors a modal paints with.
pub struct ModalColors {
    pub text: AppColor,
    pub title: AppColor,
    pub border: AppColor,
    pub hint: AppColor,
}

impl RenderedModal {
    /// Lay out `lines` in a box of up to 70% of the screen. Lines past the
    /// box height are dropped starting at `scroll`.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        title: &str,
        lines: &[ModalLine],
        scroll: usize,
        hint: &str,
        screen: (u16, u16),
        depth: ColorDepth,
        colors: &ModalColors,
    ) -> Self {
        let screen_width = u32::from(screen.0);
        let screen_height = u32::from(screen.1);
        let width = (screen_width * 7 / 10).max(44).min(screen_width.saturating_sub(2));
        let max_height = (screen_height * 4 / 5).max(8).min(screen_height.saturating_sub(2));
        // Border (2) + hint line and its spacer (2).
        let body_rows = max_height.saturating_sub(4) as usize;
        let text_width = width.saturating_sub(4) as usize;

        let text_fg = colors.text.to_crossterm_color(depth);
        let rendered: Vec<(String, Color, Weight)> = lines
            .iter()
            .skip(scroll.min(lines.len().saturating_sub(1)))
            .take(body_rows)
            .map(|l| {
                (
                    truncate_to_width(&l.text, text_width),
                    l.color.map_or(text_fg, |c| c.to_crossterm_color(depth)),
                    if l.bold { Weight::Bold } else { Weight::Normal },
                )
            })
            .collect();

        #[allow(clippy::cast_possible_truncation)]
        let height = (rendered.len() as u32 + 4).min(max_height);

        Self {
            title: format!(" {title} "),
            lines: rendered,
            hint: hint.to_owned(),
            title_fg: colors.title.to_crossterm_color(depth),
            border_fg: colors.border.to_crossterm_color(depth),
            hint_fg: colors.hint.to_crossterm_color(depth),
            width,
            height,
            pad_left: screen_width.saturating_sub(width) / 2,
            pad_top: screen_height.saturating_sub(height) / 2,
            screen_width,
            screen_height,
        }
    }
}

#[derive(Default, Props)]
pub struct ModalProps {
    pub modal: Option<RenderedModal>,
}

#[component]
pub fn Modal(props: &mut ModalProps) -> impl Into<AnyElement<'static>> {
    let Some(m) = props.modal.take() else {
        return element! { View }.into_any();
    };

    element! {
        View(width: m.screen_width, height: m.screen_height, position: Position::Absolute) {
            View(
                margin_left: m.pad_left,
                margin_top: m.pad_top,
                width: m.width,
                height: m.height,
                flex_direction: FlexDirection::Column,
                border_style: BorderStyle::Round,
                border_color: m.border_fg,
                background_color: Color::Reset,
                padding_left: 1,
                padding_right: 1,
                overflow: Overflow::Hidden,
            ) {
                Text(content: m.title, color: m.title_fg, weight: Weight::Bold, wrap: TextWrap::NoWrap)
                View(flex_direction: FlexDirection::Column, flex_grow: 1.0) {
                    #(m.lines.into_iter().enumerate().map(|(i, (text, color, weight))| {
                        element! {
                            Text(key: i, content: text, color, weight, wrap: TextWrap::NoWrap)
                        }
                    }))
                }
                Text(content: m.hint, color: m.hint_fg, wrap: TextWrap::NoWrap)
            }
        }
    }
    .into_any()
}
