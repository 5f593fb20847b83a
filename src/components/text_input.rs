use iocraft::prelude::*;

use crate::color::{Color as AppColor, ColorDepth};

// ---------------------------------------------------------------------------
// Pre-rendered text input
// ---------------------------------------------------------------------------

/// A one-line prompt under the table: search input or a y/n question.
pub struct RenderedTextInput {
    pub prompt: String,
    pub text: String,
    pub text_fg: Color,
    pub prompt_fg: Color,
    pub border_fg: Color,
}

impl RenderedTextInput {
    /// An editable input; a block cursor is drawn after `text`.
    pub fn build(
        prompt: &str,
        text: &str,
        depth: ColorDepth,
        text_color: AppColor,
        prompt_color: AppColor,
        border_color: AppColor,
    ) -> Self {
        Self {
            prompt: prompt.to_owned(),
            text: format!("{text}\u{2588}"),
            text_fg: text_color.to_crossterm_color(depth),
            prompt_fg: prompt_color.to_crossterm_color(depth),
            border_fg: border_color.to_crossterm_color(depth),
        }
    }

    /// A question without an editable text part.
    pub fn question(
        prompt: &str,
        depth: ColorDepth,
        prompt_color: AppColor,
        border_color: AppColor,
    ) -> Self {
        let prompt_fg = prompt_color.to_crossterm_color(depth);
        Self {
            prompt: prompt.to_owned(),
            text: String::new(),
            text_fg: prompt_fg,
            prompt_fg,
            border_fg: border_color.to_crossterm_color(depth),
        }
    }
}

// ---------------------------------------------------------------------------
// Line editing
// ---------------------------------------------------------------------------

/// Apply a key to a single-line buffer. Returns true when the buffer changed.
pub fn edit_line(buffer: &mut String, code: KeyCode, modifiers: KeyModifiers) -> bool {
    match code {
        KeyCode::Backspace => buffer.pop().is_some(),
        KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => {
            let changed = !buffer.is_empty();
            buffer.clear();
            changed
        }
        KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
            buffer.push(ch);
            true
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// TextInput component
// ---------------------------------------------------------------------------

#[derive(Default, Props)]
pub struct TextInputProps {
    pub input: Option<RenderedTextInput>,
}

#[component]
pub fn TextInput(props: &mut TextInputProps) -> impl Into<AnyElement<'static>> {
    let Some(input) = props.input.take() else {
        return element! { View }.into_any();
    };

    element! {
        View(
            border_style: BorderStyle::Single,
            border_edges: Edges::Top,
            border_color: input.border_fg,
            padding_left: 1,
            padding_right: 1,
        ) {
            Text(content: input.prompt, color: input.prompt_fg, wrap: TextWrap::NoWrap)
            Text(content: " ", color: input.text_fg)
            Text(content: input.text, color: input.text_fg, wrap: TextWrap::NoWrap)
        }
    }
    .into_any()
}
