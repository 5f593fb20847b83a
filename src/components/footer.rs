use std::time::Instant;

use iocraft::prelude::*;

use crate::color::{Color as AppColor, ColorDepth};

// ---------------------------------------------------------------------------
// Status message
// ---------------------------------------------------------------------------

/// Severity of a one-line status message ("toast").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// A one-line message shown in the footer until the next one replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Footer component
// ---------------------------------------------------------------------------

pub struct RenderedFooter {
    pub context_text: String,
    pub updated_text: String,
    pub status: Option<(String, Color)>,
    pub help_hint: String,
    pub text_fg: Color,
    pub border_fg: Color,
}

/// Colors the footer paints with.
pub struct FooterColors {
    pub text: AppColor,
    pub border: AppColor,
    pub info: AppColor,
    pub success: AppColor,
    pub error: AppColor,
}

impl RenderedFooter {
    pub fn build(
        context_text: String,
        updated_text: String,
        status: Option<&StatusMessage>,
        depth: ColorDepth,
        colors: &FooterColors,
    ) -> Self {
        let status = status.map(|s| {
            let color = match s.kind {
                StatusKind::Info => colors.info,
                StatusKind::Success => colors.success,
                StatusKind::Error => colors.error,
            };
            (s.text.clone(), color.to_crossterm_color(depth))
        });
        Self {
            context_text,
            updated_text,
            status,
            help_hint: "? help".to_owned(),
            text_fg: colors.text.to_crossterm_color(depth),
            border_fg: colors.border.to_crossterm_color(depth),
        }
    }
}

/// Format a last-fetch instant as a human-readable "Updated ~Xs ago" string.
pub fn format_updated_ago(last_fetch: Option<Instant>) -> String {
    let Some(t) = last_fetch else {
        return String::new();
    };
    let elapsed = t.elapsed().as_secs();
    if elapsed < 60 {
        format!("Updated ~{elapsed}s ago")
    } else if elapsed < 3600 {
        format!("Updated ~{}m ago", elapsed / 60)
    } else {
        format!("Updated ~{}h ago", elapsed / 3600)
    }
}

#[derive(Default, Props)]
pub struct FooterProps {
    pub footer: Option<RenderedFooter>,
}

#[component]
pub fn Footer(props: &mut FooterProps) -> impl Into<AnyElement<'static>> {
    let Some(f) = props.footer.take() else {
        return element! { View }.into_any();
    };

    let mut contents = Vec::new();
    for (text, fg) in [
        Some((f.context_text.as_str(), f.text_fg)),
        Some((f.updated_text.as_str(), f.text_fg)),
        f.status.as_ref().map(|(t, c)| (t.as_str(), *c)),
    ]
    .into_iter()
    .flatten()
    .filter(|(text, _)| !text.is_empty())
    {
        if !contents.is_empty() {
            contents.push(MixedTextContent::new("  \u{2022}  ").color(f.text_fg));
        }
        contents.push(MixedTextContent::new(text).color(fg));
    }

    element! {
        View(
            border_style: BorderStyle::Single,
            border_edges: Edges::Top,
            border_color: f.border_fg,
            padding_left: 1,
            padding_right: 1,
        ) {
            View(flex_grow: 1.0) {
                MixedText(contents, wrap: TextWrap::NoWrap)
            }
            Text(content: " \u{2502} ", color: f.text_fg, wrap: TextWrap::NoWrap)
            Text(content: f.help_hint, color: f.text_fg, wrap: TextWrap::NoWrap)
        }
    }
    .into_any()
}
