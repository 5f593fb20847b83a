use iocraft::prelude::*;

use crate::color::{Color as AppColor, ColorDepth};
use crate::controller::{PageItem, PaginationModel};

/// Pre-rendered pagination bar: `‹ 1 … 4 [5] 6 … 10 ›  41–50 of 100 · 10/page`.
pub struct RenderedPaginationBar {
    pub segments: Vec<(String, Color, Weight)>,
    pub summary: String,
    pub summary_fg: Color,
}

/// Colors the pagination bar paints with.
pub struct PaginationColors {
    pub current: AppColor,
    pub page: AppColor,
    pub disabled: AppColor,
}

impl RenderedPaginationBar {
    pub fn build(
        model: &PaginationModel,
        shown: (usize, usize),
        total_count: usize,
        page_size: usize,
        depth: ColorDepth,
        colors: &PaginationColors,
    ) -> Self {
        let current = colors.current.to_crossterm_color(depth);
        let page = colors.page.to_crossterm_color(depth);
        let disabled = colors.disabled.to_crossterm_color(depth);

        let arrow = |text: &str, enabled: bool| {
            (
                text.to_owned(),
                if enabled { page } else { disabled },
                Weight::Normal,
            )
        };

        let mut segments = vec![arrow("\u{2039} ", model.prev_enabled)];
        for item in &model.items {
            segments.push(match *item {
                PageItem::Page(n) if n == model.page => (format!("[{n}] "), current, Weight::Bold),
                PageItem::Page(n) => (format!("{n} "), page, Weight::Normal),
                PageItem::Ellipsis => ("\u{2026} ".to_owned(), disabled, Weight::Normal),
            });
        }
        segments.push(arrow("\u{203a}", model.next_enabled));

        Self {
            segments,
            summary: summary_text(shown, total_count, page_size),
            summary_fg: disabled,
        }
    }
}

/// `"41–50 of 100 · 10/page"`, or `"0 of 0"` when nothing is shown.
pub fn summary_text(shown: (usize, usize), total_count: usize, page_size: usize) -> String {
    let (start, end) = shown;
    if start == 0 {
        format!("0 of {total_count} \u{b7} {page_size}/page")
    } else {
        format!("{start}\u{2013}{end} of {total_count} \u{b7} {page_size}/page")
    }
}

#[derive(Default, Props)]
pub struct PaginationBarProps {
    pub bar: Option<RenderedPaginationBar>,
}

#[component]
pub fn PaginationBar(props: &mut PaginationBarProps) -> impl Into<AnyElement<'static>> {
    let Some(bar) = props.bar.take() else {
        return element! { View }.into_any();
    };

    let contents: Vec<MixedTextContent> = bar
        .segments
        .into_iter()
        .map(|(text, color, weight)| MixedTextContent::new(text).color(color).weight(weight))
        .collect();

    element! {
        View(padding_left: 1, padding_right: 1) {
            View(flex_grow: 1.0) {
                MixedText(contents, wrap: TextWrap::NoWrap)
            }
            Text(content: bar.summary, color: bar.summary_fg, wrap: TextWrap::NoWrap)
        }
    }
    .into_any()
}
