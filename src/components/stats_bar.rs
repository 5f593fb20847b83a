use iocraft::prelude::*;

use crate::color::{Color as AppColor, ColorDepth};

/// A row of `label value` pairs above a table.
pub struct RenderedStatsBar {
    pub items: Vec<(String, String)>,
    pub label_fg: Color,
    pub value_fg: Color,
}

impl RenderedStatsBar {
    pub fn build(
        items: Vec<(&str, String)>,
        depth: ColorDepth,
        label_color: AppColor,
        value_color: AppColor,
    ) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|(label, value)| (label.to_owned(), value))
                .collect(),
            label_fg: label_color.to_crossterm_color(depth),
            value_fg: value_color.to_crossterm_color(depth),
        }
    }
}

#[derive(Default, Props)]
pub struct StatsBarProps {
    pub stats: Option<RenderedStatsBar>,
}

#[component]
pub fn StatsBar(props: &mut StatsBarProps) -> impl Into<AnyElement<'static>> {
    let Some(stats) = props.stats.take() else {
        return element! { View }.into_any();
    };

    let mut contents = Vec::new();
    for (label, value) in stats.items {
        contents.push(MixedTextContent::new(format!("{label} ")).color(stats.label_fg));
        contents.push(
            MixedTextContent::new(format!("{value}   "))
                .color(stats.value_fg)
                .weight(Weight::Bold),
        );
    }

    element! {
        View(padding_left: 1, padding_right: 1) {
            MixedText(contents, wrap: TextWrap::NoWrap)
        }
    }
    .into_any()
}
