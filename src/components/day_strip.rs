use chrono::{Datelike, NaiveDate};
use iocraft::prelude::*;

use crate::color::ColorDepth;
use crate::controller::{DateRange, DayWindow};
use crate::theme::ResolvedTheme;
use crate::types::{MonthGrid, Nutrient, NutrientGoals};
use crate::util::format_number;

/// Terminal columns per day cell.
pub const CELL_WIDTH: u16 = 8;

/// Width of the row-label gutter left of the cells.
pub const LABEL_WIDTH: u16 = 6;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Index of the first (left-most) day shown for a scroll offset in columns.
pub fn first_visible(scroll_cols: usize) -> usize {
    scroll_cols / usize::from(CELL_WIDTH)
}

/// How many whole cells fit in `width` columns.
pub fn visible_cells(width: u16) -> usize {
    usize::from(width / CELL_WIDTH).max(1)
}

/// Largest useful scroll offset: the last day is flush with the right edge.
pub fn max_scroll(window: &DayWindow, width: u16) -> usize {
    window.len().saturating_sub(visible_cells(width)) * usize::from(CELL_WIDTH)
}

/// Apply a signed scroll step, clamped to the window.
pub fn scroll_by(scroll_cols: usize, step: i32, window: &DayWindow, width: u16) -> usize {
    let max = max_scroll(window, width);
    let moved = if step < 0 {
        scroll_cols.saturating_sub(step.unsigned_abs() as usize)
    } else {
        scroll_cols + step.unsigned_abs() as usize
    };
    moved.min(max)
}

/// Scroll offset that brings `day` into view, changing as little as possible.
pub fn scroll_to_show(scroll_cols: usize, day: NaiveDate, window: &DayWindow, width: u16) -> usize {
    let Some(index) = window.index_of(day) else {
        return scroll_cols;
    };
    let first = first_visible(scroll_cols);
    let cells = visible_cells(width);
    let cell = usize::from(CELL_WIDTH);
    let target = if index < first {
        index * cell
    } else if index >= first + cells {
        (index + 1 - cells) * cell
    } else {
        scroll_cols
    };
    target.min(max_scroll(window, width))
}

/// Hit-test: the day under `column`, counted from the strip's left edge
/// (after the label gutter).
pub fn day_at_column(window: &DayWindow, scroll_cols: usize, column: u16) -> Option<NaiveDate> {
    let index = first_visible(scroll_cols) + usize::from(column / CELL_WIDTH);
    window.day(index)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// One rendered cell.
pub struct StripCell {
    pub text: String,
    pub fg: Color,
    pub bg: Option<Color>,
    pub weight: Weight,
}

/// Pre-rendered strip: a date header row plus one row per nutrient.
pub struct RenderedDayStrip {
    pub rows: Vec<(String, Vec<StripCell>)>,
    pub label_fg: Color,
}

/// Inputs for `RenderedDayStrip::build`.
pub struct DayStripConfig<'a> {
    pub window: &'a DayWindow,
    /// Nutrient rows are drawn only when a grid is given.
    pub grid: Option<&'a MonthGrid>,
    pub selection: DateRange,
    pub cursor: Option<NaiveDate>,
    pub scroll_cols: usize,
    /// Columns available to the cells (gutter excluded).
    pub width: u16,
    pub goals: &'a NutrientGoals,
    pub zero_is_empty: bool,
    pub theme: &'a ResolvedTheme,
    pub depth: ColorDepth,
}

impl RenderedDayStrip {
    pub fn build(cfg: &DayStripConfig<'_>) -> Self {
        let depth = cfg.depth;
        let theme = cfg.theme;
        let first = first_visible(cfg.scroll_cols);
        let days: Vec<NaiveDate> = (first..first + visible_cells(cfg.width))
            .map_while(|i| cfg.window.day(i))
            .collect();

        let primary = theme.text_primary.to_crossterm_color(depth);
        let faint = theme.text_faint.to_crossterm_color(depth);
        let accent = theme.text_accent.to_crossterm_color(depth);
        let range_bg = theme.bg_range.to_crossterm_color(depth);

        let header = days
            .iter()
            .map(|&day| {
                let disabled = cfg.window.is_disabled(day);
                let is_cursor = cfg.cursor == Some(day);
                let in_range = cfg.selection.contains(day);
                let label = format!("{} {:02}", weekday_short(day), day.day());
                StripCell {
                    text: if is_cursor { format!("[{label}]") } else { format!(" {label} ") },
                    fg: if disabled {
                        faint
                    } else if is_cursor {
                        accent
                    } else {
                        primary
                    },
                    bg: in_range.then_some(range_bg),
                    weight: if is_cursor { Weight::Bold } else { Weight::Normal },
                }
            })
            .collect();

        let mut rows = vec![(String::new(), header)];
        if let Some(grid) = cfg.grid {
            let inverted = theme.text_inverted.to_crossterm_color(depth);
            for nutrient in Nutrient::ALL {
                let cells = days
                    .iter()
                    .map(|&day| {
                        let Some(d) = grid.get(day).filter(|d| d.has_data) else {
                            return StripCell {
                                text: if cfg.window.is_disabled(day) { "" } else { "\u{b7}" }
                                    .to_owned(),
                                fg: faint,
                                bg: None,
                                weight: Weight::Normal,
                            };
                        };
                        let level = d.level(nutrient, cfg.goals, cfg.zero_is_empty);
                        StripCell {
                            text: format_number(d.get(nutrient).round()),
                            fg: inverted,
                            bg: Some(theme.nutrient(level).to_crossterm_color(depth)),
                            weight: if d.goal_achieved { Weight::Bold } else { Weight::Normal },
                        }
                    })
                    .collect();
                rows.push((nutrient_short(nutrient).to_owned(), cells));
            }
        }

        Self {
            rows,
            label_fg: faint,
        }
    }
}

fn weekday_short(day: NaiveDate) -> &'static str {
    match day.weekday() {
        chrono::Weekday::Mon => "Mo",
        chrono::Weekday::Tue => "Tu",
        chrono::Weekday::Wed => "We",
        chrono::Weekday::Thu => "Th",
        chrono::Weekday::Fri => "Fr",
        chrono::Weekday::Sat => "Sa",
        chrono::Weekday::Sun => "Su",
    }
}

fn nutrient_short(nutrient: Nutrient) -> &'static str {
    match nutrient {
        Nutrient::Calories => "kcal",
        Nutrient::Proteins => "prot",
        Nutrient::Fats => "fat",
        Nutrient::Carbs => "carb",
    }
}

#[derive(Default, Props)]
pub struct DayStripProps {
    pub strip: Option<RenderedDayStrip>,
}

#[component]
pub fn DayStrip(props: &mut DayStripProps) -> impl Into<AnyElement<'static>> {
    let Some(strip) = props.strip.take() else {
        return element! { View }.into_any();
    };
    let label_fg = strip.label_fg;

    element! {
        View(flex_direction: FlexDirection::Column) {
            #(strip.rows.into_iter().enumerate().map(|(ri, (label, cells))| {
                element! {
                    View(key: ri) {
                        View(width: u32::from(LABEL_WIDTH)) {
                            Text(content: label, color: label_fg, wrap: TextWrap::NoWrap)
                        }
                        #(cells.into_iter().enumerate().map(|(ci, cell)| {
                            element! {
                                View(key: ci, width: u32::from(CELL_WIDTH), padding_right: 1) {
                                    View(
                                        width: u32::from(CELL_WIDTH - 1),
                                        background_color: cell.bg,
                                    ) {
                                        Text(
                                            content: cell.text,
                                            color: cell.fg,
                                            weight: cell.weight,
                                            wrap: TextWrap::NoWrap,
                                            align: TextAlign::Center,
                                        )
                                    }
                                }
                            }
                        }))
                    }
                }
            }))
        }
    }
    .into_any()
}

// ---------------------------------------------------------------------------
// Bar series
// ---------------------------------------------------------------------------

/// A horizontal bar for `value` against `goal`, `width` columns wide.
///
/// The scale tops out at the larger of the goal and `max_value`; the goal
/// position is marked with `│` when the bar does not reach it.
pub fn bar_line(value: f64, goal: f64, max_value: f64, width: usize) -> String {
    let scale = goal.max(max_value);
    if width == 0 || scale <= 0.0 {
        return " ".repeat(width);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let to_cols = |v: f64| ((v.max(0.0) / scale) * width as f64).round() as usize;
    let filled = to_cols(value).min(width);
    let goal_at = (goal > 0.0).then(|| to_cols(goal).clamp(1, width) - 1);

    (0..width)
        .map(|i| {
            if i < filled {
                '\u{2588}'
            } else if goal_at == Some(i) {
                '\u{2502}'
            } else {
                '\u{b7}'
            }
        })
        .collect()
}
