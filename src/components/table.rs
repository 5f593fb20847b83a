use iocraft::prelude::*;

use crate::color::{Color as AppColor, ColorDepth};
use crate::controller::{CompareKind, Schema, SortSpec};
use crate::util::truncate_to_width;

// ---------------------------------------------------------------------------
// Column definition
// ---------------------------------------------------------------------------

/// Defines a column in the table.
#[derive(Debug, Clone)]
pub struct Column {
    /// Schema field id (e.g., "login", "calories").
    pub id: &'static str,
    /// Display header text.
    pub header: String,
    /// Width as a fraction of total width (0.0..1.0).
    pub width_pct: f32,
    pub align: TextAlign,
}

/// Build table columns from a schema, in schema order.
///
/// `widths` maps field ids to width fractions; unlisted fields share what is
/// left. Numeric columns are right-aligned.
pub fn columns_from_schema<R>(schema: &Schema<R>, widths: &[(&str, f32)]) -> Vec<Column> {
    let listed: f32 = widths.iter().map(|(_, w)| w).sum();
    let unlisted = schema
        .iter()
        .filter(|f| !widths.iter().any(|(id, _)| *id == f.id))
        .count();
    #[allow(clippy::cast_precision_loss)]
    let share = if unlisted == 0 {
        0.0
    } else {
        (1.0 - listed).max(0.05) / unlisted as f32
    };

    schema
        .iter()
        .map(|f| Column {
            id: f.id,
            header: f.label.to_owned(),
            width_pct: widths
                .iter()
                .find(|(id, _)| *id == f.id)
                .map_or(share, |(_, w)| *w),
            align: if f.kind == CompareKind::Numeric {
                TextAlign::Right
            } else {
                TextAlign::Left
            },
        })
        .collect()
}

/// A single cell value to display.
#[derive(Debug, Clone)]
pub struct Cell {
    pub text: String,
    pub color: Option<AppColor>,
    pub bold: bool,
}

impl Cell {
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

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            bold: true,
        }
    }
}

/// A complete row of cells, one per column in column order.
pub type Row = Vec<Cell>;

// ---------------------------------------------------------------------------
// Pre-rendered table data (all owned)
// ---------------------------------------------------------------------------

/// Pre-render table data into fully owned structures that can be passed
/// into the `element!` macro without lifetime issues.
pub struct RenderedTable {
    pub header_cells: Vec<HeaderCell>,
    pub body_rows: Vec<RenderedRow>,
    pub total_width: u32,
    pub header_fg: Color,
    pub border_fg: Color,
    pub empty_fg: Color,
    /// Message to display when there are no rows.
    pub empty_message: Option<String>,
}

pub struct HeaderCell {
    pub text: String,
    pub width: u32,
    pub align: TextAlign,
}

pub struct RenderedRow {
    pub key: usize,
    pub bg: Option<Color>,
    pub cells: Vec<RenderedCell>,
}

pub struct RenderedCell {
    pub text: String,
    pub fg: Color,
    pub weight: Weight,
    pub width: u32,
    pub align: TextAlign,
}

/// Configuration for building a `RenderedTable`.
pub struct TableBuildConfig<'a> {
    pub columns: &'a [Column],
    pub rows: &'a [Row],
    /// Row index within `rows` that is highlighted.
    pub cursor: Option<usize>,
    /// Current sort, shown as an arrow on the sorted column header.
    pub sort: Option<&'a SortSpec>,
    pub total_width: u16,
    pub depth: ColorDepth,
    pub selected_bg: Option<AppColor>,
    pub header_color: Option<AppColor>,
    pub border_color: Option<AppColor>,
    pub faint_color: Option<AppColor>,
    /// Message to show when rows are empty.
    pub empty_message: Option<&'a str>,
}

impl RenderedTable {
    pub fn build(cfg: &TableBuildConfig<'_>) -> Self {
        let depth = cfg.depth;
        let widths = compute_column_widths(cfg.columns, cfg.total_width);

        let header_fg = cfg
            .header_color
            .map_or(Color::White, |c| c.to_crossterm_color(depth));
        let border_fg = cfg
            .border_color
            .map_or(Color::DarkGrey, |c| c.to_crossterm_color(depth));
        let empty_fg = cfg
            .faint_color
            .map_or(Color::DarkGrey, |c| c.to_crossterm_color(depth));
        let selected_bg = cfg.selected_bg.map(|c| c.to_crossterm_color(depth));

        let header_cells = cfg
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, &w)| {
                let indicator = cfg
                    .sort
                    .filter(|s| s.field == col.id)
                    .map_or("", |s| s.direction.indicator());
                HeaderCell {
                    text: fit_cell(&format!("{}{indicator}", col.header), w),
                    width: u32::from(w),
                    align: col.align,
                }
            })
            .collect();

        let body_rows = cfg
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let bg = if cfg.cursor == Some(i) {
                    selected_bg
                } else {
                    None
                };
                let cells = cfg
                    .columns
                    .iter()
                    .zip(&widths)
                    .enumerate()
                    .map(|(ci, (col, &w))| {
                        let cell = row.get(ci);
                        RenderedCell {
                            text: cell.map_or_else(String::new, |c| fit_cell(&c.text, w)),
                            fg: cell
                                .and_then(|c| c.color)
                                .map_or(Color::Reset, |c| c.to_crossterm_color(depth)),
                            weight: if cell.is_some_and(|c| c.bold) {
                                Weight::Bold
                            } else {
                                Weight::Normal
                            },
                            width: u32::from(w),
                            align: col.align,
                        }
                    })
                    .collect();
                RenderedRow { key: i, bg, cells }
            })
            .collect();

        let empty_message = if cfg.rows.is_empty() {
            cfg.empty_message.map(String::from)
        } else {
            None
        };

        Self {
            header_cells,
            body_rows,
            total_width: u32::from(cfg.total_width),
            header_fg,
            border_fg,
            empty_fg,
            empty_message,
        }
    }
}

/// Truncate to the column width minus one column of gutter.
fn fit_cell(text: &str, width: u16) -> String {
    truncate_to_width(text, usize::from(width.saturating_sub(1)))
}

// ---------------------------------------------------------------------------
// ScrollableTable component
// ---------------------------------------------------------------------------

#[derive(Default, Props)]
pub struct ScrollableTableProps {
    /// Pre-rendered table data.
    pub table: Option<RenderedTable>,
}

#[component]
pub fn ScrollableTable(props: &mut ScrollableTableProps) -> impl Into<AnyElement<'static>> {
    let Some(table) = props.table.take() else {
        return element! { View }.into_any();
    };

    element! {
        View(flex_direction: FlexDirection::Column, width: table.total_width) {
            // Header row
            View(
                border_style: BorderStyle::Single,
                border_edges: Edges::Bottom,
                border_color: table.border_fg,
            ) {
                #(table.header_cells.into_iter().enumerate().map(|(i, hc)| {
                    element! {
                        View(key: i, width: hc.width) {
                            Text(
                                content: hc.text,
                                weight: Weight::Bold,
                                color: table.header_fg,
                                wrap: TextWrap::NoWrap,
                                align: hc.align,
                            )
                        }
                    }
                }))
            }

            // Empty-state message or body rows
            #(table.empty_message.into_iter().map(|msg| {
                element! {
                    View(padding_top: 1, padding_left: 2) {
                        Text(content: msg, color: table.empty_fg)
                    }
                }
            }))
            #(table.body_rows.into_iter().map(|row| {
                element! {
                    View(key: row.key, background_color: row.bg) {
                        #(row.cells.into_iter().enumerate().map(|(ci, cell)| {
                            element! {
                                View(key: ci, width: cell.width) {
                                    Text(
                                        content: cell.text,
                                        color: cell.fg,
                                        weight: cell.weight,
                                        wrap: TextWrap::NoWrap,
                                        align: cell.align,
                                    )
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
// Column width computation
// ---------------------------------------------------------------------------

/// Split `total` columns between `columns` in proportion to their
/// `width_pct`. The last column absorbs rounding so the widths sum to
/// `total`.
pub fn compute_column_widths(columns: &[Column], total: u16) -> Vec<u16> {
    if columns.is_empty() {
        return Vec::new();
    }
    let pct_sum: f32 = columns.iter().map(|c| c.width_pct.max(0.0)).sum();

    let mut widths: Vec<u16> = columns
        .iter()
        .map(|col| {
            let ratio = if pct_sum > 0.0 {
                col.width_pct.max(0.0) / pct_sum
            } else {
                #[allow(clippy::cast_precision_loss)]
                {
                    1.0 / columns.len() as f32
                }
            };
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let w = (f32::from(total) * ratio).floor() as u16;
            w
        })
        .collect();

    let used: u16 = widths.iter().sum();
    if let Some(last) = widths.last_mut() {
        *last += total.saturating_sub(used);
    }
    widths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SortDirection;
    use crate::types::UserSummary;

    fn make_columns() -> Vec<Column> {
        vec![
            Column {
                id: "login",
                header: "Login".to_owned(),
                width_pct: 0.2,
                align: TextAlign::Left,
            },
            Column {
                id: "email",
                header: "Email".to_owned(),
                width_pct: 0.5,
                align: TextAlign::Left,
            },
            Column {
                id: "streak",
                header: "Streak".to_owned(),
                width_pct: 0.3,
                align: TextAlign::Right,
            },
        ]
    }

    #[test]
    fn column_widths_sum_to_total() {
        let widths = compute_column_widths(&make_columns(), 101);
        assert_eq!(widths.iter().sum::<u16>(), 101);
        assert!(widths[1] > widths[0], "email should be wider than login");
    }

    #[test]
    fn zero_percentages_split_evenly() {
        let mut cols = make_columns();
        for c in &mut cols {
            c.width_pct = 0.0;
        }
        let widths = compute_column_widths(&cols, 30);
        assert_eq!(widths, vec![10, 10, 10]);
    }

    #[test]
    fn schema_columns_share_the_remainder() {
        let schema = UserSummary::schema();
        let cols = columns_from_schema(&schema, &[("email", 0.4)]);
        assert_eq!(cols.len(), schema.len());
        let email = cols.iter().find(|c| c.id == "email").expect("email column");
        assert!((email.width_pct - 0.4).abs() < f32::EPSILON);
        let others: f32 = cols.iter().filter(|c| c.id != "email").map(|c| c.width_pct).sum();
        assert!((others - 0.6).abs() < 1e-4);
    }

    #[test]
    fn sorted_header_carries_indicator() {
        let cols = make_columns();
        let sort = SortSpec::new("streak", SortDirection::Descending);
        let rows = vec![vec![
            Cell::plain("alice"),
            Cell::plain("a@example.com"),
            Cell::plain("5"),
        ]];
        let table = RenderedTable::build(&TableBuildConfig {
            columns: &cols,
            rows: &rows,
            cursor: Some(0),
            sort: Some(&sort),
            total_width: 60,
            depth: ColorDepth::TrueColor,
            selected_bg: Some(AppColor::Ansi(237)),
            header_color: None,
            border_color: None,
            faint_color: None,
            empty_message: Some("nothing"),
        });
        assert_eq!(table.header_cells[2].text, "Streak ▼");
        assert_eq!(table.header_cells[0].text, "Login");
        assert!(table.body_rows[0].bg.is_some());
        assert!(table.empty_message.is_none());
    }

    #[test]
    fn long_cells_are_truncated_to_column() {
        let cols = make_columns();
        let rows = vec![vec![
            Cell::plain("a-very-long-login-name"),
            Cell::plain(""),
            Cell::plain("1"),
        ]];
        let table = RenderedTable::build(&TableBuildConfig {
            columns: &cols,
            rows: &rows,
            cursor: None,
            sort: None,
            total_width: 40,
            depth: ColorDepth::TrueColor,
            selected_bg: None,
            header_color: None,
            border_color: None,
            faint_color: None,
            empty_message: None,
        });
        let login = &table.body_rows[0].cells[0];
        assert!(unicode_width::UnicodeWidthStr::width(login.text.as_str()) < 8);
    }
}
