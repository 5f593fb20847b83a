use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate, TimeDelta};
use crossterm::event::{MouseButton, MouseEventKind};
use iocraft::prelude::*;

use crate::app::ViewKind;
use crate::color::{Color as AppColor, ColorDepth};
use crate::components::day_strip::{self, DayStrip, DayStripConfig, RenderedDayStrip, bar_line};
use crate::components::footer::{self, Footer, RenderedFooter, StatusMessage};
use crate::components::help_overlay::HelpOverlay;
use crate::components::tab_bar::{RenderedTabBar, TabBar};
use crate::config::keybindings::{BuiltinAction, MergedBindings, ViewContext, key_event_to_string};
use crate::config::types::CalendarConfig;
use crate::controller::{AutoScroll, DateRange, DayWindow, RangeSelection};
use crate::engine::{EngineHandle, Event, FetchTarget, Request};
use crate::theme::ResolvedTheme;
use crate::types::{MonthGrid, Nutrient, RangeSummary};
use crate::util::{format_days, format_number};

use super::common;

/// Screen row of the strip's date header: tab bar (2) + month title (1).
const STRIP_TOP: u16 = 3;

/// Date header plus one row per nutrient.
const STRIP_ROWS: u16 = 5;

/// Screen column where the first day cell starts.
const STRIP_LEFT: u16 = 1 + day_strip::LABEL_WIDTH;

/// Drag auto-scroll cadence.
const AUTOSCROLL_TICK: Duration = Duration::from_millis(50);

fn strip_width(screen_width: u16) -> u16 {
    screen_width.saturating_sub(STRIP_LEFT + 1)
}

/// Column within the day cells for a click at `(column, row)`, if it landed
/// on the strip.
fn strip_hit(column: u16, row: u16, width: u16) -> Option<u16> {
    let on_rows = (STRIP_TOP..STRIP_TOP + STRIP_ROWS).contains(&row);
    let x = column.checked_sub(STRIP_LEFT)?;
    (on_rows && x < width).then_some(x)
}

/// `(year, month)` moved by `delta` months.
fn shift_month((year, month): (i32, u32), delta: i32) -> (i32, u32) {
    #[allow(clippy::cast_possible_wrap)]
    let index = year * 12 + month as i32 - 1 + delta;
    #[allow(clippy::cast_sign_loss)]
    let month = (index.rem_euclid(12) + 1) as u32;
    (index.div_euclid(12), month)
}

/// The month `delta` away from `current`, unless that lies after today's.
fn step_month(current: (i32, u32), delta: i32, today: NaiveDate) -> Option<(i32, u32)> {
    let target = shift_month(current, delta);
    (target <= (today.year(), today.month())).then_some(target)
}

fn month_window((year, month): (i32, u32), today: NaiveDate) -> DayWindow {
    DayWindow::month(year, month, today).unwrap_or_else(|| DayWindow::trailing(today, 30))
}

/// Selection a freshly shown month starts with.
fn initial_selection(window: &DayWindow, today: NaiveDate) -> RangeSelection {
    let end = today.min(window.last);
    let range = DateRange::trailing(end, 3);
    RangeSelection::new(DateRange::new(range.start.max(window.first), range.end))
}

fn month_title(window: &DayWindow) -> String {
    window.first.format("%B %Y").to_string()
}

/// Lines of the range panel: headline, per-nutrient rows, then one bar per
/// day for calories.
fn summary_lines(
    summary: &RangeSummary,
    theme: &ResolvedTheme,
    bar_width: usize,
) -> Vec<(String, AppColor)> {
    let range = summary.range;
    let mut lines = vec![
        (
            format!(
                "{} \u{2192} {}  {}   days with data: {}   goals met: {}",
                range.start.format("%Y-%m-%d"),
                range.end.format("%Y-%m-%d"),
                format_days(range.days()),
                summary.days_with_data,
                summary.goals_met,
            ),
            theme.text_primary,
        ),
        (String::new(), theme.text_faint),
    ];

    for n in &summary.nutrients {
        let percent = n
            .percent_of_goal()
            .map_or_else(|| "-".to_owned(), |p| format!("{}%", format_number(p.round())));
        let unit = n.nutrient.unit();
        lines.push((
            format!(
                "{:<10} total {:>9} {unit:<4}  avg {:>7} {unit:<4}  goal {:>6}  {percent:>5}",
                n.nutrient.label(),
                format_number(n.total.round()),
                format_number(n.average.round()),
                format_number(n.goal),
            ),
            theme.text_secondary,
        ));
    }
    lines.push((String::new(), theme.text_faint));

    let goal = summary
        .nutrients
        .iter()
        .find(|n| n.nutrient == Nutrient::Calories)
        .map_or(0.0, |n| n.goal);
    let max = summary
        .series
        .iter()
        .map(|d| d.calories)
        .fold(0.0_f64, f64::max);
    for day in &summary.series {
        let (value, color) = if day.has_data {
            (
                format_number(day.calories.round()),
                if day.goal_achieved {
                    theme.text_success
                } else {
                    theme.text_warning
                },
            )
        } else {
            ("-".to_owned(), theme.text_faint)
        };
        lines.push((
            format!(
                "{}  {}  {value}",
                day.date.format("%a %d"),
                bar_line(day.calories, goal, max, bar_width)
            ),
            color,
        ));
    }
    lines
}

#[derive(Default, Props)]
pub struct CalendarViewProps<'a> {
    pub config: Option<&'a CalendarConfig>,
    pub engine: Option<&'a EngineHandle>,
    pub theme: Option<&'a ResolvedTheme>,
    pub keybindings: Option<&'a MergedBindings>,
    pub color_depth: ColorDepth,
    pub width: u16,
    pub height: u16,
    pub should_exit: Option<State<bool>>,
    pub switch_view: Option<State<bool>>,
    pub switch_view_back: Option<State<bool>>,
    pub is_active: bool,
}

#[component]
#[allow(clippy::too_many_lines)]
pub fn CalendarView<'a>(
    props: &CalendarViewProps<'a>,
    mut hooks: Hooks,
) -> impl Into<AnyElement<'a>> {
    let theme = props.theme.cloned().unwrap_or_else(super::default_theme);
    let depth = props.color_depth;
    let is_active = props.is_active;
    let should_exit = props.should_exit;
    let switch_view = props.switch_view;
    let switch_view_back = props.switch_view_back;
    let cal_cfg = props.config.cloned().unwrap_or_default();
    let today = common::today();
    let width_now = strip_width(props.width);

    let mut month = hooks.use_state(move || (today.year(), today.month()));
    let mut grid = hooks.use_state(|| Option::<MonthGrid>::None);
    let mut loaded_at = hooks.use_state(|| Option::<Instant>::None);
    let mut in_flight = hooks.use_state(|| false);
    let mut needs_fetch = hooks.use_state(|| true);
    let mut force_refresh = hooks.use_state(|| false);
    let mut selection = hooks.use_state(move || {
        initial_selection(&month_window((today.year(), today.month()), today), today)
    });
    let mut cursor = hooks.use_state(move || today);
    let mut scroll = hooks.use_state(move || {
        let window = month_window((today.year(), today.month()), today);
        day_strip::scroll_to_show(0, today, &window, width_now)
    });
    // Pointer column relative to the first cell while a drag is active.
    let mut drag_x = hooks.use_state(|| Option::<u16>::None);
    let mut strip_cols = hooks.use_state(move || width_now);
    let mut action_status = hooks.use_state(|| Option::<StatusMessage>::None);
    let mut help_visible = hooks.use_state(|| false);

    if strip_cols.get() != width_now {
        strip_cols.set(width_now);
    }

    let event_channel = hooks.use_state(common::event_channel);
    let (event_tx, event_rx) = event_channel.read().clone();
    let engine: Option<EngineHandle> = props.engine.cloned();

    if needs_fetch.get()
        && is_active
        && !in_flight.get()
        && let Some(ref eng) = engine
    {
        let (year, m) = month.get();
        in_flight.set(true);
        needs_fetch.set(false);
        let force = force_refresh.get();
        if force {
            force_refresh.set(false);
        }
        eng.send(Request::FetchDailyReports {
            year,
            month: m,
            force,
            reply_tx: event_tx.clone(),
        });
    }

    hooks.use_future(async move {
        loop {
            smol::Timer::after(Duration::from_millis(100)).await;
            for evt in common::drain_events(&event_rx) {
                match evt {
                    Event::DailyReportsFetched {
                        year,
                        month: m,
                        reports,
                    } => {
                        in_flight.set(false);
                        if (year, m) != month.get() {
                            continue;
                        }
                        let window = month_window((year, m), common::today());
                        grid.set(Some(MonthGrid::build(window, &reports)));
                        loaded_at.set(Some(Instant::now()));
                    }
                    Event::FetchError {
                        target: FetchTarget::DailyReports,
                        message,
                        ..
                    } => {
                        in_flight.set(false);
                        if grid.read().is_none() {
                            let window = month_window(month.get(), common::today());
                            grid.set(Some(MonthGrid::empty(window)));
                        }
                        action_status.set(Some(StatusMessage::error(message)));
                    }
                    _ => {}
                }
            }
        }
    });

    // Edge auto-scroll while a drag is held near either end of the strip.
    hooks.use_future(async move {
        loop {
            smol::Timer::after(AUTOSCROLL_TICK).await;
            let Some(x) = drag_x.get() else {
                continue;
            };
            let width = strip_cols.get();
            let step = AutoScroll::TERMINAL.step(i32::from(x), i32::from(width));
            if step == 0 {
                continue;
            }
            let window = month_window(month.get(), common::today());
            let current = scroll.get();
            let next = day_strip::scroll_by(current, step, &window, width);
            if next == current {
                continue;
            }
            scroll.set(next);
            if let Some(day) = day_strip::day_at_column(&window, next, x) {
                let mut sel = selection.get();
                if sel.pointer_move(day, &window) {
                    selection.set(sel);
                    cursor.set(day);
                }
            }
        }
    });

    let keybindings = props.keybindings.cloned();
    hooks.use_terminal_events({
        move |event| {
            if !is_active {
                return;
            }
            let today = common::today();
            let window = month_window(month.get(), today);
            let width = strip_cols.get();
            match event {
                TerminalEvent::Key(KeyEvent {
                    code,
                    kind,
                    modifiers,
                    ..
                }) if kind != KeyEventKind::Release => {
                    if help_visible.get() {
                        if matches!(code, KeyCode::Char('?') | KeyCode::Esc) {
                            help_visible.set(false);
                        }
                        return;
                    }
                    let mut sel = selection.get();
                    if code == KeyCode::Esc {
                        if sel.is_selecting() {
                            sel.cancel();
                            selection.set(sel);
                            drag_x.set(None);
                        } else {
                            action_status.set(None);
                        }
                        return;
                    }
                    let Some(key) = key_event_to_string(code, modifiers, kind) else {
                        return;
                    };
                    let Some(action) = keybindings
                        .as_ref()
                        .and_then(|kb| kb.resolve(&key, ViewContext::Calendar))
                    else {
                        return;
                    };
                    let change_month = |delta: i32| step_month(month.get(), delta, today);
                    let mut show_month = move |target: (i32, u32)| {
                        let window = month_window(target, today);
                        let sel = initial_selection(&window, today);
                        let day = sel.committed().end;
                        month.set(target);
                        grid.set(None);
                        selection.set(sel);
                        cursor.set(day);
                        scroll.set(day_strip::scroll_to_show(0, day, &window, width));
                        drag_x.set(None);
                        needs_fetch.set(true);
                    };
                    match action {
                        BuiltinAction::Quit => {
                            if let Some(mut exit) = should_exit {
                                exit.set(true);
                            }
                        }
                        BuiltinAction::NextView => {
                            if let Some(mut sv) = switch_view {
                                sv.set(true);
                            }
                        }
                        BuiltinAction::PrevView => {
                            if let Some(mut sv) = switch_view_back {
                                sv.set(true);
                            }
                        }
                        BuiltinAction::ToggleHelp => help_visible.set(true),
                        BuiltinAction::Refresh => {
                            force_refresh.set(true);
                            needs_fetch.set(true);
                            action_status.set(Some(StatusMessage::info("Reloading month...")));
                        }
                        BuiltinAction::PrevMonth => {
                            if let Some(target) = change_month(-1) {
                                show_month(target);
                            }
                        }
                        BuiltinAction::NextMonth => match change_month(1) {
                            Some(target) => show_month(target),
                            None => action_status
                                .set(Some(StatusMessage::info("Already at the current month"))),
                        },
                        BuiltinAction::CursorLeft | BuiltinAction::CursorRight => {
                            let delta = if action == BuiltinAction::CursorLeft { -1 } else { 1 };
                            let Some(next) = cursor.get().checked_add_signed(TimeDelta::days(delta))
                            else {
                                return;
                            };
                            if !window.is_selectable(next) {
                                return;
                            }
                            if sel.pointer_move(next, &window) {
                                selection.set(sel);
                            }
                            cursor.set(next);
                            scroll.set(day_strip::scroll_to_show(scroll.get(), next, &window, width));
                        }
                        BuiltinAction::ToggleAnchor | BuiltinAction::Details => {
                            if sel.is_selecting() {
                                sel.pointer_up();
                            } else if action == BuiltinAction::ToggleAnchor {
                                sel.pointer_down(cursor.get(), &window);
                            }
                            selection.set(sel);
                        }
                        BuiltinAction::PresetWeek | BuiltinAction::PresetMonth => {
                            let current = (today.year(), today.month());
                            if month.get() != current {
                                show_month(current);
                            }
                            let range = if action == BuiltinAction::PresetWeek {
                                DateRange::trailing(today, 7)
                            } else {
                                DateRange::month_to_date(today)
                            };
                            let window = month_window(current, today);
                            selection.set(RangeSelection::new(range));
                            cursor.set(range.end);
                            let s = day_strip::scroll_to_show(scroll.get(), range.start, &window, width);
                            scroll.set(day_strip::scroll_to_show(s, range.end, &window, width));
                        }
                        _ => {}
                    }
                }
                TerminalEvent::FullscreenMouse(FullscreenMouseEvent {
                    kind, column, row, ..
                }) => {
                    if help_visible.get() {
                        return;
                    }
                    let rel_x = column.saturating_sub(STRIP_LEFT).min(width.saturating_sub(1));
                    let mut sel = selection.get();
                    match kind {
                        MouseEventKind::Down(MouseButton::Left) => {
                            if strip_hit(column, row, width).is_none() {
                                return;
                            }
                            let Some(day) = day_strip::day_at_column(&window, scroll.get(), rel_x)
                            else {
                                return;
                            };
                            if sel.pointer_down(day, &window) {
                                selection.set(sel);
                                cursor.set(day);
                                drag_x.set(Some(rel_x));
                            }
                        }
                        MouseEventKind::Drag(MouseButton::Left) => {
                            if !sel.is_selecting() {
                                return;
                            }
                            drag_x.set(Some(rel_x));
                            if let Some(day) = day_strip::day_at_column(&window, scroll.get(), rel_x)
                                && sel.pointer_move(day, &window)
                            {
                                selection.set(sel);
                                cursor.set(day);
                            }
                        }
                        MouseEventKind::Up(MouseButton::Left) => {
                            drag_x.set(None);
                            if sel.pointer_up().is_some() {
                                selection.set(sel);
                            }
                        }
                        MouseEventKind::ScrollDown | MouseEventKind::ScrollRight => {
                            let cell = i32::from(day_strip::CELL_WIDTH);
                            scroll.set(day_strip::scroll_by(scroll.get(), cell, &window, width));
                        }
                        MouseEventKind::ScrollUp | MouseEventKind::ScrollLeft => {
                            let cell = i32::from(day_strip::CELL_WIDTH);
                            scroll.set(day_strip::scroll_by(scroll.get(), -cell, &window, width));
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }
    });

    if !is_active {
        return element! {
            View(flex_direction: FlexDirection::Column)
        }
        .into_any();
    }

    let window = month_window(month.get(), today);
    let grid_snapshot = grid.read().clone();
    let display_grid = grid_snapshot
        .clone()
        .unwrap_or_else(|| MonthGrid::empty(window));
    let sel = selection.get();

    let rendered_strip = RenderedDayStrip::build(&DayStripConfig {
        window: &window,
        grid: Some(&display_grid),
        selection: sel.selection(),
        cursor: Some(cursor.get()),
        scroll_cols: scroll.get(),
        width: width_now,
        goals: &cal_cfg.goals,
        zero_is_empty: cal_cfg.zero_is_empty,
        theme: &theme,
        depth,
    });

    let summary = RangeSummary::compute(&display_grid, sel.selection(), &cal_cfg.goals);
    let bar_width = usize::from(props.width.saturating_sub(24)).min(48);
    let panel_lines: Vec<(String, Color)> = summary_lines(&summary, &theme, bar_width)
        .into_iter()
        .map(|(text, color)| (text, color.to_crossterm_color(depth)))
        .collect();

    let title = month_title(&window);
    let title_note = if grid_snapshot.is_none() {
        "  loading...".to_owned()
    } else if sel.is_selecting() {
        "  selecting".to_owned()
    } else {
        String::new()
    };
    let title_fg = theme.text_primary.to_crossterm_color(depth);
    let note_fg = theme.text_faint.to_crossterm_color(depth);
    let border_fg = theme.border_faint.to_crossterm_color(depth);

    let rendered_tab_bar = RenderedTabBar::build(
        ViewKind::Calendar,
        None,
        depth,
        theme.text_accent,
        theme.text_inverted,
        theme.text_secondary,
        theme.border_faint,
    );

    let context_text = if grid_snapshot.is_none() {
        format!("Fetching {title}...")
    } else {
        let with_data = display_grid.days.iter().filter(|d| d.has_data).count();
        format!("{title}: {with_data} of {} days reported", window.len())
    };
    let rendered_footer = RenderedFooter::build(
        context_text,
        footer::format_updated_ago(loaded_at.get()),
        action_status.read().as_ref(),
        depth,
        &common::footer_colors(&theme),
    );

    let rendered_help = if help_visible.get() {
        common::help_overlay(props.keybindings, ViewContext::Calendar, &theme, depth)
    } else {
        None
    };

    let width = u32::from(props.width);
    let height = u32::from(props.height);

    element! {
        View(flex_direction: FlexDirection::Column, width, height) {
            TabBar(tab_bar: rendered_tab_bar)
            View(padding_left: 1) {
                Text(content: title, color: title_fg, weight: Weight::Bold, wrap: TextWrap::NoWrap)
                Text(content: title_note, color: note_fg, wrap: TextWrap::NoWrap)
            }
            View(padding_left: 1) {
                DayStrip(strip: rendered_strip)
            }
            View(
                flex_grow: 1.0,
                flex_direction: FlexDirection::Column,
                overflow: Overflow::Hidden,
                border_style: BorderStyle::Single,
                border_edges: Edges::Top,
                border_color: border_fg,
                padding_left: 1,
            ) {
                #(panel_lines.into_iter().enumerate().map(|(i, (text, color))| element! {
                    Text(key: i, content: text, color, wrap: TextWrap::NoWrap)
                }))
            }
            Footer(footer: rendered_footer)
            HelpOverlay(overlay: rendered_help, width: props.width, height: props.height)
        }
    }
    .into_any()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DailyReport, NutrientGoals};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).expect("valid date")
    }

    #[test]
    fn month_arithmetic_wraps_years() {
        assert_eq!(shift_month((2025, 1), -1), (2024, 12));
        assert_eq!(shift_month((2024, 12), 1), (2025, 1));
        assert_eq!(shift_month((2025, 3), 0), (2025, 3));
    }

    #[test]
    fn next_month_stops_at_the_current_one() {
        let today = d(3, 14);
        assert_eq!(step_month((2025, 3), 1, today), None);
        assert_eq!(step_month((2025, 2), 1, today), Some((2025, 3)));
        assert_eq!(step_month((2025, 3), -1, today), Some((2025, 2)));
    }

    #[test]
    fn clicks_outside_the_strip_miss() {
        assert_eq!(strip_hit(STRIP_LEFT, STRIP_TOP, 40), Some(0));
        assert_eq!(strip_hit(STRIP_LEFT + 9, STRIP_TOP + 4, 40), Some(9));
        assert_eq!(strip_hit(STRIP_LEFT - 1, STRIP_TOP, 40), None);
        assert_eq!(strip_hit(STRIP_LEFT + 40, STRIP_TOP, 40), None);
        assert_eq!(strip_hit(STRIP_LEFT, STRIP_TOP + STRIP_ROWS, 40), None);
    }

    #[test]
    fn past_month_selects_its_last_three_days() {
        let today = d(3, 14);
        let feb = month_window((2025, 2), today);
        let sel = initial_selection(&feb, today);
        assert_eq!(sel.committed(), DateRange::new(d(2, 26), d(2, 28)));

        let mar = month_window((2025, 3), today);
        assert_eq!(
            initial_selection(&mar, today).committed(),
            DateRange::new(d(3, 12), d(3, 14))
        );
    }

    #[test]
    fn selection_is_kept_inside_the_month() {
        let today = d(3, 2);
        let mar = month_window((2025, 3), today);
        assert_eq!(
            initial_selection(&mar, today).committed(),
            DateRange::new(d(3, 1), d(3, 2))
        );
    }

    #[test]
    fn panel_has_headline_nutrients_and_one_bar_per_day() {
        let theme = ResolvedTheme::default();
        let today = d(3, 14);
        let window = month_window((2025, 3), today);
        let reports = vec![DailyReport {
            id: None,
            report_date: "2025-03-13".to_owned(),
            total_calories_consumed: 2100.0,
            total_proteins_consumed: 80.0,
            total_fats_consumed: 60.0,
            total_carbs_consumed: 250.0,
            is_goal_achieved: true,
        }];
        let grid = MonthGrid::build(window, &reports);
        let range = DateRange::new(d(3, 12), d(3, 14));
        let summary = RangeSummary::compute(&grid, range, &NutrientGoals::default());
        let lines = summary_lines(&summary, &theme, 10);

        assert!(lines[0].0.contains("3 days") && lines[0].0.contains("days with data: 1"));
        assert!(lines.iter().any(|(t, _)| t.starts_with("Calories")));
        let bars: Vec<&(String, AppColor)> =
            lines.iter().filter(|(t, _)| t.contains('\u{b7}') || t.contains('\u{2588}')).collect();
        assert_eq!(bars.len(), 3);
        assert!(bars[1].0.ends_with("2100"));
        assert_eq!(bars[1].1, theme.text_success);
        assert!(bars[0].0.ends_with('-'));
    }
}
