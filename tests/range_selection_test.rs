use chrono::NaiveDate;

use nutri_board::components::day_strip::{day_at_column, max_scroll, scroll_by};
use nutri_board::controller::{AutoScroll, DateRange, DayWindow, RangeSelection};
use nutri_board::types::{DailyReport, MonthGrid, NutrientGoals, RangeSummary};

const WIDTH: u16 = 80;

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, day).expect("valid date")
}

fn daily(date: &str, calories: f64, achieved: bool) -> DailyReport {
    DailyReport {
        id: None,
        report_date: date.to_owned(),
        total_calories_consumed: calories,
        total_proteins_consumed: 70.0,
        total_fats_consumed: 50.0,
        total_carbs_consumed: 200.0,
        is_goal_achieved: achieved,
    }
}

/// Hold the pointer at `x` until auto-scroll stops, extending the drag on
/// every tick.
fn hold_at(x: u16, scroll: &mut usize, sel: &mut RangeSelection, window: &DayWindow) {
    loop {
        let step = AutoScroll::TERMINAL.step(i32::from(x), i32::from(WIDTH));
        let next = scroll_by(*scroll, step, window, WIDTH);
        if next == *scroll {
            break;
        }
        *scroll = next;
        if let Some(day) = day_at_column(window, *scroll, x) {
            sel.pointer_move(day, window);
        }
    }
}

#[test]
fn dragging_to_the_edge_scrolls_and_selects_the_whole_month() {
    let window = DayWindow::month(2025, 2, d(3, 14)).expect("valid month");
    let mut sel = RangeSelection::default_for(d(2, 28));
    let mut scroll = 0;

    let first = day_at_column(&window, scroll, 3).expect("a day under the pointer");
    assert!(sel.pointer_down(first, &window));
    hold_at(WIDTH - 1, &mut scroll, &mut sel, &window);

    assert_eq!(scroll, max_scroll(&window, WIDTH));
    assert_eq!(sel.pointer_up(), Some(DateRange::new(d(2, 1), d(2, 28))));

    let grid = MonthGrid::build(
        window,
        &[
            daily("2025-02-03", 1900.0, true),
            daily("2025-02-04", 2600.0, false),
            daily("2025-03-01", 1500.0, true),
        ],
    );
    let summary = RangeSummary::compute(&grid, sel.committed(), &NutrientGoals::default());
    assert_eq!(summary.series.len(), 28);
    assert_eq!(summary.days_with_data, 2);
    assert_eq!(summary.goals_met, 1);
    let calories = &summary.nutrients[0];
    assert!((calories.total - 4500.0).abs() < 1e-9);
    assert!((calories.average - 2250.0).abs() < 1e-9);
}

#[test]
fn dragging_back_to_the_left_edge_reverses_the_range() {
    let window = DayWindow::month(2025, 2, d(3, 14)).expect("valid month");
    let mut sel = RangeSelection::default_for(d(2, 28));
    let mut scroll = max_scroll(&window, WIDTH);

    let start = day_at_column(&window, scroll, WIDTH - 2).expect("a day under the pointer");
    assert_eq!(start, d(2, 28));
    assert!(sel.pointer_down(start, &window));
    hold_at(0, &mut scroll, &mut sel, &window);

    assert_eq!(scroll, 0);
    assert_eq!(sel.pointer_up(), Some(DateRange::new(d(2, 1), d(2, 28))));
}

#[test]
fn drag_into_future_days_stops_at_today() {
    let today = d(3, 14);
    let window = DayWindow::month(2025, 3, today).expect("valid month");
    let mut sel = RangeSelection::default_for(today);
    let mut scroll = 8 * 6;

    // Mar 12 sits in the middle of the strip.
    let start = day_at_column(&window, scroll, 44).expect("a day under the pointer");
    assert_eq!(start, d(3, 12));
    assert!(sel.pointer_down(start, &window));

    for x in (44..WIDTH).step_by(8) {
        if let Some(day) = day_at_column(&window, scroll, x) {
            sel.pointer_move(day, &window);
        }
    }
    assert!(sel.is_selecting());
    assert_eq!(sel.pointer_up(), Some(DateRange::new(d(3, 12), today)));

    // A click on a future day never starts a drag.
    let future = day_at_column(&window, scroll, WIDTH - 1).expect("a day under the pointer");
    assert!(future > today);
    assert!(!sel.pointer_down(future, &window));
    scroll = scroll_by(scroll, 1000, &window, WIDTH);
    assert_eq!(scroll, max_scroll(&window, WIDTH));
}
