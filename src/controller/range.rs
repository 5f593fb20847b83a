use chrono::{Datelike, Days, NaiveDate};

/// Inclusive date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, swapping the bounds if needed.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if b < a {
            Self { start: b, end: a }
        } else {
            Self { start: a, end: b }
        }
    }

    /// Number of days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn iter_days(self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// `today-(n-1) ..= today`.
    pub fn trailing(today: NaiveDate, n: u64) -> Self {
        let start = today
            .checked_sub_days(Days::new(n.saturating_sub(1)))
            .unwrap_or(today);
        Self { start, end: today }
    }

    /// First of the month through `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        Self {
            start: today.with_day(1).unwrap_or(today),
            end: today,
        }
    }
}

/// The span of days a strip displays and which of them accept selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub first: NaiveDate,
    pub last: NaiveDate,
    /// Days after this are shown but disabled.
    pub latest_selectable: Option<NaiveDate>,
}

impl DayWindow {
    /// Every day of `year-month`, with days after `today` disabled.
    pub fn month(year: i32, month: u32, today: NaiveDate) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let last = first
            .checked_add_months(chrono::Months::new(1))?
            .pred_opt()?;
        Some(Self {
            first,
            last,
            latest_selectable: Some(today),
        })
    }

    /// The `n` days ending today.
    pub fn trailing(today: NaiveDate, n: u64) -> Self {
        let range = DateRange::trailing(today, n);
        Self {
            first: range.start,
            last: range.end,
            latest_selectable: Some(today),
        }
    }

    pub fn len(&self) -> usize {
        usize::try_from((self.last - self.first).num_days() + 1).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }

    pub fn day(&self, index: usize) -> Option<NaiveDate> {
        let day = self.first.checked_add_days(Days::new(index as u64))?;
        (day <= self.last).then_some(day)
    }

    pub fn index_of(&self, day: NaiveDate) -> Option<usize> {
        if day < self.first || day > self.last {
            return None;
        }
        usize::try_from((day - self.first).num_days()).ok()
    }

    pub fn is_disabled(&self, day: NaiveDate) -> bool {
        self.latest_selectable.is_some_and(|latest| day > latest)
    }

    pub fn is_selectable(&self, day: NaiveDate) -> bool {
        day >= self.first && day <= self.last && !self.is_disabled(day)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        DateRange {
            start: self.first,
            end: self.last,
        }
        .iter_days()
    }
}

/// Drag-to-select state for a contiguous date range.
///
/// `anchor` is where the drag started and `cursor` where it is now; the
/// exposed range is always normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSelection {
    anchor: NaiveDate,
    cursor: NaiveDate,
    selecting: bool,
    committed: DateRange,
}

impl RangeSelection {
    pub fn new(range: DateRange) -> Self {
        Self {
            anchor: range.start,
            cursor: range.end,
            selecting: false,
            committed: range,
        }
    }

    /// The default three-day window ending today.
    pub fn default_for(today: NaiveDate) -> Self {
        Self::new(DateRange::trailing(today, 3))
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    /// The live range, including an in-progress drag.
    pub fn selection(&self) -> DateRange {
        DateRange::new(self.anchor, self.cursor)
    }

    /// The last committed range.
    pub fn committed(&self) -> DateRange {
        self.committed
    }

    /// Start a drag at `day`. Ignored for days the window does not accept.
    pub fn pointer_down(&mut self, day: NaiveDate, window: &DayWindow) -> bool {
        if !window.is_selectable(day) {
            return false;
        }
        self.anchor = day;
        self.cursor = day;
        self.selecting = true;
        true
    }

    /// Extend the drag to `day`. Out-of-window and disabled days are ignored
    /// without ending the drag.
    pub fn pointer_move(&mut self, day: NaiveDate, window: &DayWindow) -> bool {
        if !self.selecting || !window.is_selectable(day) || day == self.cursor {
            return false;
        }
        self.cursor = day;
        true
    }

    /// Finish the drag and return the committed range.
    pub fn pointer_up(&mut self) -> Option<DateRange> {
        if !self.selecting {
            return None;
        }
        self.selecting = false;
        self.committed = self.selection();
        self.anchor = self.committed.start;
        self.cursor = self.committed.end;
        Some(self.committed)
    }

    /// Abandon an in-progress drag and restore the committed range.
    pub fn cancel(&mut self) {
        self.selecting = false;
        self.anchor = self.committed.start;
        self.cursor = self.committed.end;
    }

    /// Replace the selection outright (presets).
    pub fn set(&mut self, range: DateRange) {
        *self = Self::new(range);
    }
}

/// Edge auto-scroll while dragging across a horizontally scrolled strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoScroll {
    pub zone_width: i32,
    pub divisor: i32,
    pub min_step: i32,
    pub max_step: i32,
}

impl AutoScroll {
    /// Browser-style tuning in pixels: three 80px cells.
    pub const PIXELS: Self = Self {
        zone_width: 240,
        divisor: 4,
        min_step: 5,
        max_step: 20,
    };

    /// Terminal tuning in columns: three 8-column cells.
    pub const TERMINAL: Self = Self {
        zone_width: 24,
        divisor: 4,
        min_step: 1,
        max_step: 4,
    };

    /// Scroll delta for a pointer at `x` within a viewport `width` wide.
    ///
    /// Negative near the left edge, positive near the right, 0 elsewhere.
    /// The magnitude grows with the distance into the zone.
    pub fn step(&self, x: i32, width: i32) -> i32 {
        let left_zone_end = self.zone_width;
        let right_zone_start = width - self.zone_width;
        if x < left_zone_end {
            -self.speed(left_zone_end - x)
        } else if x > right_zone_start {
            self.speed(x - right_zone_start)
        } else {
            0
        }
    }

    fn speed(&self, distance: i32) -> i32 {
        (distance / self.divisor.max(1)).clamp(self.min_step, self.max_step)
    }
}
