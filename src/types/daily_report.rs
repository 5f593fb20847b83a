use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::controller::{DateRange, DayWindow};
use crate::util::parse_date;

/// One row of `GET /api/daily-reports/data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    #[serde(default)]
    pub id: Option<i64>,
    /// `YYYY-MM-DD`
    pub report_date: String,
    #[serde(default)]
    pub total_calories_consumed: f64,
    #[serde(default)]
    pub total_proteins_consumed: f64,
    #[serde(default)]
    pub total_fats_consumed: f64,
    #[serde(default)]
    pub total_carbs_consumed: f64,
    #[serde(default = "default_true")]
    pub is_goal_achieved: bool,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Nutrients and goals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nutrient {
    Calories,
    Proteins,
    Fats,
    Carbs,
}

impl Nutrient {
    pub const ALL: [Self; 4] = [Self::Calories, Self::Proteins, Self::Fats, Self::Carbs];

    pub fn label(self) -> &'static str {
        match self {
            Self::Calories => "Calories",
            Self::Proteins => "Proteins",
            Self::Fats => "Fats",
            Self::Carbs => "Carbs",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Calories => "kcal",
            Self::Proteins | Self::Fats | Self::Carbs => "g",
        }
    }
}

/// Daily targets per nutrient. Zero means "no goal".
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct NutrientGoals {
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbs: f64,
}

impl Default for NutrientGoals {
    fn default() -> Self {
        Self {
            calories: 2000.0,
            proteins: 100.0,
            fats: 70.0,
            carbs: 250.0,
        }
    }
}

impl NutrientGoals {
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Proteins => self.proteins,
            Nutrient::Fats => self.fats,
            Nutrient::Carbs => self.carbs,
        }
    }
}

/// Colour band of one nutrient cell relative to its goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NutrientLevel {
    Empty,
    Low,
    Good,
    Warning,
    Danger,
}

/// Classify `value` against `goal`.
///
/// No goal gives `Empty`. A zero value is `Empty` only when `zero_is_empty`
/// is set; otherwise it falls in the `Low` band.
pub fn classify(value: f64, goal: f64, zero_is_empty: bool) -> NutrientLevel {
    if goal <= 0.0 || !goal.is_finite() || (zero_is_empty && value == 0.0) {
        return NutrientLevel::Empty;
    }
    let percentage = value / goal * 100.0;
    if percentage < 50.0 {
        NutrientLevel::Low
    } else if percentage <= 100.0 {
        NutrientLevel::Good
    } else if percentage <= 130.0 {
        NutrientLevel::Warning
    } else {
        NutrientLevel::Danger
    }
}

// ---------------------------------------------------------------------------
// Month grid
// ---------------------------------------------------------------------------

/// Nutrition totals for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayNutrition {
    pub date: NaiveDate,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbs: f64,
    pub goal_achieved: bool,
    pub has_data: bool,
}

impl DayNutrition {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            calories: 0.0,
            proteins: 0.0,
            fats: 0.0,
            carbs: 0.0,
            goal_achieved: false,
            has_data: false,
        }
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Proteins => self.proteins,
            Nutrient::Fats => self.fats,
            Nutrient::Carbs => self.carbs,
        }
    }

    pub fn level(&self, nutrient: Nutrient, goals: &NutrientGoals, zero_is_empty: bool) -> NutrientLevel {
        if !self.has_data {
            return NutrientLevel::Empty;
        }
        classify(self.get(nutrient), goals.get(nutrient), zero_is_empty)
    }
}

/// Every day of one month, with or without reported data.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid {
    pub window: DayWindow,
    pub days: Vec<DayNutrition>,
}

impl MonthGrid {
    /// Days of the month absent from `reports` are zero with `has_data`
    /// unset. Reports outside the month are ignored.
    pub fn build(window: DayWindow, reports: &[DailyReport]) -> Self {
        let mut days: Vec<DayNutrition> = window.days().map(DayNutrition::empty).collect();
        for report in reports {
            let Some(date) = parse_date(&report.report_date) else {
                tracing::debug!(raw = %report.report_date, "skipping daily report with bad date");
                continue;
            };
            let Some(slot) = window.index_of(date).and_then(|i| days.get_mut(i)) else {
                continue;
            };
            *slot = DayNutrition {
                date,
                calories: report.total_calories_consumed,
                proteins: report.total_proteins_consumed,
                fats: report.total_fats_consumed,
                carbs: report.total_carbs_consumed,
                goal_achieved: report.is_goal_achieved,
                has_data: true,
            };
        }
        Self { window, days }
    }

    pub fn empty(window: DayWindow) -> Self {
        Self::build(window, &[])
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DayNutrition> {
        self.window.index_of(date).and_then(|i| self.days.get(i))
    }
}

// ---------------------------------------------------------------------------
// Range summary
// ---------------------------------------------------------------------------

/// Per-nutrient aggregate over a selected range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutrientSummary {
    pub nutrient: Nutrient,
    pub total: f64,
    /// Mean over days that have data.
    pub average: f64,
    pub goal: f64,
}

impl NutrientSummary {
    /// Average as a percentage of the daily goal, if there is one.
    pub fn percent_of_goal(&self) -> Option<f64> {
        (self.goal > 0.0).then(|| self.average / self.goal * 100.0)
    }
}

/// Aggregates feeding the calendar's range panel.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSummary {
    pub range: DateRange,
    pub days_with_data: usize,
    pub goals_met: usize,
    pub nutrients: Vec<NutrientSummary>,
    /// One entry per day in the range, in order.
    pub series: Vec<DayNutrition>,
}

impl RangeSummary {
    pub fn compute(grid: &MonthGrid, range: DateRange, goals: &NutrientGoals) -> Self {
        let series: Vec<DayNutrition> = range
            .iter_days()
            .map(|d| grid.get(d).copied().unwrap_or_else(|| DayNutrition::empty(d)))
            .collect();
        let with_data: Vec<&DayNutrition> = series.iter().filter(|d| d.has_data).collect();
        let days_with_data = with_data.len();
        let goals_met = with_data.iter().filter(|d| d.goal_achieved).count();

        let nutrients = Nutrient::ALL
            .into_iter()
            .map(|nutrient| {
                let total: f64 = with_data.iter().map(|d| d.get(nutrient)).sum();
                #[allow(clippy::cast_precision_loss)]
                let average = if days_with_data == 0 {
                    0.0
                } else {
                    total / days_with_data as f64
                };
                NutrientSummary {
                    nutrient,
                    total,
                    average,
                    goal: goals.get(nutrient),
                }
            })
            .collect();

        Self {
            range,
            days_with_data,
            goals_met,
            nutrients,
            series,
        }
    }
}
