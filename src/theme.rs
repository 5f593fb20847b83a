use crate::color::Color;
use crate::config::types::Theme;
use crate::types::{NutrientLevel, ReportStatus};

/// Detected terminal background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Background {
    #[default]
    Dark,
    Light,
}

impl Background {
    /// Detect whether the terminal has a dark or light background.
    ///
    /// Reads `COLORFGBG` ("fg;bg" or "fg;default;bg"); anything unreadable
    /// counts as dark.
    pub fn detect() -> Self {
        std::env::var("COLORFGBG")
            .ok()
            .map_or(Self::Dark, |v| Self::from_colorfgbg(&v))
    }

    pub fn from_colorfgbg(value: &str) -> Self {
        match value.rsplit(';').next().and_then(|bg| bg.parse::<u8>().ok()) {
            // 7 and 9-15 are the light slots.
            Some(7 | 9..=15) => Self::Light,
            _ => Self::Dark,
        }
    }
}

/// Every color slot the UI paints with, with user overrides applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTheme {
    pub text_primary: Color,
    pub text_secondary: Color,
    pub text_inverted: Color,
    pub text_faint: Color,
    pub text_warning: Color,
    pub text_success: Color,
    pub text_error: Color,
    pub text_accent: Color,
    pub bg_selected: Color,
    pub bg_range: Color,
    pub border_primary: Color,
    pub border_faint: Color,
    pub nutrient_empty: Color,
    pub nutrient_low: Color,
    pub nutrient_good: Color,
    pub nutrient_warning: Color,
    pub nutrient_danger: Color,
}

impl Default for ResolvedTheme {
    fn default() -> Self {
        Self::builtin(Background::Dark)
    }
}

impl ResolvedTheme {
    pub fn builtin(bg: Background) -> Self {
        let a = Color::Ansi;
        match bg {
            Background::Dark => Self {
                text_primary: a(7),
                text_secondary: a(245),
                text_inverted: a(0),
                text_faint: a(243),
                text_warning: a(11),
                text_success: a(10),
                text_error: a(9),
                text_accent: a(14),
                bg_selected: a(237),
                bg_range: a(24),
                border_primary: a(244),
                border_faint: a(239),
                nutrient_empty: a(238),
                nutrient_low: a(67),
                nutrient_good: a(71),
                nutrient_warning: a(179),
                nutrient_danger: a(167),
            },
            Background::Light => Self {
                text_primary: a(0),
                text_secondary: a(240),
                text_inverted: a(15),
                text_faint: a(248),
                text_warning: a(130),
                text_success: a(28),
                text_error: a(160),
                text_accent: a(25),
                bg_selected: a(254),
                bg_range: a(153),
                border_primary: a(240),
                border_faint: a(252),
                nutrient_empty: a(253),
                nutrient_low: a(110),
                nutrient_good: a(114),
                nutrient_warning: a(222),
                nutrient_danger: a(210),
            },
        }
    }

    /// Built-in palette for `bg`, overlaid with whatever the config sets.
    pub fn resolve(theme: &Theme, bg: Background) -> Self {
        let mut t = Self::builtin(bg);
        let c = &theme.colors;
        let overrides = [
            (&mut t.text_primary, c.text.primary),
            (&mut t.text_secondary, c.text.secondary),
            (&mut t.text_inverted, c.text.inverted),
            (&mut t.text_faint, c.text.faint),
            (&mut t.text_warning, c.text.warning),
            (&mut t.text_success, c.text.success),
            (&mut t.text_error, c.text.error),
            (&mut t.text_accent, c.text.accent),
            (&mut t.bg_selected, c.background.selected),
            (&mut t.bg_range, c.background.range),
            (&mut t.border_primary, c.border.primary),
            (&mut t.border_faint, c.border.faint),
            (&mut t.nutrient_empty, c.nutrient.empty),
            (&mut t.nutrient_low, c.nutrient.low),
            (&mut t.nutrient_good, c.nutrient.good),
            (&mut t.nutrient_warning, c.nutrient.warning),
            (&mut t.nutrient_danger, c.nutrient.danger),
        ];
        for (slot, value) in overrides {
            if let Some(color) = value {
                *slot = color;
            }
        }
        t
    }

    pub fn nutrient(&self, level: NutrientLevel) -> Color {
        match level {
            NutrientLevel::Empty => self.nutrient_empty,
            NutrientLevel::Low => self.nutrient_low,
            NutrientLevel::Good => self.nutrient_good,
            NutrientLevel::Warning => self.nutrient_warning,
            NutrientLevel::Danger => self.nutrient_danger,
        }
    }

    pub fn report_status(&self, status: ReportStatus) -> Color {
        match status {
            ReportStatus::Completed => self.text_success,
            ReportStatus::Processing => self.text_warning,
            ReportStatus::Error => self.text_error,
            ReportStatus::Created | ReportStatus::Unknown => self.text_secondary,
        }
    }
}
