use std::path::PathBuf;

use serde::Deserialize;

use crate::color::Color;
use crate::config::keybindings::KeybindingsConfig;
use crate::controller::SortSpec;
use crate::types::NutrientGoals;

// ---------------------------------------------------------------------------
// Custom Color deserialization
// ---------------------------------------------------------------------------

/// Deserialize an `Option<Color>` from a TOML string value.
pub(crate) mod color_de {
    use serde::{self, Deserialize, Deserializer};

    use crate::color::Color;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Color>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| Color::parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub defaults: Defaults,
    pub users: TableViewConfig,
    pub products: TableViewConfig,
    /// `refresh_interval_minutes` does not apply: meals reload per day.
    pub meals: TableViewConfig,
    pub reports: ReportsConfig,
    pub calendar: CalendarConfig,
    pub theme: Theme,
    pub keybindings: KeybindingsConfig,
}

impl AppConfig {
    /// Apply the built-in per-view defaults that differ between views.
    ///
    /// Serde fills each `[users]`/`[products]`/`[meals]` table from the same
    /// `TableViewConfig::default()`, so view-specific sort fields are set
    /// here when the user left them out.
    pub fn with_view_defaults(mut self) -> Self {
        self.users.sort.get_or_insert_with(|| SortSpec::descending("lastActivity"));
        self.products.sort.get_or_insert_with(|| SortSpec::ascending("name"));
        self.meals.sort.get_or_insert_with(|| SortSpec::ascending("id"));
        self
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Sent as `X-CSRF-TOKEN` on mutating requests.
    pub csrf_token: Option<String>,
    /// Sent as a bearer token on every request.
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_owned(),
            csrf_token: None,
            auth_token: None,
            timeout_secs: 15,
            cache_ttl_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Users,
    Products,
    Meals,
    Reports,
    Calendar,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub view: View,
    pub search_debounce_ms: u64,
    pub date_format: String,
    /// Where downloaded report CSVs are written.
    pub download_dir: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            view: View::Users,
            search_debounce_ms: 200,
            date_format: "relative".to_owned(),
            download_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-view settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableViewConfig {
    pub page_size: usize,
    /// Background refresh period; 0 disables it.
    pub refresh_interval_minutes: u32,
    pub sort: Option<SortSpec>,
}

impl Default for TableViewConfig {
    fn default() -> Self {
        Self {
            page_size: 16,
            refresh_interval_minutes: 5,
            sort: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    pub page_size: usize,
    /// Polling period while any report is still being generated.
    pub poll_interval_secs: u64,
    pub sort: SortSpec,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            page_size: 8,
            poll_interval_secs: 10,
            sort: SortSpec::descending("created"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Render zero-valued nutrient cells as empty rather than "low".
    pub zero_is_empty: bool,
    pub goals: NutrientGoals,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            zero_is_empty: true,
            goals: NutrientGoals::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub colors: ColorsTheme,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColorsTheme {
    pub text: TextColors,
    pub background: BgColors,
    pub border: BorderColors,
    pub nutrient: NutrientColors,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TextColors {
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub primary: Option<Color>,
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub secondary: Option<Color>,
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub inverted: Option<Color>,
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub faint: Option<Color>,
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub warning: Option<Color>,
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub success: Option<Color>,
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub error: Option<Color>,
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub accent: Option<Color>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BgColors {
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub selected: Option<Color>,
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub range: Option<Color>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BorderColors {
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub primary: Option<Color>,
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub faint: Option<Color>,
}

/// Cell colours for the nutrient bands of the calendar.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NutrientColors {
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub empty: Option<Color>,
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub low: Option<Color>,
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub good: Option<Color>,
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub warning: Option<Color>,
    #[serde(default, deserialize_with = "color_de::deserialize")]
    pub danger: Option<Color>,
}
