pub mod calendar;
pub(crate) mod common;
pub mod meals;
pub mod products;
pub mod reports;
pub mod users;

use crate::theme::ResolvedTheme;

/// Fallback theme when none is provided via props.
pub(crate) fn default_theme() -> ResolvedTheme {
    ResolvedTheme::default()
}
