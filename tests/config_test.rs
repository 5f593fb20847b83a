use std::io::Write as _;

use nutri_board::config::loader::{load_config, parse_str};
use nutri_board::config::types::{AppConfig, View};
use nutri_board::controller::{SortDirection, SortSpec};

#[test]
fn empty_config_uses_defaults() {
    let config = parse_str("").unwrap().with_view_defaults();
    assert_eq!(config.backend.base_url, "http://localhost:8080");
    assert_eq!(config.backend.timeout_secs, 15);
    assert_eq!(config.defaults.view, View::Users);
    assert_eq!(config.users.page_size, 16);
    assert_eq!(config.reports.page_size, 8);
    assert_eq!(config.reports.sort, SortSpec::descending("created"));
    assert_eq!(config.users.sort, Some(SortSpec::descending("lastActivity")));
    assert_eq!(config.products.sort, Some(SortSpec::ascending("name")));
    assert_eq!(config.meals.sort, Some(SortSpec::ascending("id")));
    assert!(config.calendar.zero_is_empty);
}

#[test]
fn unknown_keys_are_ignored() {
    let config = parse_str(
        r#"
something_else = 1

[backend]
base_url = "https://nutri.example"
"#,
    )
    .unwrap();
    assert_eq!(config.backend.base_url, "https://nutri.example");
}

#[test]
fn view_sections_parse() {
    let config: AppConfig = toml::from_str(
        r#"
[defaults]
view = "calendar"
date_format = "%d.%m.%Y"

[users]
page_size = 32
refresh_interval_minutes = 0
sort = { field = "streak" }

[reports]
page_size = 16
poll_interval_secs = 3
sort = { field = "id", direction = "ascending" }

[calendar]
zero_is_empty = false
goals = { calories = 1800.0 }
"#,
    )
    .unwrap();
    let config = config.with_view_defaults();
    assert_eq!(config.defaults.view, View::Calendar);
    assert_eq!(config.users.page_size, 32);
    assert_eq!(config.users.refresh_interval_minutes, 0);
    let sort = config.users.sort.unwrap();
    assert_eq!(sort.field, "streak");
    assert_eq!(sort.direction, SortDirection::Ascending);
    assert_eq!(config.reports.poll_interval_secs, 3);
    assert_eq!(config.reports.sort.direction, SortDirection::Ascending);
    assert!(!config.calendar.zero_is_empty);
    assert!((config.calendar.goals.calories - 1800.0).abs() < f64::EPSILON);
    // Unset goals keep their defaults.
    assert!((config.calendar.goals.proteins - 100.0).abs() < f64::EPSILON);
}

#[test]
fn explicit_path_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[backend]
base_url = "http://10.0.0.5:9000"
csrf_token = "abc"

[products]
page_size = 8

[meals]
page_size = 32
"#
    )
    .unwrap();

    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.backend.base_url, "http://10.0.0.5:9000");
    assert_eq!(config.backend.csrf_token.as_deref(), Some("abc"));
    assert_eq!(config.products.page_size, 8);
    assert_eq!(config.products.sort, Some(SortSpec::ascending("name")));
    assert_eq!(config.meals.page_size, 32);
}

#[test]
fn missing_explicit_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
    assert!(format!("{err:#}").contains("nope.toml"));
}

#[test]
fn invalid_toml_reports_the_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[backend\nbase_url = 1").unwrap();
    let err = load_config(Some(file.path())).unwrap_err();
    assert!(format!("{err:#}").contains("parsing TOML"));
}

#[test]
fn bad_view_name_is_rejected() {
    assert!(parse_str("[defaults]\nview = \"orders\"").is_err());
}
