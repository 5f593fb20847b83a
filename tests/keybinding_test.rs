use nutri_board::config::keybindings::{
    BuiltinAction, Keybinding, KeybindingsConfig, MergedBindings, ViewContext, default_universal,
    key_event_to_string,
};

use iocraft::prelude::{KeyCode, KeyEventKind, KeyModifiers};

fn binding(key: &str, builtin: &str) -> Keybinding {
    Keybinding {
        key: key.to_owned(),
        builtin: builtin.to_owned(),
        name: None,
    }
}

#[test]
fn override_replaces_default_in_context() {
    let config = KeybindingsConfig {
        products: vec![binding("d", "details")],
        ..Default::default()
    };
    let merged = MergedBindings::from_config(&config);
    assert_eq!(
        merged.resolve("d", ViewContext::Products),
        Some(BuiltinAction::Details)
    );
    // `delete` still reaches the delete action.
    assert_eq!(
        merged.resolve("delete", ViewContext::Products),
        Some(BuiltinAction::Delete)
    );
}

#[test]
fn universal_override_applies_everywhere() {
    let config = KeybindingsConfig {
        universal: vec![binding("x", "quit")],
        ..Default::default()
    };
    let merged = MergedBindings::from_config(&config);
    for ctx in [
        ViewContext::Users,
        ViewContext::Products,
        ViewContext::Meals,
        ViewContext::Reports,
        ViewContext::Calendar,
    ] {
        assert_eq!(merged.resolve("x", ctx), Some(BuiltinAction::Quit));
    }
}

#[test]
fn unknown_builtin_resolves_to_nothing() {
    let config = KeybindingsConfig {
        users: vec![binding("u", "launch_rockets")],
        ..Default::default()
    };
    let merged = MergedBindings::from_config(&config);
    assert_eq!(merged.resolve("u", ViewContext::Users), None);
}

#[test]
fn delete_is_product_only() {
    let merged = MergedBindings::default();
    assert_eq!(merged.resolve("d", ViewContext::Users), None);
    assert_eq!(merged.resolve("e", ViewContext::Reports), None);
}

#[test]
fn digits_sort_by_column() {
    let merged = MergedBindings::default();
    assert_eq!(
        merged.resolve("1", ViewContext::Users),
        Some(BuiltinAction::SortColumn(1))
    );
    assert_eq!(
        merged.resolve("9", ViewContext::Products),
        Some(BuiltinAction::SortColumn(9))
    );
}

#[test]
fn defaults_cover_navigation_and_quit() {
    let bindings = default_universal();
    let has = |key: &str| bindings.iter().any(|b| b.key == key);
    for key in ["j", "k", "l", "h", "g", "G", "/", "r", "?", "q", "ctrl+c", "tab"] {
        assert!(has(key), "missing default binding for {key}");
    }
}

#[test]
fn help_groups_list_universal_first() {
    let merged = MergedBindings::default();
    let groups = merged.all_for_context(ViewContext::Reports);
    assert_eq!(groups[0].0, "Universal");
    assert_eq!(groups[1].0, "Reports");
    assert!(groups[1].1.iter().any(|b| b.builtin == "retry"));
}

#[test]
fn parse_from_toml() {
    let config: KeybindingsConfig = toml::from_str(
        r#"
[[calendar]]
key = "<"
builtin = "prev_month"
name = "Back a month"
"#,
    )
    .unwrap();
    let merged = MergedBindings::from_config(&config);
    assert_eq!(
        merged.resolve("<", ViewContext::Calendar),
        Some(BuiltinAction::PrevMonth)
    );
}

#[test]
fn key_strings_match_config_syntax() {
    let press = KeyEventKind::Press;
    assert_eq!(
        key_event_to_string(KeyCode::Char('G'), KeyModifiers::SHIFT, press).as_deref(),
        Some("G")
    );
    assert_eq!(
        key_event_to_string(KeyCode::Char('c'), KeyModifiers::CONTROL, press).as_deref(),
        Some("ctrl+c")
    );
    assert_eq!(
        key_event_to_string(KeyCode::PageDown, KeyModifiers::empty(), press).as_deref(),
        Some("pagedown")
    );
    assert_eq!(
        key_event_to_string(KeyCode::F(5), KeyModifiers::empty(), press).as_deref(),
        Some("f5")
    );
}

#[test]
fn meal_day_keys_do_not_leak_into_products() {
    let merged = MergedBindings::default();
    assert_eq!(merged.resolve("]", ViewContext::Meals), Some(BuiltinAction::CursorRight));
    assert_eq!(merged.resolve("t", ViewContext::Meals), Some(BuiltinAction::Today));
    assert_eq!(merged.resolve("n", ViewContext::Meals), Some(BuiltinAction::Create));
    assert_eq!(merged.resolve("]", ViewContext::Products), None);
    assert_eq!(merged.key_for(BuiltinAction::Delete, ViewContext::Meals), Some("d"));
}
