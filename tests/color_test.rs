use nutri_board::color::{Color, ColorDepth, ColorParseError};
use nutri_board::config::types::AppConfig;
use nutri_board::theme::{Background, ResolvedTheme};
use nutri_board::types::NutrientLevel;

#[test]
fn parse_hex_long_and_short() {
    assert_eq!(
        Color::parse("#c0caf5").unwrap(),
        Color::Rgb {
            r: 0xc0,
            g: 0xca,
            b: 0xf5
        }
    );
    assert_eq!(
        Color::parse("#F0A").unwrap(),
        Color::Rgb {
            r: 0xff,
            g: 0x00,
            b: 0xaa
        }
    );
}

#[test]
fn parse_palette_index_and_names() {
    assert_eq!(Color::parse("007").unwrap(), Color::Ansi(7));
    assert_eq!(Color::parse("255").unwrap(), Color::Ansi(255));
    assert_eq!(Color::parse("Bright Green").unwrap(), Color::Ansi(10));
    assert_eq!(Color::parse("grey").unwrap(), Color::Ansi(8));
}

#[test]
fn parse_rejects_garbage() {
    for bad in ["#12", "#gggggg", "256", "-1", "teal-ish", ""] {
        assert_eq!(
            Color::parse(bad),
            Err(ColorParseError(bad.to_owned())),
            "{bad:?} should not parse"
        );
    }
}

#[test]
fn display_is_parseable() {
    for c in [Color::Ansi(42), Color::Rgb { r: 1, g: 2, b: 3 }] {
        assert_eq!(c.to_string().parse::<Color>().unwrap(), c);
    }
}

#[test]
fn base_slots_use_named_crossterm_colors() {
    use crossterm::style::Color as C;
    assert_eq!(Color::Ansi(1).to_crossterm_color(ColorDepth::TrueColor), C::DarkRed);
    assert_eq!(Color::Ansi(15).to_crossterm_color(ColorDepth::Color16), C::White);
    assert_eq!(
        Color::Ansi(100).to_crossterm_color(ColorDepth::Color256),
        C::AnsiValue(100)
    );
}

#[test]
fn rgb_is_downsampled_by_depth() {
    use crossterm::style::Color as C;
    let red = Color::Rgb { r: 255, g: 0, b: 0 };
    assert_eq!(
        red.to_crossterm_color(ColorDepth::TrueColor),
        C::Rgb { r: 255, g: 0, b: 0 }
    );
    assert_eq!(red.to_crossterm_color(ColorDepth::Color256), C::AnsiValue(196));
    assert_eq!(red.to_crossterm_color(ColorDepth::Color16), C::Red);
}

#[test]
fn depth_detection_from_env_values() {
    assert_eq!(ColorDepth::from_env(Some("truecolor"), None), ColorDepth::TrueColor);
    assert_eq!(
        ColorDepth::from_env(None, Some("xterm-256color")),
        ColorDepth::Color256
    );
    assert_eq!(ColorDepth::from_env(None, Some("vt100")), ColorDepth::Color16);
}

#[test]
fn theme_overrides_take_precedence() {
    let config: AppConfig = toml::from_str(
        r##"
[theme.colors.text]
primary = "#ffffff"

[theme.colors.nutrient]
danger = "196"
"##,
    )
    .unwrap();
    let theme = ResolvedTheme::resolve(&config.theme, Background::Dark);
    assert_eq!(theme.text_primary, Color::Rgb { r: 255, g: 255, b: 255 });
    assert_eq!(theme.nutrient(NutrientLevel::Danger), Color::Ansi(196));
    let defaults = ResolvedTheme::resolve(&AppConfig::default().theme, Background::Dark);
    assert_eq!(theme.text_secondary, defaults.text_secondary);
}

#[test]
fn invalid_theme_color_fails_config_parse() {
    let result: Result<AppConfig, _> = toml::from_str(
        r##"
[theme.colors.text]
primary = "not-a-color"
"##,
    );
    assert!(result.is_err());
}
