use viewport_units_buggyfill::core::css::{CSSParser, CssRule, MediaEnvironment, MediaQueryList};
use viewport_units_buggyfill::StyleSheet;

#[test]
fn test_realistic_stylesheet() {
    let css = r#"
        /* layout */
        html, body { margin: 0; height: 100% }
        .hero { min-height: 100vh; background: url("hero.png") no-repeat }
        @media screen and (max-width: 600px) {
            .hero { min-height: 60vh !important }
            @media (orientation: landscape) { .hero h1 { font-size: 8vmin } }
        }
        @-webkit-keyframes pulse { 0% { top: 0 } 100% { top: 10vh } }
        @font-face { font-family: x; src: url(x.woff) }
    "#;

    let rules = CSSParser::new().parse(css);
    assert_eq!(rules.len(), 5);

    let CssRule::Media(media) = &rules[2] else {
        panic!("expected media rule, got {:?}", rules[2]);
    };
    assert_eq!(media.media_text, "screen and (max-width: 600px)");
    assert_eq!(media.rules.len(), 2);
    assert!(matches!(&media.rules[1], CssRule::Media(inner) if inner.media_text == "(orientation: landscape)"));

    let declarations = media.rules[0].declarations().unwrap();
    assert_eq!(declarations[0].value, "60vh");
    assert!(declarations[0].important);

    assert!(matches!(&rules[3], CssRule::Keyframes(k) if k.name == "pulse"));
    assert!(matches!(&rules[4], CssRule::Opaque(r) if r.at_keyword == "font-face"));
}

#[test]
fn test_stylesheet_serializes_to_json() {
    let sheet = StyleSheet::parse("a { top: 1vh }").with_owner_id("main");
    let json = serde_json::to_value(&sheet).unwrap();

    assert_eq!(json["owner_id"], "main");
    assert_eq!(json["rules"][0]["Style"]["selector_text"], "a");
    assert_eq!(json["rules"][0]["Style"]["declarations"][0]["value"], "1vh");
}

#[test]
fn test_inaccessible_sheet_has_no_rules() {
    assert!(StyleSheet::inaccessible().rules.is_none());
}

#[test]
fn test_media_query_lists() {
    let wide = MediaEnvironment::screen(1200.0, 800.0);
    let narrow = MediaEnvironment::screen(400.0, 800.0);

    let list = MediaQueryList::parse("print, screen and (min-width: 1000px)");
    assert!(list.matches(&wide));
    assert!(!list.matches(&narrow));

    assert!(MediaQueryList::parse("(orientation: portrait)").matches(&narrow));
    assert!(MediaQueryList::parse("not print").matches(&narrow));
    assert!(!MediaQueryList::parse("(unknown-feature: 1)").matches(&wide));
}
