use proptest::prelude::*;
use viewport_units_buggyfill::core::css::units::parse_number_prefix;
use viewport_units_buggyfill::core::css::{contains_viewport_unit, find_viewport_units};
use viewport_units_buggyfill::core::rewriter::{format_px, rewrite_value};
use viewport_units_buggyfill::{ViewportSample, ViewportUnit};

fn unit_strategy() -> impl Strategy<Value = ViewportUnit> {
    prop_oneof![
        Just(ViewportUnit::Vh),
        Just(ViewportUnit::Vw),
        Just(ViewportUnit::Vmin),
        Just(ViewportUnit::Vmax),
    ]
}

proptest! {
    #[test]
    fn converts_to_percentage_of_dimension(
        n in -1000.0f64..1000.0,
        unit in unit_strategy(),
        width in 1.0f64..4000.0,
        height in 1.0f64..4000.0,
    ) {
        let sample = ViewportSample::new(width, height);
        let value = format!("{}{}", n, unit);

        prop_assert_eq!(rewrite_value(&value, &sample), format_px(n / 100.0 * sample.get(unit)));
    }

    #[test]
    fn values_without_units_are_untouched(value in "[a-z #%(),0-9]{0,40}") {
        prop_assume!(!contains_viewport_unit(&value));
        prop_assert_eq!(rewrite_value(&value, &ViewportSample::new(800.0, 600.0)), value);
    }
}

#[test]
fn test_surrounding_text_is_preserved() {
    let sample = ViewportSample::new(1000.0, 500.0);
    assert_eq!(
        rewrite_value("calc(100vh - 10vw) 5vmin 1vmax", &sample),
        "calc(500px - 100px) 25px 10px"
    );
}

#[test]
fn test_match_positions() {
    let matches = find_viewport_units("top: 12vh; left: -3.5vw");
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].span, 5..9);
    assert_eq!(matches[1].number, "-3.5");
    assert_eq!(matches[1].unit, ViewportUnit::Vw);
}

#[test]
fn test_lenient_numbers() {
    assert_eq!(parse_number_prefix("1.5.2"), Some(1.5));
    assert_eq!(parse_number_prefix("."), None);
    assert_eq!(rewrite_value(".vh", &ViewportSample::new(100.0, 100.0)), ".vh");
}

#[test]
fn test_negative_zero_is_plain_zero() {
    assert_eq!(rewrite_value("-0vh", &ViewportSample::new(100.0, 100.0)), "0px");
}
