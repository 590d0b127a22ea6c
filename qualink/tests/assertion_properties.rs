//! Property-based tests for the assertion algebra.
//!
//! Assertions must agree with their mathematical definitions for every
//! finite metric, and their rendered labels must parse back into the same
//! assertion so configs and reports stay interchangeable.

use proptest::prelude::*;
use qualink::constraints::Assertion;

fn finite() -> impl Strategy<Value = f64> {
    -1.0e9..1.0e9f64
}

proptest! {
    #[test]
    fn between_is_inclusive(lower in finite(), width in 0.0..1.0e6f64, metric in finite()) {
        let upper = lower + width;
        let assertion = Assertion::between(lower, upper);
        prop_assert_eq!(
            assertion.evaluate(metric).unwrap(),
            lower <= metric && metric <= upper
        );
        prop_assert!(assertion.evaluate(lower).unwrap());
        prop_assert!(assertion.evaluate(upper).unwrap());
    }

    #[test]
    fn reversed_between_never_matches(lower in finite(), gap in 1.0..1.0e6f64, metric in finite()) {
        let assertion = Assertion::between(lower + gap, lower);
        prop_assert!(!assertion.evaluate(metric).unwrap());
    }

    #[test]
    fn comparisons_partition_the_line(bound in finite(), metric in finite()) {
        let gt = Assertion::greater_than(bound).evaluate(metric).unwrap();
        let eq = Assertion::equal_to(bound).evaluate(metric).unwrap();
        let lt = Assertion::less_than(bound).evaluate(metric).unwrap();

        prop_assert_eq!(u8::from(gt) + u8::from(eq) + u8::from(lt), 1);
        prop_assert_eq!(Assertion::greater_than_or_equal(bound).evaluate(metric).unwrap(), gt || eq);
        prop_assert_eq!(Assertion::less_than_or_equal(bound).evaluate(metric).unwrap(), lt || eq);
    }

    #[test]
    fn comparison_labels_parse_back(bound in finite(), kind in 0usize..5) {
        let assertion = match kind {
            0 => Assertion::greater_than(bound),
            1 => Assertion::greater_than_or_equal(bound),
            2 => Assertion::less_than(bound),
            3 => Assertion::less_than_or_equal(bound),
            _ => Assertion::equal_to(bound),
        };
        let parsed: Assertion = assertion.label().parse().unwrap();
        prop_assert_eq!(parsed, assertion);
    }

    #[test]
    fn between_shorthand_parses(lower in finite(), upper in finite()) {
        let parsed: Assertion = format!("between {lower:?} {upper:?}").parse().unwrap();
        prop_assert_eq!(parsed, Assertion::between(lower, upper));
    }

    #[test]
    fn custom_predicates_are_evaluated(threshold in finite(), metric in finite()) {
        let assertion = Assertion::custom(move |v| v > threshold, "above threshold");
        prop_assert_eq!(assertion.evaluate(metric).unwrap(), metric > threshold);
        prop_assert_eq!(assertion.label(), "above threshold");
    }
}

#[test]
fn deserialized_custom_assertion_fails_to_evaluate() {
    let custom = Assertion::custom(|v| v > 0.0, "positive");
    let json = serde_json::to_string(&custom).unwrap();
    let back: Assertion = serde_json::from_str(&json).unwrap();

    assert_eq!(back.label(), "positive");
    let err = back.evaluate(1.0).unwrap_err();
    assert!(err.is_configuration());
}
