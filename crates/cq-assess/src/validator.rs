use cq_core::{format_number, Bindings, Rule, RuleKind, Value};

pub const NUMERIC_TOLERANCE: f64 = 1e-4;

/// Numbers compare within `NUMERIC_TOLERANCE`; every other pairing needs the
/// same tag and the same value.
pub fn values_match(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(actual), Value::Number(expected)) => {
            (actual - expected).abs() < NUMERIC_TOLERANCE
        }
        _ => actual == expected,
    }
}

/// Decides whether extracted bindings satisfy a rule. Callers only pass
/// bindings from a successful execution.
pub fn validate(rule: &Rule, bindings: &Bindings) -> bool {
    let Some(actual) = bindings.get(&rule.required_name) else {
        return false;
    };

    match rule.kind {
        RuleKind::Variable => values_match(actual, &rule.expected_value),
        RuleKind::Function => {
            if !rule.expected_return.is_absent() {
                return values_match(actual, &rule.expected_return);
            }
            if rule.valid_patterns.is_empty() {
                return true;
            }
            actual
                .as_number()
                .filter(|number| number.is_finite())
                .map(|number| rule.valid_patterns.contains(&(number.trunc() as i64)))
                .unwrap_or(false)
        }
    }
}

pub fn error_message(rule: &Rule, attempted: &Value) -> String {
    if !rule.patterns_govern() || attempted.is_absent() {
        return "Result does not meet the lesson's requirements.".to_string();
    }

    let accepted = rule
        .valid_patterns
        .iter()
        .map(|pattern| pattern.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let shown = match attempted.as_number() {
        Some(number) if number.is_finite() => format_number(number.trunc()),
        _ => format!("\"{}\"", attempted),
    };
    format!("Pattern {} is not valid. Accepted patterns: {}", shown, accepted)
}

#[cfg(test)]
mod validator_tests {
    use super::*;

    fn bindings(name: &str, value: impl Into<Value>) -> Bindings {
        let mut bindings = Bindings::new();
        bindings.insert(name.to_string(), value.into());
        bindings
    }

    #[test]
    fn numeric_equality_is_tolerant_and_strict_at_the_boundary() {
        assert!(values_match(&Value::Number(10.0), &Value::Number(10.00001)));
        assert!(values_match(&Value::Number(10.0), &Value::Number(10.0 + 0.5e-4)));
        assert!(!values_match(&Value::Number(10.0), &Value::Number(10.0002)));
        assert!(!values_match(&Value::Number(10.0), &Value::Number(11.0)));
    }

    #[test]
    fn cross_type_values_are_unequal() {
        assert!(!values_match(&Value::from("10"), &Value::Number(10.0)));
        assert!(!values_match(&Value::Boolean(true), &Value::Number(1.0)));
        assert!(values_match(&Value::from("abc"), &Value::from("abc")));
    }

    #[test]
    fn variable_rule_compares_expected_value() {
        let found = bindings("x", 10.0);
        assert!(validate(&Rule::variable("l", "x", 10.0), &found));
        assert!(validate(&Rule::variable("l", "x", 10.00001), &found));
        assert!(!validate(&Rule::variable("l", "x", 11.0), &found));
        assert!(!validate(&Rule::variable("l", "y", 10.0), &found));
    }

    #[test]
    fn variable_rule_without_expected_value_never_passes() {
        assert!(!validate(
            &Rule::variable("l", "x", Value::Absent),
            &bindings("x", 1.0)
        ));
    }

    #[test]
    fn patterns_decide_when_no_expected_return() {
        let rule = Rule::function("l", "move").with_patterns([1, 2, 3]);
        assert!(!validate(&rule, &bindings("move", 4.0)));
        assert!(validate(&rule, &bindings("move", 2.0)));
        assert!(validate(&rule, &bindings("move", 2.9)));
        assert!(!validate(&rule, &bindings("move", "2")));
    }

    #[test]
    fn expected_return_overrides_patterns() {
        let rule = Rule::function("l", "move")
            .with_patterns([1, 2, 3])
            .with_expected_return(4.0);
        assert!(validate(&rule, &bindings("move", 4.0)));
        assert!(!validate(&rule, &bindings("move", 2.0)));
    }

    #[test]
    fn function_rule_without_expectations_only_needs_a_result() {
        let rule = Rule::function("l", "go");
        assert!(validate(&rule, &bindings("go", "anything")));
        assert!(!validate(&rule, &Bindings::new()));
    }

    #[test]
    fn error_message_lists_patterns_when_they_govern() {
        let rule = Rule::function("l", "move").with_patterns([3, 1, 2]);
        assert_eq!(
            error_message(&rule, &Value::Number(4.0)),
            "Pattern 4 is not valid. Accepted patterns: 1, 2, 3"
        );
        assert_eq!(
            error_message(&rule, &Value::from("up")),
            "Pattern \"up\" is not valid. Accepted patterns: 1, 2, 3"
        );
    }

    #[test]
    fn error_message_is_generic_otherwise() {
        let generic = "Result does not meet the lesson's requirements.";
        assert_eq!(
            error_message(&Rule::variable("l", "x", 1.0), &Value::Number(2.0)),
            generic
        );
        let rule = Rule::function("l", "move")
            .with_patterns([1])
            .with_expected_return(1.0);
        assert_eq!(error_message(&rule, &Value::Number(2.0)), generic);
        let rule = Rule::function("l", "move").with_patterns([1]);
        assert_eq!(error_message(&rule, &Value::Absent), generic);
    }
}
