use super::*;

fn run(code: &str, rule: &Rule) -> ExecutionResult {
    ScriptSandbox::default().execute(code, rule)
}

#[test]
fn variable_rule_extracts_declared_value() {
    let result = run("let x = 10;", &Rule::variable("l", "x", 10.0));
    assert!(result.success, "{}", result.message);
    assert_eq!(result.bindings.get("x"), Some(&Value::Number(10.0)));
    assert_eq!(result.fault, None);
}

#[test]
fn dialect_declarations_without_semicolons_run() {
    let result = run("var codigo = 4321", &Rule::variable("l", "codigo", 4321.0));
    assert!(result.success, "{}", result.message);
    assert_eq!(result.bindings.get("codigo"), Some(&Value::Number(4321.0)));
}

#[test]
fn assignment_to_predeclared_target_is_extracted() {
    let result = run("x = \"ready\";", &Rule::variable("l", "x", "ready"));
    assert_eq!(result.bindings.get("x"), Some(&Value::from("ready")));
}

#[test]
fn single_quoted_strings_are_extracted_as_strings() {
    let result = run("var name = 'Ada';", &Rule::variable("l", "name", "Ada"));
    assert_eq!(result.bindings.get("name"), Some(&Value::from("Ada")));
}

#[test]
fn function_rule_extracts_return_value() {
    let code = "function movePlatform() {\n  return 2;\n}";
    let result = run(code, &Rule::function("l", "movePlatform"));
    assert!(result.success, "{}", result.message);
    assert_eq!(result.bindings.get("movePlatform"), Some(&Value::Number(2.0)));
}

#[test]
fn functions_read_top_level_bindings() {
    let code = "let speed = 2;\nfunction movePlatform() {\n  return speed;\n}";
    let result = run(code, &Rule::function("l", "movePlatform"));
    assert!(result.success, "{}", result.message);
    assert_eq!(result.bindings.get("movePlatform"), Some(&Value::Number(2.0)));
}

#[test]
fn functions_call_each_other_and_themselves() {
    let code = "function total() {\n  return double(2) + 1;\n}\nfunction double(n) {\n  return n * 2;\n}";
    let result = run(code, &Rule::function("l", "total"));
    assert!(result.success, "{}", result.message);
    assert_eq!(result.bindings.get("total"), Some(&Value::Number(5.0)));

    let code = "function fact(n) {\n  if (n <= 1) { return 1; }\n  return n * fact(n - 1);\n}\nvar result = fact(4);";
    let result = run(code, &Rule::variable("l", "result", 24.0));
    assert!(result.success, "{}", result.message);
    assert_eq!(result.bindings.get("result"), Some(&Value::Number(24.0)));
}

#[test]
fn integer_division_is_numeric() {
    let result = run("let x = 7 / 2;", &Rule::variable("l", "x", 3.5));
    assert!(result.success, "{}", result.message);
    assert_eq!(result.bindings.get("x"), Some(&Value::Number(3.5)));

    let result = run("let x = 9;\nx /= 2;", &Rule::variable("l", "x", 4.5));
    assert_eq!(result.bindings.get("x"), Some(&Value::Number(4.5)));

    let result = run("let x = 8 / 2;", &Rule::variable("l", "x", 4.0));
    assert_eq!(result.bindings.get("x"), Some(&Value::Number(4.0)));
}

#[test]
fn division_by_zero_is_infinite_not_a_fault() {
    let result = run("let x = 1 / 0;", &Rule::variable("l", "x", 1.0));
    assert_eq!(result.fault, None);
    assert!(result.success, "{}", result.message);
    assert_eq!(result.bindings.get("x"), Some(&Value::Number(f64::INFINITY)));
}

#[test]
fn increment_and_decrement_statements_run() {
    let result = run("let x = 1;\nx++;", &Rule::variable("l", "x", 2.0));
    assert!(result.success, "{}", result.message);
    assert_eq!(result.bindings.get("x"), Some(&Value::Number(2.0)));

    let result = run("var lives = 3;\nlives--;\n--lives;", &Rule::variable("l", "lives", 1.0));
    assert_eq!(result.bindings.get("lives"), Some(&Value::Number(1.0)));
}

#[test]
fn compound_results_keep_their_text() {
    let result = run("let xs = [1, 2];", &Rule::variable("l", "xs", Value::Absent));
    assert_eq!(result.bindings.get("xs"), Some(&Value::from("[1, 2]")));
}

#[test]
fn unassigned_target_reports_nothing_defined() {
    let result = run("let y = 3;", &Rule::variable("l", "x", 3.0));
    assert!(!result.success);
    assert!(result.bindings.is_empty());
    assert!(result.message.contains("`x`"));
    assert_eq!(result.fault, None);
}

#[test]
fn null_target_is_dropped() {
    let result = run("var x = null;", &Rule::variable("l", "x", 1.0));
    assert!(!result.success);
    assert!(result.bindings.is_empty());
}

#[test]
fn missing_function_reports_nothing_defined() {
    let result = run("let a = 1;", &Rule::function("l", "movePlatform"));
    assert!(!result.success);
    assert!(result.message.contains("`movePlatform`"));
    assert_eq!(result.error_line, None);
}

#[test]
fn function_without_return_value_reports_nothing_defined() {
    let result = run("function jump() { let a = 1; }", &Rule::function("l", "jump"));
    assert!(!result.success);
    assert!(result.message.contains("`jump`"));
}

#[test]
fn undefined_identifier_fails_with_message_and_line() {
    let result = run("let x = y + 1;", &Rule::variable("l", "x", 1.0));
    assert!(!result.success);
    assert!(result.bindings.is_empty());
    assert!(!result.message.is_empty());
    assert!(result.fault.is_some());
    assert_eq!(result.error_line, Some(1));
}

#[test]
fn syntax_error_line_is_relative_to_submission() {
    let result = run("let x = 1;\nlet = ;", &Rule::variable("l", "x", 1.0));
    assert_eq!(result.fault, Some(FaultKind::Syntax));
    assert_eq!(result.error_line, Some(2));
    assert!(result.message.starts_with("Syntax error on line 2"));
}

#[test]
fn runtime_error_inside_function_points_into_submission() {
    let code = "function jump() {\n  throw \"broken\";\n}";
    let result = run(code, &Rule::function("l", "jump"));
    assert_eq!(result.fault, Some(FaultKind::Runtime));
    assert_eq!(result.error_line, Some(2));
    assert!(result.message.contains("broken"));
}

#[test]
fn endless_loop_is_a_timeout() {
    let result = run("let x = 0;\nwhile (true) { x += 1; }", &Rule::variable("l", "x", 1.0));
    assert!(!result.success);
    assert_eq!(result.fault, Some(FaultKind::Timeout));
    assert!(result.bindings.is_empty());
}

#[test]
fn printed_output_is_captured() {
    let result = run(
        "console.log('hello');\nlet x = 1;",
        &Rule::variable("l", "x", 1.0),
    );
    assert!(result.success);
    assert_eq!(result.output, vec!["hello".to_string()]);
}

#[test]
fn each_execution_starts_fresh() {
    let sandbox = ScriptSandbox::default();
    let first = sandbox.execute("let shared = 5;\nlet x = shared;", &Rule::variable("l", "x", 5.0));
    assert!(first.success);
    let second = sandbox.execute("let x = shared;", &Rule::variable("l", "x", 5.0));
    assert!(!second.success);
}

#[test]
fn identical_submissions_give_identical_results() {
    let rule = Rule::variable("l", "x", 3.0);
    let sandbox = ScriptSandbox::default();
    assert_eq!(
        sandbox.execute("let x = 1 + 2;", &rule),
        sandbox.execute("let x = 1 + 2;", &rule)
    );
}

#[test]
fn invalid_target_is_an_internal_fault() {
    let result = run("let x = 1;", &Rule::variable("l", "x y", 1.0));
    assert_eq!(result.fault, Some(FaultKind::Internal));
    assert!(result.bindings.is_empty());
}

#[test]
fn eval_is_not_available() {
    let result = run("let x = eval(\"1\");", &Rule::variable("l", "x", 1.0));
    assert!(!result.success);
}

#[test]
fn options_read_overrides_and_clamp_minimums() {
    let options = SandboxOptions::from_lookup(|key| match key {
        ENV_MAX_OPERATIONS => Some("10".to_string()),
        ENV_MAX_CALL_LEVELS => Some(" 16 ".to_string()),
        ENV_TIMEOUT_MS => Some("250".to_string()),
        _ => None,
    });
    assert_eq!(options.max_operations, MIN_OPERATIONS);
    assert_eq!(options.max_call_levels, 16);
    assert_eq!(options.wall_clock_budget, Some(Duration::from_millis(250)));

    let defaults = SandboxOptions::from_lookup(|_| Some("not-a-number".to_string()));
    assert_eq!(defaults, SandboxOptions::default());
}

struct FixedEvaluator {
    fault: ScriptFault,
}

impl ScriptEvaluator for FixedEvaluator {
    fn evaluate(&self, _source: &str) -> Evaluation {
        Evaluation {
            outcome: Err(self.fault.clone()),
            output: vec!["partial".to_string()],
        }
    }
}

#[test]
fn fault_lines_outside_submission_are_dropped() {
    let sandbox = ScriptSandbox::new(FixedEvaluator {
        fault: ScriptFault::new(FaultKind::Runtime, "wrapper", Some(1)),
    });
    let result = sandbox.execute("let x = 1;", &Rule::variable("l", "x", 1.0));
    assert_eq!(result.fault, Some(FaultKind::Runtime));
    assert_eq!(result.error_line, None);
    assert_eq!(result.output, vec!["partial".to_string()]);
}
