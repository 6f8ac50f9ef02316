use cq_core::Value;
use rhai::{Dynamic, ImmutableString, FLOAT, INT};

/// Converts an evaluator result into the closed value model. Unit maps to
/// `Absent`; anything outside the scalar types keeps its display text.
pub(crate) fn dynamic_to_value(value: Dynamic) -> Value {
    let value = value.flatten();
    if value.is_unit() {
        return Value::Absent;
    }
    if value.is::<bool>() {
        return Value::Boolean(value.cast::<bool>());
    }
    if value.is::<INT>() {
        return Value::Number(value.cast::<INT>() as f64);
    }
    if value.is::<FLOAT>() {
        return Value::Number(value.cast::<FLOAT>());
    }
    if value.is::<ImmutableString>() {
        return Value::String(value.cast::<ImmutableString>().to_string());
    }
    if value.is::<char>() {
        return Value::String(value.cast::<char>().to_string());
    }
    Value::String(value.to_string())
}
