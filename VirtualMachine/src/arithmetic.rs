use core::values::Value;

const NOT_A_NUMBER: &str = "Operand must be a number.";

/// `+`: string concatenation if either operand is a string (the other side is
/// stringified), otherwise both operands must be numbers.
pub(crate) fn add(left: &Value, right: &Value) -> Result<Value, String> {
  match (left, right) {
    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
    (Value::String(_), _) | (_, Value::String(_)) => Ok(Value::from(format!("{left}{right}"))),
    _ => Err(NOT_A_NUMBER.to_string()),
  }
}

pub(crate) fn subtract(left: &Value, right: &Value) -> Result<Value, String> {
  numeric_op(left, right, |a, b| a - b)
}

pub(crate) fn multiply(left: &Value, right: &Value) -> Result<Value, String> {
  numeric_op(left, right, |a, b| a * b)
}

pub(crate) fn divide(left: &Value, right: &Value) -> Result<Value, String> {
  match (left, right) {
    (Value::Number(_), Value::Number(b)) if *b == 0.0 => Err("Cannot divide by zero.".to_string()),
    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
    _ => Err(NOT_A_NUMBER.to_string()),
  }
}

pub(crate) fn negate(operand: &Value) -> Result<Value, String> {
  match operand {
    Value::Number(n) => Ok(Value::Number(-n)),
    _ => Err(NOT_A_NUMBER.to_string()),
  }
}

/// `!v`: never errors, since truthiness is defined over every `Value` kind.
pub(crate) fn not(operand: &Value) -> Value {
  Value::Bool(!operand.is_truthy())
}

pub(crate) fn equal(left: &Value, right: &Value) -> Value {
  Value::Bool(left == right)
}

pub(crate) fn not_equal(left: &Value, right: &Value) -> Value {
  Value::Bool(left != right)
}

/// Ordering comparisons accept two numbers (numeric order) or two strings
/// (lexicographic order); any other pairing is a type error.
pub(crate) fn less(left: &Value, right: &Value) -> Result<Value, String> {
  ordering_op(left, right, |o| o.is_lt())
}

pub(crate) fn less_equal(left: &Value, right: &Value) -> Result<Value, String> {
  ordering_op(left, right, |o| o.is_le())
}

pub(crate) fn greater(left: &Value, right: &Value) -> Result<Value, String> {
  ordering_op(left, right, |o| o.is_gt())
}

pub(crate) fn greater_equal(left: &Value, right: &Value) -> Result<Value, String> {
  ordering_op(left, right, |o| o.is_ge())
}

fn numeric_op(left: &Value, right: &Value, op: impl Fn(f64, f64) -> f64) -> Result<Value, String> {
  match (left, right) {
    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(op(*a, *b))),
    _ => Err(NOT_A_NUMBER.to_string()),
  }
}

fn ordering_op(left: &Value, right: &Value, accept: impl Fn(std::cmp::Ordering) -> bool) -> Result<Value, String> {
  match (left, right) {
    (Value::Number(a), Value::Number(b)) => match a.partial_cmp(b) {
      Some(ordering) => Ok(Value::Bool(accept(ordering))),
      // NaN compares unordered with everything, including itself; no Lox
      // ordering operator holds in that case.
      None => Ok(Value::Bool(false)),
    },
    (Value::String(a), Value::String(b)) => Ok(Value::Bool(accept(a.cmp(b)))),
    _ => Err(NOT_A_NUMBER.to_string()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn add_concatenates_when_either_side_is_a_string() {
    let result = add(&Value::from("hi".to_string()), &Value::Number(2.0)).unwrap();
    assert_eq!(result, Value::from("hi2".to_string()));
  }

  #[test]
  fn add_requires_numbers_without_a_string_operand() {
    assert!(add(&Value::Bool(true), &Value::Number(1.0)).is_err());
  }

  #[test]
  fn divide_by_zero_errors() {
    assert!(divide(&Value::Number(1.0), &Value::Number(0.0)).is_err());
  }

  #[test]
  fn string_ordering_is_lexicographic() {
    let result = less(&Value::from("apple".to_string()), &Value::from("banana".to_string())).unwrap();
    assert_eq!(result, Value::Bool(true));
  }

  #[test]
  fn nan_ordering_is_always_false() {
    let nan = Value::Number(f64::NAN);
    assert_eq!(less(&nan, &Value::Number(1.0)).unwrap(), Value::Bool(false));
    assert_eq!(greater_equal(&nan, &Value::Number(1.0)).unwrap(), Value::Bool(false));
  }
}
