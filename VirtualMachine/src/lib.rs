mod arithmetic;
mod run;

use core::errors::{ErrorReporter, RuntimeError};
use core::tokens::Position;
use core::values::Value;
use hashbrown::HashMap;
use std::io;
use std::io::{Stdout, Write};

/// The outcome of one `interpret` call.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InterpretResult {
  Ok,
  StaticError,
  DynamicError,
}

/// A fetch-decode-execute stack machine over a `compiler::Compiler`-produced `Chunk`.
///
/// A single instance owns the globals map and error reporter across calls, so
/// a REPL session that keeps calling `interpret` on the same `VirtualMachine`
/// accumulates global definitions the way `run_prompt` expects. `W` is the sink
/// `Print` writes to; it defaults to real stdout but can be swapped for an
/// in-memory buffer in tests.
pub struct VirtualMachine<W: Write = Stdout> {
  stack: Vec<Value>,
  globals: HashMap<String, Value>,
  reporter: ErrorReporter,
  output: W,
}

impl VirtualMachine<Stdout> {
  pub fn new() -> Self {
    VirtualMachine {
      stack: Vec::new(),
      globals: HashMap::new(),
      reporter: ErrorReporter::new(),
      output: io::stdout(),
    }
  }
}

impl Default for VirtualMachine<Stdout> {
  fn default() -> Self {
    Self::new()
  }
}

impl<W: Write> VirtualMachine<W> {
  /// Builds a `VirtualMachine` that writes `Print` output to `output` instead
  /// of real stdout, for tests that need to assert on what was printed.
  pub fn with_output(output: W) -> Self {
    VirtualMachine { stack: Vec::new(), globals: HashMap::new(), reporter: ErrorReporter::new(), output }
  }

  pub fn without_color(mut self) -> Self {
    self.reporter = ErrorReporter::new().without_color();
    self
  }

  /// Compiles and executes `source`. Resets the error reporter first, so
  /// counts from a previous call never leak into this one.
  pub fn interpret(&mut self, source: &str, starting_line: u32) -> InterpretResult {
    self.reporter.reset();

    let chunk = compiler::Compiler::compile(source, starting_line, &mut self.reporter);

    if self.reporter.error_count() > 0 {
      self.reporter.display_error_count();
      return InterpretResult::StaticError;
    }

    match self.run(&chunk) {
      Ok(()) => InterpretResult::Ok,
      Err(error) => {
        self.reporter.report_runtime_error(&error);
        self.reporter.display_error_count();
        self.stack.clear();
        InterpretResult::DynamicError
      }
    }
  }

  fn push(&mut self, value: Value) {
    self.stack.push(value);
  }

  /// Pops the top of the stack. Panics on underflow: a well-formed chunk
  /// never pops more than it has pushed, so this is a logic error, not a
  /// user-visible one.
  fn pop(&mut self) -> Value {
    self.stack.pop().expect("value stack underflow")
  }

  fn peek(&self, distance_from_top: usize) -> &Value {
    let len = self.stack.len();
    &self.stack[len - 1 - distance_from_top]
  }

  fn runtime_error(&self, position: Position, message: impl Into<String>) -> RuntimeError {
    RuntimeError::new(position, message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn run_capture(source: &str) -> (InterpretResult, String) {
    let mut vm = VirtualMachine::with_output(Vec::new()).without_color();
    let result = vm.interpret(source, 1);
    (result, String::from_utf8(vm.output).unwrap())
  }

  #[test]
  fn arithmetic_precedence() {
    let (result, out) = run_capture("print 1 + 2 * 3;");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "7\n");
  }

  #[test]
  fn string_number_concatenation() {
    let (result, out) = run_capture(r#"var a = "hi"; var b = 2; print a + b;"#);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "hi2\n");
  }

  #[test]
  fn binary_op_with_two_bare_identifier_operands() {
    let (result, out) = run_capture("var a = 2; var b = 3; print a + b; print a < b; print a == b;");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "5\ntrue\nfalse\n");
  }

  #[test]
  fn locals_as_both_operands_of_a_comparison() {
    let (result, out) = run_capture("{ var a = 1; var b = 2; print a * b - a; }");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "1\n");
  }

  #[test]
  fn block_scoped_shadowing() {
    let (result, out) = run_capture("var a = 1; { var a = 2; print a; } print a;");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "2\n1\n");
  }

  #[test]
  fn while_loop() {
    let (result, out) = run_capture("var i = 0; while (i < 3) { print i; i = i + 1; }");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "0\n1\n2\n");
  }

  #[test]
  fn division_by_zero_is_dynamic_error() {
    let (result, out) = run_capture("print 1 / 0;");
    assert_eq!(result, InterpretResult::DynamicError);
    assert_eq!(out, "");
  }

  #[test]
  fn self_referential_initializer_is_static_error() {
    let (result, _) = run_capture("{ var x = x; }");
    assert_eq!(result, InterpretResult::StaticError);
  }

  #[test]
  fn for_loop_with_break() {
    let (result, out) = run_capture("for (var i = 0; i < 5; i = i + 1) { if (i == 3) break; print i; }");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "0\n1\n2\n");
  }

  #[test]
  fn nil_and_false_are_distinct() {
    let (result, out) = run_capture("print nil == false;");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "false\n");
  }

  #[test]
  fn nan_is_never_equal_to_itself() {
    let nan = Value::Number(f64::NAN);
    assert_ne!(nan, Value::Number(f64::NAN));
  }

  #[test]
  fn undefined_global_is_dynamic_error() {
    let (result, _) = run_capture("print undefined_name;");
    assert_eq!(result, InterpretResult::DynamicError);
  }

  #[test]
  fn redefining_a_global_is_dynamic_error() {
    let (result, _) = run_capture("var a = 1; var a = 2;");
    assert_eq!(result, InterpretResult::DynamicError);
  }

  #[test]
  fn repl_session_accumulates_globals() {
    let mut vm = VirtualMachine::with_output(Vec::new()).without_color();
    assert_eq!(vm.interpret("var a = 1;", 1), InterpretResult::Ok);
    assert_eq!(vm.interpret("print a;", 2), InterpretResult::Ok);
    assert_eq!(String::from_utf8(vm.output).unwrap(), "1\n");
  }

  #[test]
  fn value_stack_empty_after_ok() {
    let mut vm = VirtualMachine::with_output(Vec::new()).without_color();
    assert_eq!(vm.interpret("1 + 2; print 3;", 1), InterpretResult::Ok);
    assert!(vm.stack.is_empty());
  }

  #[test]
  fn stack_cleared_after_dynamic_error() {
    let mut vm = VirtualMachine::with_output(Vec::new()).without_color();
    assert_eq!(vm.interpret("print 1 / 0;", 1), InterpretResult::DynamicError);
    assert!(vm.stack.is_empty());
  }

  #[test]
  fn ternary_and_short_circuit() {
    let (result, out) = run_capture("print true ? 1 : 2; print false or 3; print nil and 4;");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "1\n3\nnil\n");
  }
}
