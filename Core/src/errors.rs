use crate::tokens::Position;
use std::fmt;

const RED: &str = "\x1b[31m";
const GREY: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// A static (syntax) error surfaced by the scanner or compiler.
///
/// Carries enough to report itself, and propagates with `?` through the
/// compiler's recursive-descent functions up to the per-statement boundary
/// where `synchronize` runs.
#[derive(Debug, Clone)]
pub struct CompileError {
  pub position: Position,
  pub message: String,
}

impl CompileError {
  pub fn new(position: Position, message: impl Into<String>) -> Self {
    CompileError { position, message: message.into() }
  }
}

impl fmt::Display for CompileError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.message)
  }
}

/// A dynamic (runtime) error raised by the VM.
#[derive(Debug, Clone)]
pub struct RuntimeError {
  pub position: Position,
  pub message: String,
}

impl RuntimeError {
  pub fn new(position: Position, message: impl Into<String>) -> Self {
    RuntimeError { position, message: message.into() }
  }
}

impl fmt::Display for RuntimeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.message)
  }
}

/// Accumulates and prints diagnostics, distinguishing syntax errors from
/// runtime errors. Colour output can be switched off for environments that
/// don't want raw escape codes in their output (piped logs, `NO_COLOR`).
pub struct ErrorReporter {
  error_count: u32,
  color: bool,
}

impl Default for ErrorReporter {
  fn default() -> Self {
    ErrorReporter { error_count: 0, color: true }
  }
}

impl ErrorReporter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Disables ANSI colour codes around the error label.
  pub fn without_color(mut self) -> Self {
    self.color = false;
    self
  }

  pub fn error_count(&self) -> u32 {
    self.error_count
  }

  /// Zeroes the error count. Called at the start of every `interpret` call.
  pub fn reset(&mut self) {
    self.error_count = 0;
  }

  pub fn report(&mut self, position: Position, message: &str, is_dynamic: bool) {
    self.error_count += 1;
    let stage = if is_dynamic { "runtime" } else { "syntax" };

    if self.color {
      eprintln!(
        "{RED}{stage:>7} error{RESET}  {message}{GREY} ({}:{}){RESET}",
        position.line, position.column
      );
    } else {
      eprintln!("{stage:>7} error  {message} ({}:{})", position.line, position.column);
    }
  }

  pub fn report_compile_error(&mut self, error: &CompileError) {
    self.report(error.position, &error.message, false);
  }

  pub fn report_runtime_error(&mut self, error: &RuntimeError) {
    self.report(error.position, &error.message, true);
  }

  /// Prints `"N error(s) identified."` to standard error.
  pub fn display_error_count(&self) {
    let suffix = if self.error_count == 1 { "" } else { "s" };
    eprintln!("{} error{suffix} identified.", self.error_count);
  }
}
