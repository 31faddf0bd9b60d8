mod expressions;
mod statements;

use core::bytecode::OpCode;
use core::chunk::Chunk;
use core::errors::{CompileError, ErrorReporter};
use core::tokens::{Position, Token, TokenKind};
use lexer::Scanner;

/// A local variable's slot record: its name (for shadow/resolution lookups)
/// and the scope depth it was declared at.
///
/// `depth == UNINITIALIZED` marks a local whose initializer is still being
/// compiled — referencing it by name in that window is a compile error
/// (the variable is "declared" but not yet "defined").
struct Local {
  name: String,
  depth: u32,
}

const UNINITIALIZED: u32 = u32::MAX;
const MAX_LOCALS: usize = 255;

/// Which kind of load a deferred pending-get will flush into.
#[derive(Clone, Copy)]
enum PendingKind {
  Global,
  Local,
}

/// The single-slot deferred-load buffer behind the pending-get trick (see
/// `Compiler::emit_op`): parsing a bare identifier doesn't emit a load
/// immediately, since the next token might turn it into a store instead.
struct PendingGet {
  kind: PendingKind,
  arg: u8,
  position: Position,
}

/// Bookkeeping for one enclosing loop: where `break` jumps get patched to,
/// and the scope depth the loop body runs at (so `break` knows how many
/// locals to pop on its way out).
struct LoopScope {
  break_jumps: Vec<usize>,
  body_depth: u32,
}

/// Single-pass compiler: parses tokens pulled lazily from a `Scanner` and
/// emits bytecode directly into a `Chunk` as it goes, with no intermediate AST.
pub struct Compiler<'a> {
  scanner: Scanner,
  previous: Token,
  current: Token,
  chunk: Chunk,
  locals: Vec<Local>,
  scope_depth: u32,
  pending_get: Option<PendingGet>,
  loops: Vec<LoopScope>,
  reporter: &'a mut ErrorReporter,
}

impl<'a> Compiler<'a> {
  fn new(source: &str, starting_line: u32, reporter: &'a mut ErrorReporter) -> Self {
    let placeholder = Token::new(TokenKind::Eof, String::new(), Position::new(starting_line, 1));
    Compiler {
      scanner: Scanner::new(source, starting_line),
      previous: placeholder.clone(),
      current: placeholder,
      chunk: Chunk::default(),
      locals: Vec::new(),
      scope_depth: 0,
      pending_get: None,
      loops: Vec::new(),
      reporter,
    }
  }

  /// Compiles `source` into a `Chunk`. Returns a chunk even when errors were
  /// reported — callers must check `reporter.error_count()` before handing
  /// the chunk to the VM.
  pub fn compile(source: &str, starting_line: u32, reporter: &'a mut ErrorReporter) -> Chunk {
    let mut compiler = Compiler::new(source, starting_line, reporter);
    compiler.advance();

    while !compiler.check(TokenKind::Eof) {
      compiler.declaration();
    }

    let end_pos = compiler.current.position;
    compiler.emit_op(OpCode::Return, end_pos);
    compiler.chunk
  }

  // -- token stream plumbing -------------------------------------------------

  /// Advances to the next non-error token, reporting any `Error` tokens the
  /// scanner produces along the way as syntax errors.
  fn advance(&mut self) {
    self.previous = std::mem::replace(&mut self.current, self.scanner.scan_token());

    while self.current.kind == TokenKind::Error {
      self.reporter.report(self.current.position, &self.current.lexeme, false);
      self.current = self.scanner.scan_token();
    }
  }

  fn check(&self, kind: TokenKind) -> bool {
    self.current.kind == kind
  }

  fn matches(&mut self, kind: TokenKind) -> bool {
    if self.check(kind) {
      self.advance();
      true
    } else {
      false
    }
  }

  fn consume(&mut self, kind: TokenKind, message: &str) -> Result<(), CompileError> {
    if self.check(kind) {
      self.advance();
      Ok(())
    } else {
      Err(CompileError::new(self.current.position, message))
    }
  }

  // -- emission ---------------------------------------------------------------

  /// Appends a byte with no pending-get flush. Only safe to call immediately
  /// after `emit_op` (for an instruction's operand byte) or from `flush_pending` itself.
  fn raw_byte(&mut self, byte: u8, position: Position) -> usize {
    self.chunk.push_byte(byte, position)
  }

  /// Flushes a deferred pending-get (if any) into its `Get*` instruction.
  fn flush_pending(&mut self) {
    if let Some(pending) = self.pending_get.take() {
      let op = match pending.kind {
        PendingKind::Global => OpCode::GetGlobal,
        PendingKind::Local => OpCode::GetLocal,
      };
      self.raw_byte(op as u8, pending.position);
      self.raw_byte(pending.arg, pending.position);
    }
  }

  /// Emits an opcode, first flushing any pending-get so its load precedes
  /// whatever this opcode is about to do with the stack.
  fn emit_op(&mut self, op: OpCode, position: Position) {
    self.flush_pending();
    self.raw_byte(op as u8, position);
  }

  /// Emits an operand byte that immediately follows an `emit_op` call.
  fn emit_byte(&mut self, byte: u8, position: Position) {
    self.raw_byte(byte, position);
  }

  /// Adds `value` to the chunk's constant pool, reporting "Too many constants
  /// in one chunk!" at `position` if the pool is full.
  fn add_constant(&mut self, value: core::values::Value, position: Position) -> Result<u8, CompileError> {
    self
      .chunk
      .add_constant(value)
      .ok_or_else(|| CompileError::new(position, "Too many constants in one chunk!"))
  }

  /// Interns `name`'s lexeme as a string constant, for `Get/Set/DefineGlobal` operands.
  fn identifier_constant(&mut self, name: &Token) -> Result<u8, CompileError> {
    self.add_constant(core::values::Value::String(name.lexeme.clone().into_boxed_str()), name.position)
  }

  /// Emits a jump opcode with a placeholder operand, returning the operand's
  /// offset so it can later be backfilled by `patch_jump`.
  fn emit_jump(&mut self, op: OpCode, position: Position) -> usize {
    self.emit_op(op, position);
    self.raw_byte(0xFF, position)
  }

  /// Backfills a placeholder jump operand with the distance from just past
  /// the operand to the current end of the chunk.
  fn patch_jump(&mut self, operand_offset: usize) -> Result<(), CompileError> {
    let distance = self.chunk.len() - (operand_offset + 1);
    if distance > u8::MAX as usize {
      return Err(CompileError::new(self.previous.position, "Jump distance too large!"));
    }
    self.chunk.patch(operand_offset, distance as u8);
    Ok(())
  }

  /// Emits a `Loop` instruction jumping back to `loop_start`.
  fn emit_loop(&mut self, loop_start: usize, position: Position) -> Result<(), CompileError> {
    self.emit_op(OpCode::Loop, position);
    let distance = self.chunk.len() + 1 - loop_start;
    if distance > u8::MAX as usize {
      return Err(CompileError::new(position, "Jump distance too large!"));
    }
    self.raw_byte(distance as u8, position);
    Ok(())
  }

  // -- scopes & locals ----------------------------------------------------------

  fn begin_scope(&mut self) {
    self.scope_depth += 1;
  }

  /// Pops (at runtime, via emitted `Pop`s) and discards (at compile time)
  /// every local declared at the scope being exited.
  fn end_scope(&mut self, position: Position) {
    self.scope_depth -= 1;
    while let Some(local) = self.locals.last() {
      if local.depth > self.scope_depth {
        self.emit_op(OpCode::Pop, position);
        self.locals.pop();
      } else {
        break;
      }
    }
  }

  /// Declares `name` as a new local in the current scope. Errors on a
  /// duplicate declaration at the same depth or on exceeding `MAX_LOCALS`.
  fn declare_local(&mut self, name: &Token) -> Result<(), CompileError> {
    for local in self.locals.iter().rev() {
      if local.depth != UNINITIALIZED && local.depth < self.scope_depth {
        break;
      }
      if local.name == name.lexeme {
        return Err(CompileError::new(
          name.position,
          format!("Variable '{}' is already declared in this scope.", name.lexeme),
        ));
      }
    }

    if self.locals.len() >= MAX_LOCALS {
      return Err(CompileError::new(name.position, "Too many locals in one function!"));
    }

    self.locals.push(Local { name: name.lexeme.clone(), depth: UNINITIALIZED });
    Ok(())
  }

  fn mark_initialized(&mut self) {
    if let Some(local) = self.locals.last_mut() {
      local.depth = self.scope_depth;
    }
  }

  /// Resolves `name` against the locals stack, most-recent first. Returns
  /// `Err` if the match is still in its own, not-yet-initialized declaration.
  fn resolve_local(&self, name: &Token) -> Result<Option<u8>, CompileError> {
    for (slot, local) in self.locals.iter().enumerate().rev() {
      if local.name == name.lexeme {
        if local.depth == UNINITIALIZED {
          return Err(CompileError::new(
            name.position,
            format!("Identifier '{}' is referenced in its own declaration.", name.lexeme),
          ));
        }
        return Ok(Some(slot as u8));
      }
    }
    Ok(None)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use core::errors::ErrorReporter;

  fn compile(source: &str) -> (Chunk, ErrorReporter) {
    let mut reporter = ErrorReporter::new().without_color();
    let chunk = Compiler::compile(source, 1, &mut reporter);
    (chunk, reporter)
  }

  #[test]
  fn position_map_covers_every_instruction_opening_offset() {
    let (chunk, reporter) = compile("var a = 1; { var b = 2; print a + b; } print a;");
    assert_eq!(reporter.error_count(), 0);
    for offset in 0..chunk.len() {
      // Must not panic: every byte, and in particular every
      // instruction-opening offset, has a recorded position.
      chunk.position_at(offset);
    }
  }

  #[test]
  fn clean_program_compiles_without_errors() {
    let (_, reporter) = compile("var a = 1; a = 2; print a;");
    assert_eq!(reporter.error_count(), 0);
  }

  #[test]
  fn assigning_to_a_non_lvalue_is_a_compile_error() {
    let (_, reporter) = compile("1 = 2;");
    assert_eq!(reporter.error_count(), 1);
  }

  #[test]
  fn assigning_to_a_parenthesized_identifier_is_a_compile_error() {
    let (_, reporter) = compile("{ var a = 1; (a) = 2; }");
    assert_eq!(reporter.error_count(), 1);
  }

  #[test]
  fn assigning_to_a_ternary_result_is_a_compile_error() {
    let (_, reporter) = compile("{ var a = 1; var b = 2; var c = 3; (a ? b : c) = 5; }");
    assert_eq!(reporter.error_count(), 1);
  }

  #[test]
  fn assigning_to_a_logical_or_result_is_a_compile_error() {
    let (_, reporter) = compile("{ var a = 1; var b = 2; a or b = 5; }");
    assert_eq!(reporter.error_count(), 1);
  }

  #[test]
  fn assigning_to_a_logical_and_result_is_a_compile_error() {
    let (_, reporter) = compile("{ var a = 1; var b = 2; a and b = 5; }");
    assert_eq!(reporter.error_count(), 1);
  }

  #[test]
  fn break_outside_a_loop_is_a_compile_error() {
    let (_, reporter) = compile("break;");
    assert_eq!(reporter.error_count(), 1);
  }

  #[test]
  fn self_referential_initializer_is_a_compile_error() {
    let (_, reporter) = compile("{ var x = x; }");
    assert_eq!(reporter.error_count(), 1);
  }

  #[test]
  fn shadowing_in_the_same_scope_is_a_compile_error() {
    let (_, reporter) = compile("{ var a = 1; var a = 2; }");
    assert_eq!(reporter.error_count(), 1);
  }

  #[test]
  fn shadowing_in_a_nested_scope_is_allowed() {
    let (_, reporter) = compile("var a = 1; { var a = 2; }");
    assert_eq!(reporter.error_count(), 0);
  }

  #[test]
  fn too_many_constants_is_a_compile_error() {
    // Each `var vN = N;` at global scope adds two constants (the literal and
    // the name), so 200 of them overflows the 256-constant pool.
    let source: String = (0..200).map(|n| format!("var v{n} = {n};")).collect();
    let (_, reporter) = compile(&source);
    assert!(reporter.error_count() > 0);
  }

  #[test]
  fn exactly_256_constants_compiles_clean() {
    // 128 declarations * 2 constants each = 256, right at the limit.
    let source: String = (0..128).map(|n| format!("var v{n} = {n};")).collect();
    let (_, reporter) = compile(&source);
    assert_eq!(reporter.error_count(), 0);
  }

  #[test]
  fn too_many_locals_is_a_compile_error() {
    let mut source = String::from("{ ");
    for n in 0..260 {
      source += &format!("var v{n} = {n}; ");
    }
    source += "}";
    let (_, reporter) = compile(&source);
    assert!(reporter.error_count() > 0);
  }

  #[test]
  fn oversized_jump_is_a_compile_error() {
    let mut source = String::from("while (false) { ");
    for _ in 0..100 {
      source += "print 1; ";
    }
    source += "}";
    let (_, reporter) = compile(&source);
    assert!(reporter.error_count() > 0);
  }
}
