use crate::{Compiler, LoopScope};
use core::bytecode::OpCode;
use core::errors::CompileError;
use core::tokens::TokenKind;
use core::values::Value;

impl<'a> Compiler<'a> {
  /// `statement* Eof`. A single declaration either compiles clean or reports
  /// and synchronizes to the next plausible statement boundary, so a single
  /// malformed statement never aborts the whole compile.
  pub(crate) fn declaration(&mut self) {
    let result = if self.matches(TokenKind::Var) { self.var_declaration() } else { self.statement() };

    if let Err(error) = result {
      self.reporter.report_compile_error(&error);
      self.synchronize();
    }
  }

  fn var_declaration(&mut self) -> Result<(), CompileError> {
    self.consume(TokenKind::Identifier, "Expected variable name.")?;
    let name = self.previous.clone();

    if self.scope_depth > 0 {
      self.declare_local(&name)?;
    }

    if self.matches(TokenKind::Equal) {
      self.expression()?;
    } else {
      self.emit_op(OpCode::Nil, name.position);
    }
    self.consume(TokenKind::Semicolon, "Expected ';' after variable declaration.")?;

    if self.scope_depth > 0 {
      self.mark_initialized();
    } else {
      let idx = self.add_constant(Value::String(name.lexeme.clone().into_boxed_str()), name.position)?;
      self.emit_op(OpCode::DefineGlobal, name.position);
      self.emit_byte(idx, name.position);
    }

    Ok(())
  }

  /// Any statement that isn't a `var` declaration — the branches of `if`,
  /// `while`, and `for` all parse through here, so a bare `var` can't appear
  /// as an unbraced branch.
  fn statement(&mut self) -> Result<(), CompileError> {
    match self.current.kind {
      TokenKind::LeftBrace => {
        self.advance();
        let position = self.previous.position;
        self.begin_scope();
        self.block()?;
        self.end_scope(position);
        Ok(())
      }
      TokenKind::If => self.if_statement(),
      TokenKind::While => self.while_statement(),
      TokenKind::For => self.for_statement(),
      TokenKind::Break => self.break_statement(),
      TokenKind::Print => self.print_statement(),
      _ => self.expression_statement(),
    }
  }

  fn block(&mut self) -> Result<(), CompileError> {
    while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
      self.declaration();
    }
    self.consume(TokenKind::RightBrace, "Expected '}' after block.")
  }

  fn if_statement(&mut self) -> Result<(), CompileError> {
    self.advance();
    let if_position = self.previous.position;
    self.consume(TokenKind::LeftParen, "Expected '(' after 'if'.")?;
    self.expression()?;
    self.consume(TokenKind::RightParen, "Expected ')' after condition.")?;

    let then_jump = self.emit_jump(OpCode::JumpIfFalse, if_position);
    self.emit_op(OpCode::Pop, if_position);
    self.statement()?;

    let else_jump = self.emit_jump(OpCode::Jump, if_position);
    self.patch_jump(then_jump)?;
    self.emit_op(OpCode::Pop, if_position);

    if self.matches(TokenKind::Else) {
      self.statement()?;
    }
    self.patch_jump(else_jump)
  }

  fn while_statement(&mut self) -> Result<(), CompileError> {
    self.advance();
    let while_position = self.previous.position;
    self.consume(TokenKind::LeftParen, "Expected '(' after 'while'.")?;

    let loop_start = self.chunk_len();
    self.expression()?;
    self.consume(TokenKind::RightParen, "Expected ')' after condition.")?;

    let exit_jump = self.emit_jump(OpCode::JumpIfFalse, while_position);
    self.emit_op(OpCode::Pop, while_position);

    self.loops.push(LoopScope { break_jumps: Vec::new(), body_depth: self.scope_depth });
    self.statement()?;
    self.emit_loop(loop_start, while_position)?;

    self.patch_jump(exit_jump)?;
    self.emit_op(OpCode::Pop, while_position);

    self.close_loop()
  }

  fn for_statement(&mut self) -> Result<(), CompileError> {
    self.advance();
    let for_position = self.previous.position;
    self.consume(TokenKind::LeftParen, "Expected '(' after 'for'.")?;
    self.begin_scope();

    if self.matches(TokenKind::Semicolon) {
      // no initializer
    } else if self.matches(TokenKind::Var) {
      self.var_declaration()?;
    } else {
      self.expression_statement()?;
    }

    let mut loop_start = self.chunk_len();
    let mut exit_jump = None;

    if !self.check(TokenKind::Semicolon) {
      self.expression()?;
      self.consume(TokenKind::Semicolon, "Expected ';' after loop condition.")?;
      exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse, for_position));
      self.emit_op(OpCode::Pop, for_position);
    } else {
      self.advance();
    }

    if !self.check(TokenKind::RightParen) {
      let body_jump = self.emit_jump(OpCode::Jump, for_position);
      let increment_start = self.chunk_len();
      self.expression()?;
      self.emit_op(OpCode::Pop, for_position);
      self.consume(TokenKind::RightParen, "Expected ')' after for clauses.")?;

      self.emit_loop(loop_start, for_position)?;
      loop_start = increment_start;
      self.patch_jump(body_jump)?;
    } else {
      self.advance();
    }

    self.loops.push(LoopScope { break_jumps: Vec::new(), body_depth: self.scope_depth });
    self.statement()?;
    self.emit_loop(loop_start, for_position)?;

    if let Some(exit_jump) = exit_jump {
      self.patch_jump(exit_jump)?;
      self.emit_op(OpCode::Pop, for_position);
    }

    self.close_loop()?;
    self.end_scope(for_position);
    Ok(())
  }

  /// Patches every `break` recorded for the loop just finished, to the
  /// instruction right after its exit `Pop`.
  fn close_loop(&mut self) -> Result<(), CompileError> {
    let loop_scope = self.loops.pop().expect("close_loop called with no active loop");
    for jump in loop_scope.break_jumps {
      self.patch_jump(jump)?;
    }
    Ok(())
  }

  fn break_statement(&mut self) -> Result<(), CompileError> {
    self.advance();
    let position = self.previous.position;

    let body_depth = match self.loops.last() {
      Some(loop_scope) => loop_scope.body_depth,
      None => return Err(CompileError::new(position, "Cannot use 'break' outside of a loop.")),
    };
    self.consume(TokenKind::Semicolon, "Expected ';' after 'break'.")?;

    // Pop every local declared since the loop body started, so the stack
    // depth at the jump target matches what the loop's own exit path leaves.
    let pop_count = self.locals.iter().rev().take_while(|local| local.depth > body_depth).count();
    for _ in 0..pop_count {
      self.emit_op(OpCode::Pop, position);
    }

    let jump = self.emit_jump(OpCode::Jump, position);
    self.loops.last_mut().unwrap().break_jumps.push(jump);
    Ok(())
  }

  fn print_statement(&mut self) -> Result<(), CompileError> {
    self.advance();
    let position = self.previous.position;
    self.expression()?;
    self.consume(TokenKind::Semicolon, "Expected ';' after value.")?;
    self.emit_op(OpCode::Print, position);
    Ok(())
  }

  fn expression_statement(&mut self) -> Result<(), CompileError> {
    let position = self.current.position;
    self.expression()?;
    self.consume(TokenKind::Semicolon, "Expected ';' after expression.")?;
    self.emit_op(OpCode::Pop, position);
    Ok(())
  }

  fn chunk_len(&self) -> usize {
    self.chunk.len()
  }

  /// Advances past the current error site until a plausible new statement
  /// boundary: just after a `;`, or at a token that starts a new statement.
  pub(crate) fn synchronize(&mut self) {
    while !self.check(TokenKind::Eof) {
      if self.previous.kind == TokenKind::Semicolon {
        return;
      }

      match self.current.kind {
        TokenKind::Var
        | TokenKind::Print
        | TokenKind::If
        | TokenKind::While
        | TokenKind::For
        | TokenKind::Return
        | TokenKind::Break
        | TokenKind::LeftBrace => return,
        _ => {}
      }

      self.advance();
    }
  }
}
