use crate::{Compiler, PendingGet, PendingKind};
use core::bytecode::OpCode;
use core::errors::CompileError;
use core::tokens::{Token, TokenKind};
use core::values::Value;

/// One function per precedence level, lowest to highest — a ladder rather
/// than a table-driven Pratt parser. Each level parses its own operators and
/// delegates to the next-higher level for operands.
impl<'a> Compiler<'a> {
  pub(crate) fn expression(&mut self) -> Result<(), CompileError> {
    self.assignment()
  }

  fn assignment(&mut self) -> Result<(), CompileError> {
    self.ternary()?;

    if self.check(TokenKind::Equal) {
      self.advance();
      let eq_position = self.previous.position;

      match self.pending_get.take() {
        Some(pending) => {
          self.assignment()?;
          let op = match pending.kind {
            PendingKind::Global => OpCode::SetGlobal,
            PendingKind::Local => OpCode::SetLocal,
          };
          self.emit_op(op, eq_position);
          self.emit_byte(pending.arg, eq_position);
        }
        None => return Err(CompileError::new(eq_position, "Invalid left-hand side of assignment.")),
      }
    }

    Ok(())
  }

  /// `c ? a : b`, compiled exactly like `if (c) a else b` but as an expression.
  fn ternary(&mut self) -> Result<(), CompileError> {
    self.logical_or()?;

    if self.check(TokenKind::Question) {
      self.advance();
      let q_position = self.previous.position;

      let then_jump = self.emit_jump(OpCode::JumpIfFalse, q_position);
      self.emit_op(OpCode::Pop, q_position);
      self.assignment()?;

      let else_jump = self.emit_jump(OpCode::Jump, q_position);
      self.patch_jump(then_jump)?;
      self.emit_op(OpCode::Pop, q_position);

      self.consume(TokenKind::Colon, "Expected ':' in ternary expression.")?;
      self.assignment()?;
      // The false branch may itself be a bare identifier with its load still
      // deferred; the ternary as a whole is not an lvalue, so flush it now
      // rather than let it leak out as a false pending-get on the result.
      self.flush_pending();
      self.patch_jump(else_jump)?;
    }

    Ok(())
  }

  fn logical_or(&mut self) -> Result<(), CompileError> {
    self.logical_and()?;

    while self.check(TokenKind::Or) {
      self.advance();
      let position = self.previous.position;
      let end_jump = self.emit_jump(OpCode::JumpIfTrue, position);
      self.emit_op(OpCode::Pop, position);
      self.logical_and()?;
      // Same reasoning as the ternary: once combined with `or`, the right
      // operand's deferred load is no longer a candidate lvalue.
      self.flush_pending();
      self.patch_jump(end_jump)?;
    }

    Ok(())
  }

  fn logical_and(&mut self) -> Result<(), CompileError> {
    self.equality()?;

    while self.check(TokenKind::And) {
      self.advance();
      let position = self.previous.position;
      let end_jump = self.emit_jump(OpCode::JumpIfFalse, position);
      self.emit_op(OpCode::Pop, position);
      self.equality()?;
      self.flush_pending();
      self.patch_jump(end_jump)?;
    }

    Ok(())
  }

  fn equality(&mut self) -> Result<(), CompileError> {
    self.comparison()?;

    loop {
      let op = match self.current.kind {
        TokenKind::EqualEqual => OpCode::Equal,
        TokenKind::BangEqual => OpCode::NotEqual,
        _ => break,
      };
      self.advance();
      let position = self.previous.position;
      self.comparison()?;
      self.emit_op(op, position);
    }

    Ok(())
  }

  fn comparison(&mut self) -> Result<(), CompileError> {
    self.additive()?;

    loop {
      let op = match self.current.kind {
        TokenKind::Less => OpCode::Less,
        TokenKind::LessEqual => OpCode::LessEqual,
        TokenKind::Greater => OpCode::Greater,
        TokenKind::GreaterEqual => OpCode::GreaterEqual,
        _ => break,
      };
      self.advance();
      let position = self.previous.position;
      self.additive()?;
      self.emit_op(op, position);
    }

    Ok(())
  }

  fn additive(&mut self) -> Result<(), CompileError> {
    self.multiplicative()?;

    loop {
      let op = match self.current.kind {
        TokenKind::Plus => OpCode::Add,
        TokenKind::Minus => OpCode::Subtract,
        _ => break,
      };
      self.advance();
      let position = self.previous.position;
      self.multiplicative()?;
      self.emit_op(op, position);
    }

    Ok(())
  }

  fn multiplicative(&mut self) -> Result<(), CompileError> {
    self.unary()?;

    loop {
      let op = match self.current.kind {
        TokenKind::Star => OpCode::Multiply,
        TokenKind::Slash => OpCode::Divide,
        _ => break,
      };
      self.advance();
      let position = self.previous.position;
      self.unary()?;
      self.emit_op(op, position);
    }

    Ok(())
  }

  fn unary(&mut self) -> Result<(), CompileError> {
    match self.current.kind {
      TokenKind::Minus | TokenKind::Bang => {
        self.advance();
        let op_token = self.previous.clone();
        self.unary()?;
        let op = if op_token.kind == TokenKind::Minus { OpCode::Negative } else { OpCode::Not };
        self.emit_op(op, op_token.position);
        Ok(())
      }
      _ => self.primary(),
    }
  }

  fn primary(&mut self) -> Result<(), CompileError> {
    match self.current.kind {
      TokenKind::Number => {
        let position = self.current.position;
        let lexeme = self.current.lexeme.clone();
        self.advance();
        let value: f64 = lexeme
          .parse()
          .map_err(|_| CompileError::new(position, "Invalid number literal."))?;
        let idx = self.add_constant(Value::Number(value), position)?;
        self.emit_op(OpCode::Constant, position);
        self.emit_byte(idx, position);
      }
      TokenKind::String => {
        let position = self.current.position;
        let raw = self.current.lexeme.clone();
        self.advance();
        // The lexeme includes the surrounding quotes; the compiler strips them.
        let unquoted = &raw[1..raw.len() - 1];
        let idx = self.add_constant(Value::String(unquoted.into()), position)?;
        self.emit_op(OpCode::Constant, position);
        self.emit_byte(idx, position);
      }
      TokenKind::Nil => {
        let position = self.current.position;
        self.advance();
        self.emit_op(OpCode::Nil, position);
      }
      TokenKind::True => {
        let position = self.current.position;
        self.advance();
        self.emit_op(OpCode::True, position);
      }
      TokenKind::False => {
        let position = self.current.position;
        self.advance();
        self.emit_op(OpCode::False, position);
      }
      TokenKind::Identifier => {
        self.advance();
        let name = self.previous.clone();
        self.resolve_variable(&name)?;
      }
      TokenKind::LeftParen => {
        self.advance();
        self.expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after expression.")?;
        // A parenthesized expression is never itself an lvalue, even when it
        // wraps a single bare identifier, so flush rather than let its
        // pending-get pass through as one.
        self.flush_pending();
      }
      _ => return Err(CompileError::new(self.current.position, "Expected expression.")),
    }

    Ok(())
  }

  /// Resolves `name` to a local slot or a global constant and stashes the
  /// deferred load as a pending-get rather than emitting it immediately.
  fn resolve_variable(&mut self, name: &Token) -> Result<(), CompileError> {
    // A binary operator's left operand may still have its own load deferred
    // (e.g. `a + b`: `a`'s pending-get is otherwise only flushed by the `+`
    // itself, after `b`'s resolve_variable would already have clobbered it).
    self.flush_pending();

    let pending = match self.resolve_local(name)? {
      Some(slot) => PendingGet { kind: PendingKind::Local, arg: slot, position: name.position },
      None => {
        let idx = self.identifier_constant(name)?;
        PendingGet { kind: PendingKind::Global, arg: idx, position: name.position }
      }
    };
    self.pending_get = Some(pending);
    Ok(())
  }
}
