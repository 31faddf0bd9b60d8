use crate::{arithmetic, VirtualMachine};
use core::bytecode::OpCode;
use core::chunk::Chunk;
use core::errors::RuntimeError;
use core::values::Value;
use num_traits::FromPrimitive;
use std::io::Write;

impl<W: Write> VirtualMachine<W> {
  /// The fetch-decode-execute loop: one opcode byte per iteration, plus
  /// whatever operand bytes that opcode declares. Terminates at `Return`;
  /// running off the end of `chunk` without one is a logic error in the
  /// compiler, not a user-visible condition, so it panics rather than
  /// returning a `RuntimeError`.
  pub(crate) fn run(&mut self, chunk: &Chunk) -> Result<(), RuntimeError> {
    let mut ip = 0usize;

    loop {
      let offset = ip;
      let byte = self.read_byte(chunk, &mut ip);
      let op = OpCode::from_u8(byte).unwrap_or_else(|| panic!("invalid opcode byte {byte} at offset {offset}"));
      let position = chunk.position_at(offset);

      match op {
        OpCode::Constant => {
          let idx = self.read_byte(chunk, &mut ip);
          self.push(chunk.constant(idx).clone());
        }
        OpCode::Nil => self.push(Value::Nil),
        OpCode::True => self.push(Value::Bool(true)),
        OpCode::False => self.push(Value::Bool(false)),
        OpCode::Pop => {
          self.pop();
        }

        OpCode::DefineGlobal => {
          let idx = self.read_byte(chunk, &mut ip);
          let name = global_name(chunk, idx);
          let value = self.pop();
          if self.globals.contains_key(&name) {
            return Err(self.runtime_error(position, format!("Identifier '{name}' is already defined.")));
          }
          self.globals.insert(name, value);
        }
        OpCode::GetGlobal => {
          let idx = self.read_byte(chunk, &mut ip);
          let name = global_name(chunk, idx);
          match self.globals.get(&name) {
            Some(value) => self.push(value.clone()),
            None => return Err(self.runtime_error(position, format!("Identifier '{name}' is undefined."))),
          }
        }
        OpCode::SetGlobal => {
          let idx = self.read_byte(chunk, &mut ip);
          let name = global_name(chunk, idx);
          if !self.globals.contains_key(&name) {
            return Err(self.runtime_error(position, format!("Identifier '{name}' is undefined.")));
          }
          let value = self.peek(0).clone();
          self.globals.insert(name, value);
        }
        OpCode::GetLocal => {
          let slot = self.read_byte(chunk, &mut ip) as usize;
          self.push(self.stack[slot].clone());
        }
        OpCode::SetLocal => {
          let slot = self.read_byte(chunk, &mut ip) as usize;
          self.stack[slot] = self.peek(0).clone();
        }

        OpCode::Equal => self.binary(|a, b| Ok(arithmetic::equal(a, b)), position)?,
        OpCode::NotEqual => self.binary(|a, b| Ok(arithmetic::not_equal(a, b)), position)?,
        OpCode::Greater => self.binary(arithmetic::greater, position)?,
        OpCode::GreaterEqual => self.binary(arithmetic::greater_equal, position)?,
        OpCode::Less => self.binary(arithmetic::less, position)?,
        OpCode::LessEqual => self.binary(arithmetic::less_equal, position)?,
        OpCode::Add => self.binary(arithmetic::add, position)?,
        OpCode::Subtract => self.binary(arithmetic::subtract, position)?,
        OpCode::Multiply => self.binary(arithmetic::multiply, position)?,
        OpCode::Divide => self.binary(arithmetic::divide, position)?,

        OpCode::Negative => {
          let operand = self.pop();
          match arithmetic::negate(&operand) {
            Ok(value) => self.push(value),
            Err(message) => return Err(self.runtime_error(position, message)),
          }
        }
        OpCode::Not => {
          let operand = self.pop();
          self.push(arithmetic::not(&operand));
        }

        OpCode::Print => {
          let value = self.pop();
          writeln!(self.output, "{value}").expect("write to print sink failed");
        }

        OpCode::Jump => {
          let distance = self.read_byte(chunk, &mut ip) as usize;
          ip += distance;
        }
        OpCode::JumpIfTrue => {
          let distance = self.read_byte(chunk, &mut ip) as usize;
          if self.peek(0).is_truthy() {
            ip += distance;
          }
        }
        OpCode::JumpIfFalse => {
          let distance = self.read_byte(chunk, &mut ip) as usize;
          if !self.peek(0).is_truthy() {
            ip += distance;
          }
        }
        OpCode::Loop => {
          let distance = self.read_byte(chunk, &mut ip) as usize;
          ip -= distance;
        }

        OpCode::Return => return Ok(()),
      }
    }
  }

  fn read_byte(&self, chunk: &Chunk, ip: &mut usize) -> u8 {
    let byte = chunk.byte(*ip);
    *ip += 1;
    byte
  }

  /// Pops two operands (right first, so `a op b` pops in `a, b` push order),
  /// applies `op`, and pushes the result, turning an `Err` message into a
  /// positioned `RuntimeError`.
  fn binary(
    &mut self,
    op: impl Fn(&Value, &Value) -> Result<Value, String>,
    position: core::tokens::Position,
  ) -> Result<(), RuntimeError> {
    let right = self.pop();
    let left = self.pop();
    match op(&left, &right) {
      Ok(value) => {
        self.push(value);
        Ok(())
      }
      Err(message) => Err(self.runtime_error(position, message)),
    }
  }
}

/// Reads the global name out of the constant pool, defensively: the compiler
/// never emits an out-of-range index, but the VM does not trust its input
/// blindly for an operand that crosses the compile/runtime boundary.
fn global_name(chunk: &Chunk, idx: u8) -> String {
  match chunk.constant(idx) {
    Value::String(s) => s.to_string(),
    other => unreachable!("global name constant was not a string: {other:?}"),
  }
}
