use num_derive::FromPrimitive;

/// The set of instructions supported by the virtual machine.
///
/// **NOTE:** Changing the order in which members are declared creates
/// incompatibilities between different versions of the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum OpCode {
  Constant,
  Nil,
  True,
  False,
  Pop,

  DefineGlobal,
  GetGlobal,
  SetGlobal,
  GetLocal,
  SetLocal,

  Equal,
  NotEqual,
  Greater,
  GreaterEqual,
  Less,
  LessEqual,

  Add,
  Subtract,
  Multiply,
  Divide,
  Negative,
  Not,

  Print,

  Jump,
  JumpIfTrue,
  JumpIfFalse,
  Loop,

  Return,
}
