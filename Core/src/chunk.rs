use crate::tokens::Position;
use crate::values::Value;

/// The maximum number of constants a single chunk may hold (a constant index
/// is a one-byte operand).
pub const MAX_CONSTANTS: usize = 256;

/// An append-only bytecode buffer, plus its constant pool and a byte-offset
/// to source-position map.
///
/// Only the mutating methods the compiler actually needs are exposed; `patch`
/// is the one exception to "append-only", used to backfill jump operands
/// once their target is known.
#[derive(Default, Debug)]
pub struct Chunk {
  instructions: Vec<u8>,
  constants: Vec<Value>,
  /// One entry per byte in `instructions`; only the entry at an
  /// instruction-opening offset is meaningful, but indexing by raw offset
  /// keeps `position_at` a direct lookup instead of a search.
  positions: Vec<Position>,
}

impl Chunk {
  pub fn len(&self) -> usize {
    self.instructions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instructions.is_empty()
  }

  pub fn byte(&self, offset: usize) -> u8 {
    self.instructions[offset]
  }

  /// Appends a raw byte, recording `position` for this offset.
  pub fn push_byte(&mut self, byte: u8, position: Position) -> usize {
    let offset = self.instructions.len();
    self.instructions.push(byte);
    self.positions.push(position);
    offset
  }

  /// Overwrites a single, already-emitted byte (used to patch jump operands).
  pub fn patch(&mut self, offset: usize, byte: u8) {
    self.instructions[offset] = byte;
  }

  /// The source position of the token that produced the instruction opening at `offset`.
  pub fn position_at(&self, offset: usize) -> Position {
    self.positions[offset]
  }

  /// Adds `value` to the constant pool and returns its index, or `None` if
  /// the pool is already at `MAX_CONSTANTS`.
  pub fn add_constant(&mut self, value: Value) -> Option<u8> {
    if self.constants.len() >= MAX_CONSTANTS {
      return None;
    }
    self.constants.push(value);
    Some((self.constants.len() - 1) as u8)
  }

  pub fn constant(&self, idx: u8) -> &Value {
    &self.constants[idx as usize]
  }
}
