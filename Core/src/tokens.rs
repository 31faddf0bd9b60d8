use std::fmt::{Debug, Formatter};

/// The kind of a scanned token.
///
/// `Eof` and `Error` are synthetic: they never appear in source text but are
/// produced by the scanner to signal end-of-input and lexical errors respectively.
/// `Error`'s diagnostic message is carried in the token's `lexeme`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
  // Single-character tokens.
  LeftParen,
  RightParen,
  LeftBrace,
  RightBrace,
  Comma,
  Dot,
  Minus,
  Plus,
  Semicolon,
  Slash,
  Star,
  Question,
  Colon,

  // One or two character tokens.
  Bang,
  BangEqual,
  Equal,
  EqualEqual,
  Greater,
  GreaterEqual,
  Less,
  LessEqual,

  // Literals.
  Identifier,
  String,
  Number,

  // Keywords.
  And,
  Or,
  If,
  Else,
  While,
  For,
  Var,
  Print,
  Break,
  Nil,
  True,
  False,
  Return,
  Class,
  Fun,
  Super,
  This,

  Error,
  Eof,
}

/// Maps an identifier's lexeme to a keyword kind, or `None` if it is a plain identifier.
pub fn keyword_kind(lexeme: &str) -> Option<TokenKind> {
  use TokenKind::*;

  Some(match lexeme {
    "and" => And,
    "or" => Or,
    "if" => If,
    "else" => Else,
    "while" => While,
    "for" => For,
    "var" => Var,
    "print" => Print,
    "break" => Break,
    "nil" => Nil,
    "true" => True,
    "false" => False,
    "return" => Return,
    "class" => Class,
    "fun" => Fun,
    "super" => Super,
    "this" => This,
    _ => return None,
  })
}

/// A 1-based source position.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Position {
  pub line: u32,
  pub column: u32,
}

impl Position {
  pub fn new(line: u32, column: u32) -> Self {
    Position { line, column }
  }
}

/// A single lexical token: a kind, a lexeme slice into the source, and the
/// position of its first character.
///
/// `lexeme` is an owned `String` rather than a borrowed `&str` so tokens can
/// outlive the scanner that produced them (the compiler keeps the previous
/// and current token alive across calls into the scanner).
#[derive(Clone, PartialEq, Debug)]
pub struct Token {
  pub kind: TokenKind,
  pub lexeme: String,
  pub position: Position,
}

impl Token {
  pub fn new(kind: TokenKind, lexeme: String, position: Position) -> Self {
    Token { kind, lexeme, position }
  }

  /// Builds the synthetic error token carrying `message` as its lexeme.
  pub fn error(message: impl Into<String>, position: Position) -> Self {
    Token { kind: TokenKind::Error, lexeme: message.into(), position }
  }
}

impl std::fmt::Display for TokenKind {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    Debug::fmt(self, f)
  }
}
