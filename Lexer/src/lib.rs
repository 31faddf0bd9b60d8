use core::tokens::{keyword_kind, Position, Token, TokenKind};

/// Turns a source string into tokens, one at a time.
///
/// The scanner never allocates beyond the lexeme it hands back in each
/// `Token`; it holds the whole source as a `Vec<char>` and walks it with a
/// `current` cursor, so multi-byte characters never split a lexeme mid-codepoint.
pub struct Scanner {
  source: Vec<char>,
  /// Index of the first character of the token currently being scanned.
  start: usize,
  /// Index of the next character to consume.
  current: usize,
  line: u32,
  /// Index into `source` of the first character on the current line.
  line_start: usize,
}

impl Scanner {
  /// Constructs a scanner over `source`, reporting positions starting at `starting_line`.
  pub fn new(source: &str, starting_line: u32) -> Self {
    Scanner {
      source: source.chars().collect(),
      start: 0,
      current: 0,
      line: starting_line,
      line_start: 0,
    }
  }

  /// Scans and returns the next token. Once the source is exhausted, every
  /// subsequent call returns `Eof`.
  pub fn scan_token(&mut self) -> Token {
    if let Some(err) = self.skip_whitespace_and_comments() {
      return err;
    }
    self.start = self.current;

    if self.is_at_end() {
      return self.make_token(TokenKind::Eof);
    }

    let c = self.advance();

    if is_alpha(c) {
      return self.identifier();
    }
    if c.is_ascii_digit() {
      return self.number();
    }

    match c {
      '(' => self.make_token(TokenKind::LeftParen),
      ')' => self.make_token(TokenKind::RightParen),
      '{' => self.make_token(TokenKind::LeftBrace),
      '}' => self.make_token(TokenKind::RightBrace),
      ',' => self.make_token(TokenKind::Comma),
      '.' => self.make_token(TokenKind::Dot),
      '-' => self.make_token(TokenKind::Minus),
      '+' => self.make_token(TokenKind::Plus),
      ';' => self.make_token(TokenKind::Semicolon),
      '*' => self.make_token(TokenKind::Star),
      '?' => self.make_token(TokenKind::Question),
      ':' => self.make_token(TokenKind::Colon),
      '/' => self.make_token(TokenKind::Slash),
      '!' => {
        let kind = if self.matches('=') { TokenKind::BangEqual } else { TokenKind::Bang };
        self.make_token(kind)
      }
      '=' => {
        let kind = if self.matches('=') { TokenKind::EqualEqual } else { TokenKind::Equal };
        self.make_token(kind)
      }
      '>' => {
        let kind = if self.matches('=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
        self.make_token(kind)
      }
      '<' => {
        let kind = if self.matches('=') { TokenKind::LessEqual } else { TokenKind::Less };
        self.make_token(kind)
      }
      '"' => self.string(),
      _ => self.error_token("Unexpected character."),
    }
  }

  fn skip_whitespace_and_comments(&mut self) -> Option<Token> {
    loop {
      match self.peek() {
        Some(' ') | Some('\t') | Some('\r') => {
          self.advance();
        }
        Some('\n') => {
          self.advance();
        }
        Some('/') if self.peek_at(1) == Some('/') => {
          while self.peek().is_some() && self.peek() != Some('\n') {
            self.advance();
          }
        }
        Some('/') if self.peek_at(1) == Some('*') => {
          self.start = self.current;
          self.advance();
          self.advance();
          if !self.skip_block_comment() {
            return Some(self.error_token("Unterminated block comment."));
          }
        }
        _ => return None,
      }
    }
  }

  /// Consumes up to and including the first `*/`, returning `false` if the
  /// source ends first. Block comments do not nest: the first `*/` closes
  /// the comment regardless of intervening `/*`.
  fn skip_block_comment(&mut self) -> bool {
    loop {
      match (self.peek(), self.peek_at(1)) {
        (None, _) => return false,
        (Some('*'), Some('/')) => {
          self.advance();
          self.advance();
          return true;
        }
        _ => {
          self.advance();
        }
      }
    }
  }

  fn identifier(&mut self) -> Token {
    while self.peek().map(is_alpha_numeric).unwrap_or(false) {
      self.advance();
    }

    let lexeme = self.lexeme();
    let kind = keyword_kind(&lexeme).unwrap_or(TokenKind::Identifier);
    self.make_token(kind)
  }

  fn number(&mut self) -> Token {
    while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
      self.advance();
    }

    // Only consume the '.' if it is followed by at least one digit; a
    // trailing '.' with no digits belongs to the next token.
    if self.peek() == Some('.') && self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
      self.advance();
      while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        self.advance();
      }
    }

    self.make_token(TokenKind::Number)
  }

  fn string(&mut self) -> Token {
    loop {
      match self.peek() {
        None => return self.error_token("Unterminated string."),
        Some('"') => {
          self.advance();
          return self.make_token(TokenKind::String);
        }
        Some(_) => {
          self.advance();
        }
      }
    }
  }

  fn is_at_end(&self) -> bool {
    self.current >= self.source.len()
  }

  fn peek(&self) -> Option<char> {
    self.source.get(self.current).copied()
  }

  fn peek_at(&self, offset: usize) -> Option<char> {
    self.source.get(self.current + offset).copied()
  }

  /// Consumes and returns the current character, tracking line/column state.
  ///
  /// A newline bumps the line counter and resets the column origin, except
  /// when it is the very last character of the source: that trailing LF does
  /// not advance the line, so `Eof` reports the line of the last real token.
  fn advance(&mut self) -> char {
    let c = self.source[self.current];
    self.current += 1;

    if c == '\n' && self.current < self.source.len() {
      self.line += 1;
      self.line_start = self.current;
    }

    c
  }

  fn matches(&mut self, expected: char) -> bool {
    if self.peek() == Some(expected) {
      self.advance();
      true
    } else {
      false
    }
  }

  fn lexeme(&self) -> String {
    self.source[self.start..self.current].iter().collect()
  }

  fn position(&self) -> Position {
    Position::new(self.line, (self.start - self.line_start + 1) as u32)
  }

  fn make_token(&self, kind: TokenKind) -> Token {
    Token::new(kind, self.lexeme(), self.position())
  }

  fn error_token(&self, message: &str) -> Token {
    Token::error(message, self.position())
  }
}

fn is_alpha(c: char) -> bool {
  c.is_ascii_alphabetic() || c == '_'
}

fn is_alpha_numeric(c: char) -> bool {
  is_alpha(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(source: &str) -> Vec<TokenKind> {
    let mut scanner = Scanner::new(source, 1);
    let mut out = vec![];
    loop {
      let tok = scanner.scan_token();
      let done = tok.kind == TokenKind::Eof;
      out.push(tok.kind);
      if done {
        break;
      }
    }
    out
  }

  #[test]
  fn scans_single_and_two_char_operators() {
    assert_eq!(
      kinds("!= == >= <= ! = > <"),
      vec![
        TokenKind::BangEqual,
        TokenKind::EqualEqual,
        TokenKind::GreaterEqual,
        TokenKind::LessEqual,
        TokenKind::Bang,
        TokenKind::Equal,
        TokenKind::Greater,
        TokenKind::Less,
        TokenKind::Eof,
      ]
    );
  }

  #[test]
  fn number_trailing_dot_not_consumed() {
    let mut scanner = Scanner::new("1.and", 1);
    let tok = scanner.scan_token();
    assert_eq!(tok.kind, TokenKind::Number);
    assert_eq!(tok.lexeme, "1");
    let tok = scanner.scan_token();
    assert_eq!(tok.kind, TokenKind::Dot);
    let tok = scanner.scan_token();
    assert_eq!(tok.kind, TokenKind::And);
  }

  #[test]
  fn unterminated_string_is_an_error_token() {
    let mut scanner = Scanner::new("\"abc", 1);
    let tok = scanner.scan_token();
    assert_eq!(tok.kind, TokenKind::Error);
    assert_eq!(tok.lexeme, "Unterminated string.");
  }

  #[test]
  fn unterminated_block_comment_is_an_error_token() {
    let mut scanner = Scanner::new("/* never closes", 1);
    let tok = scanner.scan_token();
    assert_eq!(tok.kind, TokenKind::Error);
    assert_eq!(tok.lexeme, "Unterminated block comment.");
  }

  #[test]
  fn block_comments_do_not_nest() {
    // The first `*/` closes the comment, leaving a stray `*/` to scan next.
    let mut scanner = Scanner::new("/* /* nested */ */", 1);
    let tok = scanner.scan_token();
    assert_eq!(tok.kind, TokenKind::Star);
  }

  #[test]
  fn keyword_vs_identifier() {
    assert_eq!(kinds("and orchid"), vec![TokenKind::And, TokenKind::Identifier, TokenKind::Eof]);
  }

  #[test]
  fn final_newline_does_not_advance_line() {
    let mut scanner = Scanner::new("print 1;\n", 1);
    // consume through to Eof
    loop {
      let tok = scanner.scan_token();
      if tok.kind == TokenKind::Eof {
        assert_eq!(tok.position.line, 1);
        break;
      }
    }
  }
}
