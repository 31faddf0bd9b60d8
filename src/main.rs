use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use virtual_machine::{InterpretResult, VirtualMachine};

/// `lox <flags?> <script?>` — zero extra arguments starts a REPL, one runs a
/// script file, anything else is a usage error.
fn main() -> ExitCode {
  let args: Vec<String> = std::env::args().collect();

  match args.as_slice() {
    [_] => run_prompt(),
    [_, path] => run_file(path),
    _ => {
      eprintln!("Usage: lox [script]");
      ExitCode::from(64)
    }
  }
}

fn run_file(path: &str) -> ExitCode {
  let source = match std::fs::read_to_string(path) {
    Ok(source) => source,
    Err(error) => {
      eprintln!("Could not read '{path}': {error}");
      return ExitCode::from(74);
    }
  };

  let mut vm = VirtualMachine::new();
  match vm.interpret(&source, 1) {
    InterpretResult::Ok => ExitCode::from(0),
    InterpretResult::StaticError => ExitCode::from(65),
    InterpretResult::DynamicError => ExitCode::from(70),
  }
}

/// A line-oriented REPL: each line runs on the same long-lived `VirtualMachine`
/// so globals persist across lines. A single line's `StaticError`/`DynamicError`
/// is reported by `interpret` itself and does not end the session or affect
/// the process exit code — only EOF (Ctrl-D) does.
fn run_prompt() -> ExitCode {
  let mut vm = VirtualMachine::new();
  let stdin = io::stdin();
  let mut line_number = 1u32;

  loop {
    print!("> ");
    if io::stdout().flush().is_err() {
      return ExitCode::from(74);
    }

    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
      Ok(0) => return ExitCode::from(0), // EOF
      Ok(_) => {
        vm.interpret(&line, line_number);
        line_number += 1;
      }
      Err(error) => {
        eprintln!("Error reading from stdin: {error}");
        return ExitCode::from(74);
      }
    }
  }
}
