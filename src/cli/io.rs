//! Terminal interaction for the restore confirmation gate

use std::io::{self, BufRead, Write};

use crate::restore::Confirmer;

/// Confirmer that prompts on stdout and reads one line from stdin.
///
/// Only `y` / `yes` (any case) count as affirmative; everything else,
/// including EOF, is a decline.
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        let mut stdout = io::stdout();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Ok(false);
        }

        Ok(is_affirmative(&line))
    }
}

fn is_affirmative(line: &str) -> bool {
    let answer = line.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}
