//! Interactive confirmation before destructive work.

use std::io::{self, BufRead, Write};

/// Asks a human whether to go ahead.
pub trait Confirm {
    /// Returns `Ok(true)` only on an explicit yes.
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

/// Prompts on stdout and reads one line from stdin. Only `yes` counts.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt} (yes/no): ")?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_yes(&answer))
    }
}

/// Fixed answer, for `--yes` and for tests.
#[derive(Debug, Clone)]
pub struct Preset {
    answer: bool,
    asked: usize,
}

impl Preset {
    pub fn yes() -> Self {
        Self {
            answer: true,
            asked: 0,
        }
    }

    pub fn no() -> Self {
        Self {
            answer: false,
            asked: 0,
        }
    }

    /// How many times the prompt was shown.
    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl Confirm for Preset {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        log::debug!("auto-answering `{}` with {}", prompt, self.answer);
        self.asked += 1;
        Ok(self.answer)
    }
}

pub fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}
