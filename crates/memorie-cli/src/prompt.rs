//! Line-based terminal prompts.

use anyhow::{bail, Result};
use std::io::{BufRead, Write};

/// Print `label: ` and read one trimmed line from stdin.
pub fn ask(label: &str) -> Result<String> {
    print!("{label}: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("input closed while waiting for {label}");
    }
    Ok(line.trim().to_string())
}

/// Use the flag value when given, otherwise prompt for it.
pub fn or_ask(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => ask(label),
    }
}

pub fn confirm(label: &str) -> Result<bool> {
    let answer = ask(&format!("{label} [y/N]"))?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// What the user chose after a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Remembered,
    Forgot,
    Save,
    Discard,
    Retry,
    Quit,
}

impl Action {
    pub fn parse(input: &str) -> Option<Action> {
        let action = match input.trim().to_ascii_lowercase().as_str() {
            "r" | "yes" | "remembered" => Action::Remembered,
            "f" | "no" | "forgot" => Action::Forgot,
            "s" | "save" => Action::Save,
            "d" | "delete" | "discard" => Action::Discard,
            "t" | "retry" | "try again" => Action::Retry,
            "q" | "quit" => Action::Quit,
            _ => return None,
        };
        Some(action)
    }
}
