//! Line-oriented stdin input.
//!
//! Prompts go to stderr so stdout carries only command output.

use std::io::{self, BufRead, Write};

use customer_desk_client::Confirm;
use secrecy::SecretString;

/// Print `prompt` and read one line. `None` at end of input.
///
/// The read runs on the blocking pool so runtime workers stay free.
pub async fn read_line(prompt: &str) -> io::Result<Option<String>> {
    let prompt = prompt.to_owned();
    tokio::task::spawn_blocking(move || read_stdin_line(&prompt))
        .await
        .map_err(io::Error::other)?
}

/// Read a password line. Input is not masked.
pub async fn read_password(prompt: &str) -> io::Result<Option<SecretString>> {
    Ok(read_line(prompt).await?.map(SecretString::from))
}

fn read_stdin_line(prompt: &str) -> io::Result<Option<String>> {
    read_line_with(&mut io::stdin().lock(), &mut io::stderr().lock(), prompt)
}

/// Write `prompt` to `out`, then read one line from `input` without its
/// line ending.
fn read_line_with(
    input: &mut impl BufRead,
    out: &mut impl Write,
    prompt: &str,
) -> io::Result<Option<String>> {
    write!(out, "{prompt}")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Asks on the terminal; anything but `y`/`yes` declines.
#[derive(Debug, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        // Called from async code on the multi-threaded runtime.
        let prompt = format!("{prompt} [y/N] ");
        let answer = tokio::task::block_in_place(|| read_stdin_line(&prompt));
        match answer {
            Ok(Some(answer)) => is_yes(&answer),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read confirmation");
                false
            }
        }
    }
}

/// Confirms without asking, for `--yes`.
#[derive(Debug, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn test_read_line_writes_prompt_and_strips_line_ending() {
        let mut input = Cursor::new(b"Kandy\r\nGalle\n".to_vec());
        let mut out = Vec::new();

        let line = read_line_with(&mut input, &mut out, "City: ").unwrap();
        assert_eq!(line.as_deref(), Some("Kandy"));
        assert_eq!(out, b"City: ");

        let line = read_line_with(&mut input, &mut out, "City: ").unwrap();
        assert_eq!(line.as_deref(), Some("Galle"));
    }

    #[test]
    fn test_read_line_at_end_of_input() {
        let mut out = Vec::new();
        let line = read_line_with(&mut io::empty(), &mut out, "> ").unwrap();
        assert_eq!(line, None);
    }
}
