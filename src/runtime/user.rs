//! User interaction operations (line prompts).

use anyhow::{Result, bail};

use super::RealRuntime;

use std::io::{self, BufRead, Write};

/// Core, testable implementation that reads from any BufRead and writes to any Write.
/// Free-standing so tests can exercise it without a RealRuntime.
pub(crate) fn prompt_with_io<R: BufRead, W: Write>(
    prompt: &str,
    input: &mut R,
    output: &mut W,
) -> Result<String> {
    write!(output, "{}: ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("No input available for '{}'", prompt);
    }

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

impl RealRuntime {
    pub(crate) fn prompt_impl(&self, prompt: &str) -> Result<String> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut stdin_lock = stdin.lock();
        prompt_with_io(prompt, &mut stdin_lock, &mut stdout)
    }
}
