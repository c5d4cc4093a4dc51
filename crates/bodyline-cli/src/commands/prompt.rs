//! Yes/no confirmation on the terminal.

use std::io::{self, BufRead, Write};

/// Asks `question` and returns true only for an answer of `y` or `Y`.
///
/// End of input counts as a refusal.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<bool> {
    write!(output, "{question} [y/N] ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y"))
}
