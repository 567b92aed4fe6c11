use anyhow::{anyhow, Context, Result};
use std::fmt::Display;
use std::io::{self, BufRead, Write};

/// Line-oriented operator dialogue.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: impl Display) -> Result<()> {
        writeln!(self.output, "{line}").context("write to console")
    }

    /// Print `prompt` and read one trimmed answer. Closed input is an error.
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}").context("write to console")?;
        self.output.flush().context("flush console")?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("read from console")?;
        if read == 0 {
            return Err(anyhow!("input closed while waiting for: {}", prompt.trim()));
        }
        Ok(line.trim().to_string())
    }

    pub fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.ask(prompt)?.to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }

    pub fn output(&self) -> &W {
        &self.output
    }
}
