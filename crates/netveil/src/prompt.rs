//! Line-based prompts
//!
//! Every prompt also listens for Ctrl+C. An interrupt or end of input at a
//! prompt is reported as `None`, which callers treat as "leave".

use anyhow::Result;
use std::io::{Write, stdout};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `question` and read one trimmed line
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        print!("{}", question);
        stdout().flush()?;

        // next_line is cancel safe, so an interrupted read loses nothing
        tokio::select! {
            line = self.lines.next_line() => Ok(line?.map(|l| l.trim().to_string())),
            _ = tokio::signal::ctrl_c() => {
                println!();
                Ok(None)
            }
        }
    }

    /// Ask with a default used for an empty answer
    pub async fn ask_with_default(&mut self, question: &str, default: &str) -> Result<Option<String>> {
        let answer = self.ask(&format!("{} [{}]: ", question, default)).await?;
        Ok(answer.map(|a| if a.is_empty() { default.to_string() } else { a }))
    }

    /// Yes/no question, `[y/N]`
    pub async fn confirm(&mut self, question: &str) -> Result<Option<bool>> {
        let answer = self.ask(&format!("{} [y/N] ", question)).await?;
        Ok(answer.map(|a| is_yes(&a)))
    }

    /// Wait for Enter; `false` if the user interrupted instead
    pub async fn pause(&mut self) -> Result<bool> {
        Ok(self
            .ask("\n⏎ Press Enter to continue...")
            .await?
            .is_some())
    }
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new()
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
