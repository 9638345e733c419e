use anyhow::anyhow;
use async_trait::async_trait;
use flows::Confirm;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Line-oriented stdin shared by the command loop and interactive prompts.
pub struct Terminal {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// `None` once stdin is closed.
    pub async fn read_line(&self, prompt: &str) -> anyhow::Result<Option<String>> {
        print!("{}", prompt);
        std::io::stdout().flush()?;
        let mut lines = self.lines.lock().await;
        Ok(lines.next_line().await?)
    }

    pub async fn ask(&self, prompt: &str) -> anyhow::Result<String> {
        self.read_line(prompt)
            .await?
            .map(|l| l.trim().to_string())
            .ok_or_else(|| anyhow!("input closed"))
    }
}

#[async_trait]
impl Confirm for Terminal {
    async fn confirm(&self, prompt: &str) -> bool {
        match self.read_line(&format!("{} [y/N] ", prompt)).await {
            Ok(Some(answer)) => is_yes(&answer),
            _ => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
