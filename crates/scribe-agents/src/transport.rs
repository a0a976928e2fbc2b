//! Console transport for the CLI.

use std::io::Write;

use anyhow::{Context, Result};
use async_trait::async_trait;
use composition::Deliverer;

/// Prints chunks to a writer, separated by a rule so message boundaries
/// stay visible.
pub struct ConsoleDeliverer<W> {
    out: std::sync::Mutex<W>,
}

impl<W: Write + Send> ConsoleDeliverer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: std::sync::Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self, header: Option<usize>, text: &str) -> Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(index) = header {
            writeln!(out, "\n──── message {} ────", index + 1).context("write failed")?;
        }
        writeln!(out, "{text}").context("write failed")?;
        out.flush().context("flush failed")
    }
}

/// Stdout-backed deliverer used by the binary.
pub type StdoutDeliverer = ConsoleDeliverer<std::io::Stdout>;

impl StdoutDeliverer {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send> Deliverer for ConsoleDeliverer<W> {
    async fn send_primary(&self, text: &str) -> Result<()> {
        self.write(None, text)
    }

    async fn send_follow_up(&self, index: usize, text: &str) -> Result<()> {
        self.write(Some(index), text)
    }
}
