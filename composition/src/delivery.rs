//! Transport seam: one primary reply followed by ordered follow-ups.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::packer::Chunk;

/// A transport that caps each message at the packer's hard limit.
#[async_trait]
pub trait Deliverer: Send + Sync {
    /// Send the first chunk as the reply to the originating request.
    async fn send_primary(&self, text: &str) -> Result<()>;

    /// Send chunk `index` as a follow-up. Follow-ups start at index 1.
    async fn send_follow_up(&self, index: usize, text: &str) -> Result<()>;
}

/// Deliver `chunks` in order. Returns the number of messages sent.
pub async fn deliver(chunks: &[Chunk], deliverer: &dyn Deliverer) -> Result<usize> {
    let Some((first, rest)) = chunks.split_first() else {
        bail!("refusing to deliver an empty chunk list");
    };

    deliverer
        .send_primary(&first.text)
        .await
        .context("failed to send primary reply")?;
    debug!(index = first.index, chars = first.len(), "Delivered primary chunk");

    for chunk in rest {
        deliverer
            .send_follow_up(chunk.index, &chunk.text)
            .await
            .with_context(|| format!("failed to send follow-up {}", chunk.index))?;
        debug!(index = chunk.index, chars = chunk.len(), "Delivered follow-up chunk");
    }
    Ok(chunks.len())
}
