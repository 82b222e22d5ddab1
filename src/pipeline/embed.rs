//! Embed handler (C8.embed) (SPEC_FULL 4.3).

use crate::broker::RoutingKey;
use crate::error::WorkerError;

use super::{finalize, Context};

pub async fn handle(ctx: &Context, inode_id: i64) -> Result<(), WorkerError> {
    let inode = ctx
        .inodes
        .get(inode_id)
        .await?
        .ok_or(WorkerError::InodeNotFound(inode_id))?;

    if inode.is_terminal_error() {
        return Err(WorkerError::EmbedRefused(inode_id));
    }

    let to_page = inode.to_page.unwrap_or(inode.from_page);
    let pending = ctx
        .pages
        .pending_embedding(inode_id, inode.from_page, to_page)
        .await?;

    if !pending.is_empty() {
        let texts: Vec<String> = pending.iter().map(|p| p.contents.clone()).collect();
        let vectors = ctx.embeddings.embed(&texts).await?;

        for (page, vector) in pending.iter().zip(vectors) {
            ctx.pages.set_embedding(page.id, vector).await?;
        }
    }

    ctx.inodes.mark_embedded(inode_id).await?;

    finalize::publish_task(ctx, RoutingKey::IndexInode, inode_id).await?;
    finalize::notify_if_terminal(ctx, inode_id, "embed_inode").await?;

    Ok(())
}
