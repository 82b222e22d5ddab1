//! Index handler (C8.index) (SPEC_FULL 4.4).

use crate::error::WorkerError;
use crate::search::InodeDocument;

use super::{finalize, Context};

pub async fn handle(ctx: &Context, inode_id: i64) -> Result<(), WorkerError> {
    let inode = ctx
        .inodes
        .get(inode_id)
        .await?
        .ok_or(WorkerError::InodeNotFound(inode_id))?;

    let to_page = inode.to_page.unwrap_or(inode.from_page);
    let pages = ctx.pages.for_inode(inode_id, inode.from_page, to_page).await?;
    let document = InodeDocument::from_inode(&inode, &pages);

    // A search-store error re-raises without marking the row indexed: the
    // database and search store must converge, never silently diverge.
    ctx.search.upsert(inode_id, &document).await?;

    ctx.inodes.mark_indexed(inode_id).await?;
    finalize::notify_if_terminal(ctx, inode_id, "index_inode").await?;

    Ok(())
}
