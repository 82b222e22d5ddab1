//! Move handler (C8.move) (SPEC_FULL 4.5). Named `mov` to avoid shadowing
//! the `move` keyword.

use crate::broker::RoutingKey;
use crate::error::WorkerError;
use crate::storage::keys;

use super::{finalize, Context};

pub async fn handle(ctx: &Context, inode_id: i64) -> Result<(), WorkerError> {
    let inode = ctx
        .inodes
        .get(inode_id)
        .await?
        .ok_or(WorkerError::InodeNotFound(inode_id))?;

    let canonical_path = ctx.inodes.computed_path(inode_id).await?;
    if canonical_path == inode.path {
        return Ok(());
    }

    if inode.inode_type.is_file() {
        let old_original = inode.original_object_key();
        let old_optimized = inode.optimized_object_key();
        let new_original = keys::original_key(&inode.owner_id, &canonical_path);
        let new_optimized = keys::optimized_key(&inode.owner_id, &canonical_path);

        ctx.storage.copy(&old_original, &new_original).await?;
        ctx.storage.remove(&old_original).await?;
        ctx.storage.copy(&old_optimized, &new_optimized).await?;
        ctx.storage.remove(&old_optimized).await?;
    }

    ctx.inodes.apply_move(inode_id, &canonical_path).await?;

    // The database's path function is a transitive view over descendants;
    // a single index_inode per descendant (emitted by whoever mutated the
    // tree, typically a database trigger) suffices without walking here.
    finalize::publish_task(ctx, RoutingKey::IndexInode, inode_id).await?;

    Ok(())
}
