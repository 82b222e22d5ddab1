//! Share handler (C8.share) (SPEC_FULL 4.6).

use crate::broker::RoutingKey;
use crate::error::WorkerError;

use super::{finalize, Context};

pub async fn handle(ctx: &Context, inode_id: i64) -> Result<(), WorkerError> {
    let inode = ctx
        .inodes
        .get(inode_id)
        .await?
        .ok_or(WorkerError::InodeNotFound(inode_id))?;

    if inode.inode_type.is_file() {
        ctx.storage
            .set_public_tag(&inode.original_object_key(), inode.is_public)
            .await?;
        ctx.storage
            .set_public_tag(&inode.optimized_object_key(), inode.is_public)
            .await?;
    }

    finalize::publish_task(ctx, RoutingKey::IndexInode, inode_id).await?;

    Ok(())
}
