//! Delete handler (C8.delete) (SPEC_FULL 4.7). The row is already gone by
//! the time this runs, so the payload carries everything the handler needs.

use crate::broker::message::BeforeBody;
use crate::error::WorkerError;
use crate::storage::keys;

use super::Context;

pub async fn handle(ctx: &Context, before: BeforeBody) -> Result<(), WorkerError> {
    if before.inode_type == "file" {
        let original_key = keys::original_key(&before.owner_id, &before.path);
        let optimized_key = keys::optimized_key(&before.owner_id, &before.path);

        ctx.storage
            .remove_many(&[original_key, optimized_key])
            .await?;
    }

    ctx.search.delete(before.id).await?;

    Ok(())
}
