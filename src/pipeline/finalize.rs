//! Shared fan-out and notification logic every stage handler's finalizer
//! calls (SPEC_FULL 4.2 "Finalizer (always runs)", 9 "Notification-on-
//! terminal-state").

use crate::broker::message::{AfterEnvelope, NotificationPayload};
use crate::broker::RoutingKey;
use crate::error::WorkerError;

use super::Context;

/// Publish a follow-up task event for `inode_id` on the given routing key.
pub async fn publish_task(ctx: &Context, key: RoutingKey, inode_id: i64) -> Result<(), WorkerError> {
    let body = serde_json::to_vec(&AfterEnvelope::new(inode_id))?;
    ctx.broker.publish_task(key, &body).await?;
    Ok(())
}

/// Re-read the inode and notify its owner (or `public`) if its state is now
/// terminal. The row is re-read here rather than trusted from the caller's
/// in-memory copy: another stage may have raced to completion between this
/// stage's mutation and this decision.
pub async fn notify_if_terminal(ctx: &Context, inode_id: i64, stage: &str) -> Result<(), WorkerError> {
    let inode = ctx
        .inodes
        .get(inode_id)
        .await?
        .ok_or(WorkerError::InodeNotFound(inode_id))?;

    if inode.is_notifiable_terminal_state() {
        let routing_key = inode.notification_routing_key();
        ctx.broker
            .publish_notification(
                &routing_key,
                &NotificationPayload {
                    id: inode_id,
                    task: stage.to_string(),
                },
            )
            .await?;
    }

    Ok(())
}
