//! Task dispatcher (C7) and the five stage handlers (C8) it routes to.
//!
//! Each handler is a free function over a shared [`Context`] so the
//! dispatcher stays a thin match statement; the handlers hold the actual
//! per-stage contracts from SPEC_FULL 4.

mod delete;
mod embed;
mod finalize;
mod ingest;
mod index;
mod mov;
mod share;

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::broker::message::{parse_after, parse_before};
use crate::broker::{BrokerClient, Delivery, RoutingKey};
use crate::db::{InodeRepository, PageRepository};
use crate::embeddings::EmbeddingClient;
use crate::error::WorkerError;
use crate::pdf::OcrConfig;
use crate::search::SearchIndex;
use crate::storage::ObjectStore;

/// The adapters every stage handler needs, held behind `Arc` and cloned
/// into each spawned per-delivery task.
#[derive(Clone)]
pub struct Context {
    pub inodes: InodeRepository,
    pub pages: PageRepository,
    pub storage: Arc<dyn ObjectStore>,
    pub search: Arc<dyn SearchIndex>,
    pub embeddings: Arc<dyn EmbeddingClient>,
    pub broker: Arc<BrokerClient>,
    pub ocr: Arc<OcrConfig>,
}

#[derive(Clone)]
pub struct Dispatcher {
    ctx: Context,
}

impl Dispatcher {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Decode the routing key and payload, invoke the matching stage
    /// handler, and acknowledge or reject the delivery. Every `Err` that
    /// escapes a handler is a permanent reject (SPEC_FULL 7.1) — the broker
    /// redelivers only across a worker restart, never in-process.
    #[instrument(skip(self, delivery), fields(routing_key = %delivery.routing_key))]
    pub async fn handle(&self, delivery: &Delivery) -> Result<(), WorkerError> {
        let result = self.dispatch(delivery).await;
        match &result {
            Ok(()) => {
                self.ctx.broker.ack(delivery).await?;
            }
            Err(err) => {
                error!(error = %err, "stage handler failed, rejecting delivery");
                self.ctx.broker.reject(delivery).await?;
            }
        }
        result
    }

    async fn dispatch(&self, delivery: &Delivery) -> Result<(), WorkerError> {
        let key = RoutingKey::from_str(&delivery.routing_key)
            .ok_or_else(|| WorkerError::UnknownRoutingKey(delivery.routing_key.clone()))?;

        match key {
            RoutingKey::IngestInode => {
                let id = parse_after(&delivery.payload)?;
                info!(inode_id = id, "ingest_inode");
                ingest::handle(&self.ctx, id).await
            }
            RoutingKey::EmbedInode => {
                let id = parse_after(&delivery.payload)?;
                info!(inode_id = id, "embed_inode");
                embed::handle(&self.ctx, id).await
            }
            RoutingKey::IndexInode => {
                let id = parse_after(&delivery.payload)?;
                info!(inode_id = id, "index_inode");
                index::handle(&self.ctx, id).await
            }
            RoutingKey::MoveInode => {
                let id = parse_after(&delivery.payload)?;
                info!(inode_id = id, "move_inode");
                mov::handle(&self.ctx, id).await
            }
            RoutingKey::ShareInode => {
                let id = parse_after(&delivery.payload)?;
                info!(inode_id = id, "share_inode");
                share::handle(&self.ctx, id).await
            }
            RoutingKey::DeleteInode => {
                let before = parse_before(&delivery.payload)?;
                info!(inode_id = before.id, "delete_inode");
                delete::handle(&self.ctx, before).await
            }
        }
    }
}
