//! Bootstrap/CLI (C10) (SPEC_FULL 4.9): create/delete/rebuild the search
//! index, and start the broker consumer loop.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::broker::message::AfterEnvelope;
use crate::broker::{next_delivery, BrokerClient, RoutingKey};
use crate::config::Settings;
use crate::db::{self, DbPool, InodeRepository, PageRepository};
use crate::embeddings::OpenAiEmbeddingClient;
use crate::pdf::OcrConfig;
use crate::pipeline::{Context, Dispatcher};
use crate::search::OpenSearchIndex;
use crate::storage::S3ObjectStore;

const REBUILD_BATCH_SIZE: i64 = 500;

#[derive(Parser)]
#[command(name = "insight-worker")]
#[command(about = "Background worker for the document-insight platform")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Idempotently create the `inodes` search index.
    CreateIndex,
    /// Drop the `inodes` search index. Operator escape hatch; never invoked
    /// automatically by the worker itself.
    DeleteIndex,
    /// One-shot administrative re-emit: mark every inode unindexed, then
    /// re-publish `index_inode` for each.
    RebuildIndex,
    /// Ensure the search index exists, then start consuming the task queue
    /// until Ctrl-C / SIGTERM.
    ProcessMessages,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    settings.log_resolved();

    match cli.command {
        Commands::CreateIndex => cmd_create_index(&settings).await,
        Commands::DeleteIndex => cmd_delete_index(&settings).await,
        Commands::RebuildIndex => cmd_rebuild_index(&settings).await,
        Commands::ProcessMessages => cmd_process_messages(&settings).await,
    }
}

async fn cmd_create_index(settings: &Settings) -> anyhow::Result<()> {
    let search = OpenSearchIndex::new(&settings.search)?;
    search.create_index().await?;
    info!("search index ensured");
    Ok(())
}

async fn cmd_delete_index(settings: &Settings) -> anyhow::Result<()> {
    let search = OpenSearchIndex::new(&settings.search)?;
    search.delete_index().await?;
    info!("search index deleted");
    Ok(())
}

async fn cmd_rebuild_index(settings: &Settings) -> anyhow::Result<()> {
    db::run_migrations(&settings.database.uri)?;
    let pool = DbPool::new(&settings.database.uri, &settings.database.schema, 5)?;
    let inodes = InodeRepository::new(pool);
    let broker = BrokerClient::connect(&settings.broker).await?;

    let marked = inodes.mark_all_unindexed().await?;
    info!(marked, "marked every inode unindexed for rebuild");

    let mut offset = 0i64;
    loop {
        let ids = inodes.page_ids(offset, REBUILD_BATCH_SIZE).await?;
        if ids.is_empty() {
            break;
        }
        for id in &ids {
            let body = serde_json::to_vec(&AfterEnvelope::new(*id))?;
            broker.publish_task(RoutingKey::IndexInode, &body).await?;
        }
        offset += ids.len() as i64;
    }

    info!(total = offset, "rebuild-index re-emit complete");
    Ok(())
}

async fn cmd_process_messages(settings: &Settings) -> anyhow::Result<()> {
    db::run_migrations(&settings.database.uri)?;

    let pool = DbPool::new(&settings.database.uri, &settings.database.schema, 10)?;
    let inodes = InodeRepository::new(pool.clone());
    let pages = PageRepository::new(pool);

    let storage = Arc::new(S3ObjectStore::new(&settings.storage));
    let search = Arc::new(OpenSearchIndex::new(&settings.search)?);
    search.create_index().await?;

    let embeddings = Arc::new(OpenAiEmbeddingClient::new(&settings.embedding));
    let broker = Arc::new(BrokerClient::connect(&settings.broker).await?);

    let ctx = Context {
        inodes,
        pages,
        storage,
        search,
        embeddings,
        broker: broker.clone(),
        ocr: Arc::new(OcrConfig::default()),
    };
    let dispatcher = Dispatcher::new(ctx);

    let mut consumer = broker.consume().await?;
    info!("consuming task queue");

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, stopping after in-flight delivery");
                break;
            }
            delivery = next_delivery(&mut consumer) => {
                match delivery {
                    Some(Ok(delivery)) => {
                        // Spawned as its own task (SPEC_FULL 5) so a slow
                        // handler never stalls the broker connection's
                        // ability to prefetch acks/heartbeats; prefetch=1
                        // still bounds in-flight work.
                        let dispatcher = dispatcher.clone();
                        tokio::spawn(async move {
                            let _ = dispatcher.handle(&delivery).await;
                        });
                    }
                    Some(Err(err)) => {
                        tracing::error!(%err, "consumer stream error");
                    }
                    None => {
                        info!("consumer stream closed");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
