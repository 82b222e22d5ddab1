//! Ingest handler (C8.ingest) — the critical path (SPEC_FULL 4.2).

use tempfile::TempDir;
use tracing::{info, warn};

use crate::broker::RoutingKey;
use crate::error::{IngestError, WorkerError};
use crate::pdf;

use super::{finalize, Context};

pub async fn handle(ctx: &Context, inode_id: i64) -> Result<(), WorkerError> {
    let inode = ctx
        .inodes
        .get(inode_id)
        .await?
        .ok_or(WorkerError::InodeNotFound(inode_id))?;

    let scratch = TempDir::new().map_err(|e| WorkerError::Other(e.into()))?;
    let original_path = scratch.path().join("original.pdf");
    let repaired_path = scratch.path().join("repaired.pdf");
    let sliced_path = scratch.path().join("sliced.pdf");
    let optimized_path = scratch.path().join("optimized.pdf");

    ctx.storage
        .get_to_file(&inode.original_object_key(), &original_path)
        .await?;

    let error = run_content_pipeline(
        ctx,
        &inode,
        &original_path,
        &repaired_path,
        &sliced_path,
        &optimized_path,
    )
    .await?;

    if let Some(ingest_error) = error {
        ctx.inodes
            .set_error(inode_id, ingest_error.as_db_str())
            .await?;
    }

    // TempDir is dropped (and its contents removed) here on every exit path.
    drop(scratch);

    ctx.inodes.mark_ingested(inode_id).await?;

    finalize::publish_task(ctx, RoutingKey::EmbedInode, inode_id).await?;
    finalize::publish_task(ctx, RoutingKey::IndexInode, inode_id).await?;
    finalize::notify_if_terminal(ctx, inode_id, "ingest_inode").await?;

    Ok(())
}

/// Runs the MIME-check through page-upsert steps. Returns `Ok(Some(err))`
/// for the two typed, persisted failure modes; `Ok(None)` on full success;
/// an `Err` only for infrastructure failures that must bubble to the
/// dispatcher as a reject (these skip the finalizer entirely).
async fn run_content_pipeline(
    ctx: &Context,
    inode: &crate::models::Inode,
    original_path: &std::path::Path,
    repaired_path: &std::path::Path,
    sliced_path: &std::path::Path,
    optimized_path: &std::path::Path,
) -> Result<Option<IngestError>, WorkerError> {
    let mime = pdf::sniff_mime(original_path).map_err(|e| WorkerError::Other(e.into()))?;
    if mime != "application/pdf" {
        warn!(inode_id = inode.id, %mime, "unsupported file type");
        return Ok(Some(IngestError::UnsupportedFileType));
    }

    let to_page = match inode.to_page {
        Some(to_page) => to_page,
        None => match pdf::page_count(original_path) {
            Ok(count) => {
                let count = count as i32;
                ctx.inodes.set_to_page(inode.id, count).await?;
                count
            }
            Err(e) => {
                warn!(inode_id = inode.id, error = %e, "failed to read page count");
                return Ok(Some(IngestError::CorruptedFile));
            }
        },
    };

    if pdf::repair(original_path, repaired_path).await.is_err() {
        return Ok(Some(IngestError::CorruptedFile));
    }

    if pdf::slice(
        repaired_path,
        sliced_path,
        inode.from_page as u32,
        to_page as u32,
    )
    .is_err()
    {
        return Ok(Some(IngestError::CorruptedFile));
    }

    let ocr_config = pdf::OcrConfig::default();
    if pdf::run_ocr(sliced_path, optimized_path, &ocr_config)
        .await
        .is_err()
    {
        return Ok(Some(IngestError::CorruptedFile));
    }

    // From here on, any failure (upload, tagging, text extraction, page
    // upsert) is logged and swallowed rather than propagated: these are not
    // one of the two typed, persisted failure modes, and the row must still
    // be marked ingested so the finalizer runs and the message is not
    // retried forever on an ill-formed input.
    if let Err(err) = finish_ingest(ctx, inode, optimized_path).await {
        warn!(inode_id = inode.id, error = %err, "error occurred during ingest");
    }

    info!(inode_id = inode.id, from_page = inode.from_page, to_page, "ingest succeeded");
    Ok(None)
}

/// Upload the optimized file, tag it if public, extract page text, and
/// upsert the resulting page rows. Kept separate from `run_content_pipeline`
/// so its errors can be caught and logged in one place rather than
/// propagated to the dispatcher.
async fn finish_ingest(
    ctx: &Context,
    inode: &crate::models::Inode,
    optimized_path: &std::path::Path,
) -> Result<(), WorkerError> {
    ctx.storage
        .put_from_file(&inode.optimized_object_key(), optimized_path)
        .await?;

    if inode.is_public {
        ctx.storage
            .set_public_tag(&inode.optimized_object_key(), true)
            .await?;
    }

    let pages = pdf::extract_text_per_page(optimized_path).map_err(|e| WorkerError::Other(e.into()))?;
    let page_count = pages.len() as i32;
    for (offset, contents) in pages.into_iter().enumerate() {
        let index = inode.from_page + offset as i32;
        ctx.pages.upsert_contents(inode.id, index, &contents).await?;
    }

    // A re-ingest can shrink the page window (a narrower `to_page`, or the
    // optimized file simply has fewer pages than before); drop any stale
    // rows the new extraction no longer covers.
    ctx.pages
        .truncate_from(inode.id, inode.from_page + page_count)
        .await?;

    Ok(())
}
