//! Inode persistence: load/save, the derived-path lookup, and the flag
//! mutations each stage handler performs.

use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel_async::RunQueryDsl;

use super::pool::DbPool;
use super::DbError;
use crate::models::{Inode, InodeType};
use crate::schema::inodes;

#[derive(Queryable)]
struct InodeRow {
    id: i64,
    owner_id: String,
    inode_type: String,
    name: String,
    path: String,
    is_indexed: bool,
    is_uploaded: bool,
    is_ingested: bool,
    is_embedded: bool,
    is_public: bool,
    should_move: bool,
    from_page: i32,
    to_page: Option<i32>,
    error: Option<String>,
    parent_id: Option<i64>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl From<InodeRow> for Inode {
    fn from(row: InodeRow) -> Self {
        Inode {
            id: row.id,
            owner_id: row.owner_id,
            inode_type: InodeType::from_str(&row.inode_type).unwrap_or(InodeType::File),
            name: row.name,
            path: row.path,
            is_indexed: row.is_indexed,
            is_uploaded: row.is_uploaded,
            is_ingested: row.is_ingested,
            is_embedded: row.is_embedded,
            is_public: row.is_public,
            should_move: row.should_move,
            from_page: row.from_page,
            to_page: row.to_page,
            error: row.error,
            parent_id: row.parent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(QueryableByName)]
struct PathRow {
    #[diesel(sql_type = Text)]
    inode_path: String,
}

#[derive(Clone)]
pub struct InodeRepository {
    pool: DbPool,
}

impl InodeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Inode>, DbError> {
        let mut conn = self.pool.get().await?;
        let row: Option<InodeRow> = inodes::table
            .find(id)
            .first(&mut conn)
            .await
            .optional()?;
        Ok(row.map(Inode::from))
    }

    /// The database-computed canonical path for this inode (`inode_path(id)`).
    /// Treated as authoritative whenever `should_move` is set.
    pub async fn computed_path(&self, id: i64) -> Result<String, DbError> {
        let mut conn = self.pool.get().await?;
        let row: PathRow = diesel::sql_query("SELECT inode_path($1) AS inode_path")
            .bind::<BigInt, _>(id)
            .get_result(&mut conn)
            .await?;
        Ok(row.inode_path)
    }

    pub async fn set_error(&self, id: i64, error: &str) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        diesel::update(inodes::table.find(id))
            .set((inodes::error.eq(error), inodes::updated_at.eq(Utc::now())))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn set_to_page(&self, id: i64, to_page: i32) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        diesel::update(inodes::table.find(id))
            .set((
                inodes::to_page.eq(to_page),
                inodes::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn mark_ingested(&self, id: i64) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        diesel::update(inodes::table.find(id))
            .set((
                inodes::is_ingested.eq(true),
                inodes::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn mark_embedded(&self, id: i64) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        diesel::update(inodes::table.find(id))
            .set((
                inodes::is_embedded.eq(true),
                inodes::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn mark_indexed(&self, id: i64) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        diesel::update(inodes::table.find(id))
            .set((
                inodes::is_indexed.eq(true),
                inodes::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Apply a move: set the new path and clear `should_move`.
    pub async fn apply_move(&self, id: i64, new_path: &str) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        diesel::update(inodes::table.find(id))
            .set((
                inodes::path.eq(new_path),
                inodes::should_move.eq(false),
                inodes::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Mark every inode `is_indexed = false`. Used only by the `rebuild-index`
    /// CLI command (the one documented exception to "no administrative
    /// rebuilds").
    pub async fn mark_all_unindexed(&self) -> Result<u64, DbError> {
        let mut conn = self.pool.get().await?;
        let count = diesel::update(inodes::table)
            .set((
                inodes::is_indexed.eq(false),
                inodes::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(count as u64)
    }

    /// Page through every inode id, ascending, for bulk re-emit during
    /// `rebuild-index`. Mirrors the teacher's paginated full-table scans.
    pub async fn page_ids(&self, offset: i64, limit: i64) -> Result<Vec<i64>, DbError> {
        let mut conn = self.pool.get().await?;
        let ids = inodes::table
            .select(inodes::id)
            .order(inodes::id.asc())
            .offset(offset)
            .limit(limit)
            .load(&mut conn)
            .await?;
        Ok(ids)
    }
}
