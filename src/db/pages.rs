//! Page persistence: idempotent upsert keyed by `(inode_id, index)`, and
//! the embedding-pending selection query the embed stage consumes.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pgvector::Vector;

use super::pool::DbPool;
use super::DbError;
use crate::models::Page;
use crate::schema::pages;

#[derive(Queryable)]
struct PageRow {
    id: i64,
    inode_id: i64,
    index: i32,
    contents: String,
    embedding: Option<Vector>,
}

impl From<PageRow> for Page {
    fn from(row: PageRow) -> Self {
        Page {
            id: row.id,
            inode_id: row.inode_id,
            index: row.index,
            contents: row.contents,
            embedding: row.embedding.map(|v| v.to_vec()),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = pages)]
struct NewPage<'a> {
    inode_id: i64,
    index: i32,
    contents: &'a str,
}

#[derive(Clone)]
pub struct PageRepository {
    pool: DbPool,
}

impl PageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Upsert extracted text for one page. Re-ingesting the same inode
    /// overwrites `contents` for a page at the same index rather than
    /// duplicating rows, keeping ingest idempotent.
    pub async fn upsert_contents(&self, inode_id: i64, index: i32, contents: &str) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        let new_page = NewPage {
            inode_id,
            index,
            contents,
        };

        diesel::insert_into(pages::table)
            .values(&new_page)
            .on_conflict((pages::inode_id, pages::index))
            .do_update()
            .set(pages::contents.eq(contents))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Delete any page rows at or beyond `from_index` for this inode. Used
    /// when a re-ingest shrinks the effective page window.
    pub async fn truncate_from(&self, inode_id: i64, from_index: i32) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        diesel::delete(
            pages::table
                .filter(pages::inode_id.eq(inode_id))
                .filter(pages::index.ge(from_index)),
        )
        .execute(&mut conn)
        .await?;
        Ok(())
    }

    /// Pages within `[from_page, to_page)` that have text but no embedding
    /// yet. This is the embed stage's sole unit of work.
    pub async fn pending_embedding(
        &self,
        inode_id: i64,
        from_page: i32,
        to_page: i32,
    ) -> Result<Vec<Page>, DbError> {
        let mut conn = self.pool.get().await?;
        let rows: Vec<PageRow> = pages::table
            .filter(pages::inode_id.eq(inode_id))
            .filter(pages::index.ge(from_page))
            .filter(pages::index.lt(to_page))
            .filter(pages::embedding.is_null())
            .filter(pages::contents.ne(""))
            .order(pages::index.asc())
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(Page::from).collect())
    }

    pub async fn set_embedding(&self, page_id: i64, embedding: Vec<f32>) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        diesel::update(pages::table.find(page_id))
            .set(pages::embedding.eq(Vector::from(embedding)))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// All pages for an inode within its current page window, ordered by
    /// index. Used to assemble the search document's nested `pages`.
    pub async fn for_inode(&self, inode_id: i64, from_page: i32, to_page: i32) -> Result<Vec<Page>, DbError> {
        let mut conn = self.pool.get().await?;
        let rows: Vec<PageRow> = pages::table
            .filter(pages::inode_id.eq(inode_id))
            .filter(pages::index.ge(from_page))
            .filter(pages::index.lt(to_page))
            .order(pages::index.asc())
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(Page::from).collect())
    }
}
