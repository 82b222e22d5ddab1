//! The page entity: one page of extracted text (and, later, its embedding)
//! belonging to a file inode.

/// Fixed embedding dimension mandated by the data model (see SPEC_FULL §3).
pub const EMBEDDING_DIM: usize = 1536;

#[derive(Debug, Clone)]
pub struct Page {
    pub id: i64,
    pub inode_id: i64,
    pub index: i32,
    pub contents: String,
    pub embedding: Option<Vec<f32>>,
}

impl Page {
    pub fn has_contents(&self) -> bool {
        !self.contents.is_empty()
    }
}
