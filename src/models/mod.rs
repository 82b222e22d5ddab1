//! Domain model types shared by the database, search, and pipeline layers.

mod inode;
mod page;

pub use inode::{Inode, InodeType};
pub use page::{Page, EMBEDDING_DIM};
