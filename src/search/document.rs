//! The search index's per-inode document shape (SPEC_FULL 3).

use serde::{Deserialize, Serialize};

use crate::models::{Inode, Page};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDocument {
    pub index: i32,
    pub contents: String,
}

/// One document per inode. Intentionally excludes `embedding` — vector
/// search, if ever added, queries Postgres/pgvector directly rather than
/// duplicating vectors into the search store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InodeDocument {
    pub path: String,
    #[serde(rename = "type")]
    pub inode_type: String,
    pub folder: String,
    pub filename: String,
    pub owner_id: String,
    pub is_public: bool,
    pub readable_by: Vec<String>,
    pub pages: Vec<PageDocument>,
}

impl InodeDocument {
    pub fn from_inode(inode: &Inode, pages: &[Page]) -> Self {
        let (folder, filename) = split_path(&inode.path);

        let mut readable_by = vec![inode.owner_id.clone()];
        if inode.is_public {
            readable_by.push("public".to_string());
        }

        Self {
            path: inode.path.clone(),
            inode_type: inode.inode_type.as_str().to_string(),
            folder,
            filename,
            owner_id: inode.owner_id.clone(),
            is_public: inode.is_public,
            readable_by,
            pages: pages
                .iter()
                .filter(|p| p.has_contents())
                .map(|p| PageDocument {
                    index: p.index - inode.from_page,
                    contents: p.contents.clone(),
                })
                .collect(),
        }
    }
}

fn split_path(path: &str) -> (String, String) {
    match path.rfind('/') {
        Some(idx) if idx > 0 => (path[..idx].to_string(), path[idx + 1..].to_string()),
        Some(idx) => ("/".to_string(), path[idx + 1..].to_string()),
        None => (String::new(), path.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::models::InodeType;

    use super::*;

    fn inode(from_page: i32) -> Inode {
        Inode {
            id: 1,
            owner_id: "owner-1".to_string(),
            inode_type: InodeType::File,
            name: "doc.pdf".to_string(),
            path: "/doc.pdf".to_string(),
            is_indexed: false,
            is_uploaded: true,
            is_ingested: true,
            is_embedded: false,
            is_public: false,
            should_move: false,
            from_page,
            to_page: None,
            error: None,
            parent_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn page(index: i32) -> Page {
        Page {
            id: 1,
            inode_id: 1,
            index,
            contents: "text".to_string(),
            embedding: None,
        }
    }

    #[test]
    fn page_index_is_rebased_to_the_sliced_window() {
        let inode = inode(5);
        let pages = vec![page(5), page(6), page(7)];
        let doc = InodeDocument::from_inode(&inode, &pages);
        let indices: Vec<i32> = doc.pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn splits_nested_path() {
        assert_eq!(
            split_path("/a/b/x.pdf"),
            ("/a/b".to_string(), "x.pdf".to_string())
        );
    }

    #[test]
    fn splits_root_level_path() {
        assert_eq!(split_path("/x.pdf"), ("/".to_string(), "x.pdf".to_string()));
    }
}
