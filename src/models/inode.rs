//! The inode entity: a node (folder or file) in a user's hierarchical namespace.

use chrono::{DateTime, Utc};

use crate::error::IngestError;

/// Either a folder or a file. Only files carry object-store content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeType {
    Folder,
    File,
}

impl InodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InodeType::Folder => "folder",
            InodeType::File => "file",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "folder" => Some(InodeType::Folder),
            "file" => Some(InodeType::File),
            _ => None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, InodeType::File)
    }
}

/// A node in the inode tree, as loaded from the `inodes` table.
#[derive(Debug, Clone)]
pub struct Inode {
    pub id: i64,
    pub owner_id: String,
    pub inode_type: InodeType,
    pub name: String,
    pub path: String,
    pub is_indexed: bool,
    pub is_uploaded: bool,
    pub is_ingested: bool,
    pub is_embedded: bool,
    pub is_public: bool,
    pub should_move: bool,
    pub from_page: i32,
    pub to_page: Option<i32>,
    pub error: Option<String>,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Inode {
    /// `is_ready = is_indexed AND is_uploaded AND is_ingested AND is_embedded`.
    pub fn is_ready(&self) -> bool {
        self.is_indexed && self.is_uploaded && self.is_ingested && self.is_embedded
    }

    /// The typed ingest error, if one has been persisted.
    pub fn ingest_error(&self) -> Option<IngestError> {
        self.error.as_deref().and_then(IngestError::from_db_str)
    }

    /// An inode carrying an ingest error is terminal: never re-embed it.
    pub fn is_terminal_error(&self) -> bool {
        self.ingest_error().is_some()
    }

    /// Whether a user-visible notification should fire for this inode's
    /// current state (ready or carrying an error). Re-read the row right
    /// before calling this: other stages may have raced to completion.
    pub fn is_notifiable_terminal_state(&self) -> bool {
        self.is_ready() || self.error.is_some()
    }

    /// Routing key for the notification exchange: `public` or `user-{owner}`.
    pub fn notification_routing_key(&self) -> String {
        if self.is_public {
            "public".to_string()
        } else {
            format!("user-{}", self.owner_id)
        }
    }

    /// The object-store key for the original upload: `users/{owner}{path}`.
    pub fn original_object_key(&self) -> String {
        format!("users/{}{}", self.owner_id, self.path)
    }

    /// The object-store key for the optimized, OCR'd derivative:
    /// `users/{owner}{parent}/{name}_optimized{ext}`.
    pub fn optimized_object_key(&self) -> String {
        crate::storage::keys::optimized_key(&self.owner_id, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Inode {
        Inode {
            id: 1,
            owner_id: "owner-1".to_string(),
            inode_type: InodeType::File,
            name: "doc.pdf".to_string(),
            path: "/doc.pdf".to_string(),
            is_indexed: false,
            is_uploaded: true,
            is_ingested: false,
            is_embedded: false,
            is_public: false,
            should_move: false,
            from_page: 0,
            to_page: None,
            error: None,
            parent_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn is_ready_requires_all_four_flags() {
        let mut inode = base();
        assert!(!inode.is_ready());
        inode.is_indexed = true;
        inode.is_ingested = true;
        inode.is_embedded = true;
        assert!(inode.is_ready(), "is_uploaded was already true in base()");
    }

    #[test]
    fn terminal_error_is_recognized_from_persisted_string() {
        let mut inode = base();
        assert!(!inode.is_terminal_error());
        inode.error = Some("corrupted_file".to_string());
        assert!(inode.is_terminal_error());
        assert_eq!(inode.ingest_error(), Some(IngestError::CorruptedFile));
    }

    #[test]
    fn notifiable_terminal_state_covers_ready_and_errored() {
        let mut inode = base();
        assert!(!inode.is_notifiable_terminal_state());

        inode.error = Some("unsupported_file_type".to_string());
        assert!(inode.is_notifiable_terminal_state());

        inode.error = None;
        inode.is_indexed = true;
        inode.is_ingested = true;
        inode.is_embedded = true;
        assert!(inode.is_notifiable_terminal_state());
    }

    #[test]
    fn notification_routing_key_prefers_public() {
        let mut inode = base();
        assert_eq!(inode.notification_routing_key(), "user-owner-1");
        inode.is_public = true;
        assert_eq!(inode.notification_routing_key(), "public");
    }
}
