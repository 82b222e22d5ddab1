//! Routing keys and payload shapes for the task/notification exchanges
//! (SPEC_FULL 6).

use serde::{Deserialize, Serialize};

/// The six routing keys the dispatcher accepts. Everything else is a
/// permanent reject (taxonomy class 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingKey {
    IngestInode,
    EmbedInode,
    IndexInode,
    MoveInode,
    ShareInode,
    DeleteInode,
}

impl RoutingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingKey::IngestInode => "ingest_inode",
            RoutingKey::EmbedInode => "embed_inode",
            RoutingKey::IndexInode => "index_inode",
            RoutingKey::MoveInode => "move_inode",
            RoutingKey::ShareInode => "share_inode",
            RoutingKey::DeleteInode => "delete_inode",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ingest_inode" => Some(RoutingKey::IngestInode),
            "embed_inode" => Some(RoutingKey::EmbedInode),
            "index_inode" => Some(RoutingKey::IndexInode),
            "move_inode" => Some(RoutingKey::MoveInode),
            "share_inode" => Some(RoutingKey::ShareInode),
            "delete_inode" => Some(RoutingKey::DeleteInode),
            _ => None,
        }
    }
}

/// `{"after": {"id": <int>}}` — the payload shape for every routing key
/// except `delete_inode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AfterEnvelope {
    pub after: AfterBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AfterBody {
    pub id: i64,
}

impl AfterEnvelope {
    pub fn new(id: i64) -> Self {
        Self {
            after: AfterBody { id },
        }
    }
}

/// `{"before": {"id":…, "owner_id":…, "path":…, "type":…}}` — `delete_inode`
/// carries the full row since the database record is already gone by the
/// time the handler runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeforeEnvelope {
    pub before: BeforeBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeforeBody {
    pub id: i64,
    pub owner_id: String,
    pub path: String,
    #[serde(rename = "type")]
    pub inode_type: String,
}

/// `{"id": <inode_id>, "task": "<stage>"}` — the notification-exchange
/// payload, emitted only on terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub id: i64,
    pub task: String,
}

pub fn parse_after(bytes: &[u8]) -> Result<i64, serde_json::Error> {
    let envelope: AfterEnvelope = serde_json::from_slice(bytes)?;
    Ok(envelope.after.id)
}

pub fn parse_before(bytes: &[u8]) -> Result<BeforeBody, serde_json::Error> {
    let envelope: BeforeEnvelope = serde_json::from_slice(bytes)?;
    Ok(envelope.before)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_key_str_round_trips() {
        let keys = [
            RoutingKey::IngestInode,
            RoutingKey::EmbedInode,
            RoutingKey::IndexInode,
            RoutingKey::MoveInode,
            RoutingKey::ShareInode,
            RoutingKey::DeleteInode,
        ];
        for key in keys {
            assert_eq!(RoutingKey::from_str(key.as_str()), Some(key));
        }
        assert_eq!(RoutingKey::from_str("unknown_inode"), None);
    }

    #[test]
    fn parse_after_reads_nested_id() {
        let body = br#"{"after": {"id": 42}}"#;
        assert_eq!(parse_after(body).unwrap(), 42);
    }

    #[test]
    fn parse_before_reads_full_payload() {
        let body = br#"{"before": {"id": 7, "owner_id": "u1", "path": "/a.pdf", "type": "file"}}"#;
        let before = parse_before(body).unwrap();
        assert_eq!(before.id, 7);
        assert_eq!(before.owner_id, "u1");
        assert_eq!(before.path, "/a.pdf");
        assert_eq!(before.inode_type, "file");
    }
}
