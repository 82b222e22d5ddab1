//! Search adapter (C2): create/delete the `inodes` index with its fixed
//! mapping, and upsert/delete per-inode documents.

pub mod document;

use std::time::Duration;

use async_trait::async_trait;
use opensearch::auth::Credentials;
use opensearch::cert::{Certificate, CertificateValidation};
use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use opensearch::http::Url;
use opensearch::indices::{IndicesCreateParts, IndicesDeleteParts};
use opensearch::{DeleteParts, OpenSearch};
use serde_json::json;
use thiserror::Error;

pub use document::InodeDocument;

use crate::config::SearchConfig;

const INDEX_NAME: &str = "inodes";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("failed to build search transport: {0}")]
    Transport(String),
    #[error("index create failed: {0}")]
    Create(String),
    #[error("index delete failed: {0}")]
    Delete(String),
    #[error("document upsert failed for inode {id}: {source}")]
    Upsert { id: i64, source: String },
    #[error("document delete failed for inode {id}: {source}")]
    DeleteDoc { id: i64, source: String },
    #[error("failed to read CA certificate at {path}: {source}")]
    CaCert { path: String, source: String },
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn create_index(&self) -> Result<(), SearchError>;
    async fn delete_index(&self) -> Result<(), SearchError>;
    async fn upsert(&self, inode_id: i64, document: &InodeDocument) -> Result<(), SearchError>;
    async fn delete(&self, inode_id: i64) -> Result<(), SearchError>;
}

pub struct OpenSearchIndex {
    client: OpenSearch,
}

impl OpenSearchIndex {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let url = Url::parse(&config.endpoint)
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        let pool = SingleNodeConnectionPool::new(url);
        let cert_validation = match &config.ca_cert {
            Some(path) => {
                let pem = std::fs::read(path).map_err(|e| SearchError::CaCert {
                    path: path.clone(),
                    source: e.to_string(),
                })?;
                let cert = Certificate::from_pem(&pem).map_err(|e| SearchError::CaCert {
                    path: path.clone(),
                    source: e.to_string(),
                })?;
                CertificateValidation::Full(cert)
            }
            None => CertificateValidation::Default,
        };
        let mut builder = TransportBuilder::new(pool)
            .timeout(Duration::from_secs(config.timeout_secs))
            .cert_validation(cert_validation);

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.auth(Credentials::Basic(user.clone(), password.clone()));
        }

        let transport = builder
            .build()
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    /// The fixed mapping from SPEC_FULL 6: a `path_analyzer` using a
    /// `path_hierarchy` tokenizer on `folder`, and a nested `pages` object
    /// whose `contents` field stores term vectors for highlighting.
    fn mapping() -> serde_json::Value {
        json!({
            "settings": {
                "analysis": {
                    "tokenizer": {
                        "path_hierarchy_tokenizer": {
                            "type": "path_hierarchy",
                            "delimiter": "/"
                        }
                    },
                    "analyzer": {
                        "path_analyzer": {
                            "type": "custom",
                            "tokenizer": "path_hierarchy_tokenizer"
                        }
                    }
                }
            },
            "mappings": {
                "properties": {
                    "path": { "type": "keyword" },
                    "type": { "type": "keyword" },
                    "folder": {
                        "type": "text",
                        "analyzer": "path_analyzer",
                        "fielddata": true
                    },
                    "filename": { "type": "text" },
                    "owner_id": { "type": "keyword" },
                    "is_public": { "type": "boolean" },
                    "readable_by": { "type": "keyword" },
                    "pages": {
                        "type": "nested",
                        "properties": {
                            "index": { "type": "integer" },
                            "contents": {
                                "type": "text",
                                "term_vector": "with_positions_offsets"
                            }
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl SearchIndex for OpenSearchIndex {
    async fn create_index(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(INDEX_NAME))
            .body(Self::mapping())
            .send()
            .await
            .map_err(|e| SearchError::Create(e.to_string()))?;

        if response.status_code().is_success() {
            return Ok(());
        }

        let status = response.status_code();
        let body: serde_json::Value = response
            .json()
            .await
            .unwrap_or_else(|_| json!({}));
        let already_exists = body
            .pointer("/error/type")
            .and_then(|v| v.as_str())
            .map(|t| t == "resource_already_exists_exception")
            .unwrap_or(false);

        if already_exists {
            return Ok(());
        }

        Err(SearchError::Create(format!("{status}: {body}")))
    }

    async fn delete_index(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[INDEX_NAME]))
            .send()
            .await
            .map_err(|e| SearchError::Delete(e.to_string()))?;

        if response.status_code().is_success() || response.status_code().as_u16() == 404 {
            return Ok(());
        }

        Err(SearchError::Delete(response.status_code().to_string()))
    }

    async fn upsert(&self, inode_id: i64, document: &InodeDocument) -> Result<(), SearchError> {
        let response = self
            .client
            .index(opensearch::IndexParts::IndexId(
                INDEX_NAME,
                &inode_id.to_string(),
            ))
            .body(document)
            .send()
            .await
            .map_err(|e| SearchError::Upsert {
                id: inode_id,
                source: e.to_string(),
            })?;

        if response.status_code().is_success() {
            Ok(())
        } else {
            Err(SearchError::Upsert {
                id: inode_id,
                source: response.status_code().to_string(),
            })
        }
    }

    async fn delete(&self, inode_id: i64) -> Result<(), SearchError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(INDEX_NAME, &inode_id.to_string()))
            .send()
            .await
            .map_err(|e| SearchError::DeleteDoc {
                id: inode_id,
                source: e.to_string(),
            })?;

        if response.status_code().is_success() || response.status_code().as_u16() == 404 {
            Ok(())
        } else {
            Err(SearchError::DeleteDoc {
                id: inode_id,
                source: response.status_code().to_string(),
            })
        }
    }
}
