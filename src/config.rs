//! Environment-driven configuration.
//!
//! Every external collaborator (C1-C6) is configured exclusively from
//! environment variables per the external interfaces contract. There is no
//! config file layer here — unlike the scraping tool this worker was grown
//! from, there is nothing per-source or per-run to override, so the
//! environment is the whole story.

use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Database connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    /// Private schema preferred by the connection's search_path (see 3.1).
    pub schema: String,
}

/// S3-compatible object store settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

/// OpenSearch (or compatible) settings.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub ca_cert: Option<String>,
    pub timeout_secs: u64,
}

/// RabbitMQ settings.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub ssl: bool,
    pub queue: String,
}

/// Embedding provider settings.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// The fully resolved configuration for a worker process.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub search: SearchConfig,
    pub broker: BrokerConfig,
    pub embedding: EmbeddingConfig,
}

impl Settings {
    /// Load settings from the process environment. Fails fast (taxonomy
    /// class 3: programmer error) if a required variable is absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database = DatabaseConfig {
            uri: required("POSTGRES_URI")?,
            schema: optional("DB_SCHEMA", "insight"),
        };

        let storage = StorageConfig {
            endpoint: required("STORAGE_ENDPOINT")?,
            access_key: required("STORAGE_ACCESS_KEY")?,
            secret_key: required("STORAGE_SECRET_KEY")?,
            bucket: required("STORAGE_BUCKET")?,
            region: optional("STORAGE_REGION", "us-east-1"),
        };

        let search = SearchConfig {
            endpoint: required("OPENSEARCH_ENDPOINT")?,
            user: env::var("OPENSEARCH_USER").ok(),
            password: env::var("OPENSEARCH_PASSWORD").ok(),
            ca_cert: env::var("OPENSEARCH_CA_CERT").ok(),
            timeout_secs: parse_u64("SEARCH_TIMEOUT_SECS", 30)?,
        };

        let broker = BrokerConfig {
            host: required("RABBITMQ_HOST")?,
            user: required("RABBITMQ_USER")?,
            password: required("RABBITMQ_PASSWORD")?,
            ssl: parse_bool("RABBITMQ_SSL"),
            queue: required("QUEUE")?,
        };

        let embedding = EmbeddingConfig {
            endpoint: optional(
                "EMBEDDING_ENDPOINT",
                "https://api.openai.com/v1/embeddings",
            ),
            api_key: required("OPENAI_API_KEY")?,
            model: optional("EMBEDDING_MODEL", "text-embedding-3-small"),
            timeout_secs: parse_u64("EMBEDDING_TIMEOUT_SECS", 30)?,
        };

        Ok(Self {
            database,
            storage,
            search,
            broker,
            embedding,
        })
    }

    /// Logs the resolved configuration at startup with every credential
    /// redacted to `***` (SPEC_FULL 2.1). Mirrors the teacher's
    /// `redact_url_password` approach of showing shape/host without secrets.
    pub fn log_resolved(&self) {
        tracing::info!(
            database.schema = %self.database.schema,
            storage.endpoint = %self.storage.endpoint,
            storage.bucket = %self.storage.bucket,
            storage.region = %self.storage.region,
            search.endpoint = %self.search.endpoint,
            search.user = %self.search.user.as_deref().unwrap_or("-"),
            search.ca_cert = %self.search.ca_cert.as_deref().unwrap_or("-"),
            broker.host = %self.broker.host,
            broker.user = %self.broker.user,
            broker.ssl = self.broker.ssl,
            broker.queue = %self.broker.queue,
            embedding.endpoint = %self.embedding.endpoint,
            embedding.model = %self.embedding.model,
            "resolved configuration"
        );
    }
}

fn parse_bool(name: &'static str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
