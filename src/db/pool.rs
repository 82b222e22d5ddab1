//! PostgreSQL connection pool, built on diesel-async + deadpool.
//!
//! Connections are established over rustls TLS using the system trust store,
//! the same posture the teacher's `pg_tls` module takes for its Postgres
//! migration path.

use diesel::ConnectionError;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, ManagerConfig};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::DbError;

pub type PgConn = diesel_async::pooled_connection::deadpool::Object<AsyncPgConnection>;

#[derive(Clone)]
pub struct DbPool {
    pool: Pool<AsyncPgConnection>,
}

fn build_tls_connector() -> Result<tokio_postgres_rustls::MakeRustlsConnect, ConnectionError> {
    let loaded = rustls_native_certs::load_native_certs();
    for err in &loaded.errors {
        tracing::warn!(%err, "error loading a system certificate");
    }

    let mut roots = rustls::RootCertStore::empty();
    for cert in loaded.certs {
        if let Err(err) = roots.add(cert) {
            tracing::warn!(%err, "skipping invalid system certificate");
        }
    }

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(tokio_postgres_rustls::MakeRustlsConnect::new(config))
}

/// Establish one pooled connection: connect over TLS, then set the
/// search_path to the worker's private schema (SPEC_FULL 3.1).
fn establish_connection(database_url: &str, schema: String) -> BoxFuture<'_, diesel::ConnectionResult<AsyncPgConnection>> {
    async move {
        let tls = build_tls_connector()?;
        let (client, connection) = tokio_postgres::connect(database_url, tls)
            .await
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;

        let mut conn = AsyncPgConnection::try_from_client_and_connection(client, connection).await?;

        diesel::sql_query(format!("SET search_path TO {schema}, public"))
            .execute(&mut conn)
            .await
            .map_err(|e| ConnectionError::CouldntSetupConfiguration(e))?;

        Ok(conn)
    }
    .boxed()
}

impl DbPool {
    /// Connect to Postgres, setting `search_path` to the configured private
    /// schema first (falling back to `public`) on every pooled connection.
    pub fn new(database_url: &str, schema: &str, max_size: usize) -> Result<Self, DbError> {
        let schema = schema.to_string();

        let mut manager_config = ManagerConfig::default();
        manager_config.custom_setup = Box::new(move |url| establish_connection(url, schema.clone()));

        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
            database_url,
            manager_config,
        );

        let pool = Pool::builder(manager)
            .max_size(max_size)
            .build()
            .map_err(|e| DbError::Pool(e.to_string()))?;

        Ok(Self { pool })
    }

    pub async fn get(&self) -> Result<PgConn, DbError> {
        self.pool
            .get()
            .await
            .map_err(|e| DbError::Pool(e.to_string()))
    }
}
