//! PostgreSQL connection pool construction.
//!
//! One [`Pool`] is shared by the catalog store, the table manager and the row
//! gateway. Timeouts are enforced in three places: TCP connect, waiting for
//! a pooled connection, and a server-side `statement_timeout` applied to
//! every session.

use std::sync::Arc;
use std::time::Duration;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use rustls::ClientConfig;
use tokio_postgres::Config as PgConfig;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::error::{RegistryError, Result};

/// TCP connect timeout for new connections.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// SSL verification modes for PostgreSQL connections.
///
/// These modes match PostgreSQL's standard `sslmode` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// No SSL/TLS (plain TCP connection).
    #[default]
    Disable,
    /// Use SSL but don't verify server certificate.
    Require,
    /// Verify server certificate against CA.
    VerifyCa,
    /// Full certificate and hostname verification.
    VerifyFull,
}

impl SslMode {
    /// Parse an SSL mode from a string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "disable" | "" => Ok(SslMode::Disable),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(RegistryError::Config(format!(
                "Invalid ssl_mode '{}'. Valid values: disable, require, verify-ca, verify-full",
                other
            ))),
        }
    }

    /// Check if this mode requires TLS.
    pub fn requires_tls(&self) -> bool {
        !matches!(self, SslMode::Disable)
    }
}

/// Create the shared connection pool and verify it with `SELECT 1`.
pub async fn connect(config: &DatabaseConfig) -> Result<Pool> {
    let pool = build_pool(config)?;

    let client = pool.get().await?;
    client
        .simple_query("SELECT 1")
        .await
        .map_err(|e| RegistryError::storage("testing PostgreSQL connection", e))?;

    info!("Connected to PostgreSQL: {}", config.display_target());
    Ok(pool)
}

/// Build the pool without opening a connection.
pub fn build_pool(config: &DatabaseConfig) -> Result<Pool> {
    let pg_config = pg_config(config);
    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };

    let ssl_mode = SslMode::parse(&config.ssl_mode)?;
    let mgr = if ssl_mode.requires_tls() {
        let tls = MakeRustlsConnect::new(build_tls_config(ssl_mode)?);
        Manager::from_config(pg_config, tls, mgr_config)
    } else {
        warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
        Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config)
    };

    Pool::builder(mgr)
        .max_size(config.max_connections)
        .wait_timeout(Some(config.pool_timeout()))
        .create_timeout(Some(config.pool_timeout()))
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| RegistryError::pool(e, "creating PostgreSQL pool"))
}

fn pg_config(config: &DatabaseConfig) -> PgConfig {
    let mut pg_config = PgConfig::new();
    pg_config.host(&config.host);
    pg_config.port(config.port);
    pg_config.dbname(&config.database);
    pg_config.user(&config.user);
    pg_config.password(&config.password);
    pg_config.application_name("schema-registry");

    pg_config.keepalives(true);
    pg_config.keepalives_idle(Duration::from_secs(30));
    pg_config.connect_timeout(CONNECT_TIMEOUT);
    pg_config.options(&statement_timeout_option(config.statement_timeout()));

    pg_config
}

/// Startup option that sets the per-session statement timeout.
fn statement_timeout_option(timeout: Duration) -> String {
    format!("-c statement_timeout={}", timeout.as_millis())
}

/// Build the rustls client configuration for a TLS mode.
fn build_tls_config(ssl_mode: SslMode) -> Result<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| RegistryError::Config(format!("TLS setup failed: {}", e)))?;

    let config = match ssl_mode {
        SslMode::Disable => {
            return Err(RegistryError::Config(
                "Cannot build TLS config for ssl_mode=disable".into(),
            ));
        }
        SslMode::Require => {
            warn!(
                "ssl_mode=require enables TLS but does NOT verify the server certificate. \
                 Use ssl_mode=verify-full in production."
            );
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth()
        }
        SslMode::VerifyCa | SslMode::VerifyFull => {
            info!("ssl_mode={:?}: certificate verification enabled", ssl_mode);
            let mut root_store = rustls::RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder
                .with_root_certificates(root_store)
                .with_no_client_auth()
        }
    };

    Ok(config)
}

/// Certificate verifier that accepts any certificate, for `ssl_mode=require`.
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
