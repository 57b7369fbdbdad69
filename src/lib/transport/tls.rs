use axum_server::tls_rustls::RustlsConfig;
use std::path::PathBuf;

/// PEM certificate chain and private key for serving HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

pub async fn configure_tls(config: &TlsConfig) -> Result<RustlsConfig, anyhow::Error> {
    RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load TLS files {:?}: {}", config.cert_path, e))
}
