//! TLS server configuration from PEM files
//!
//! Produces a `rustls::ServerConfig` restricted to TLS 1.2+, ECDHE
//! key exchange over P-256 or X25519, AEAD cipher suites in a fixed
//! order that takes precedence over the client's, and ALPN offering
//! `http/1.1` then `h2`.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rustls::cipher_suite::{
    TLS13_AES_128_GCM_SHA256, TLS13_AES_256_GCM_SHA384, TLS13_CHACHA20_POLY1305_SHA256,
    TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256, TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256, TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384, TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
};
use rustls::kx_group::{SECP256R1, X25519};
use rustls::version::{TLS12, TLS13};
use rustls::{Certificate, PrivateKey, ServerConfig, SupportedCipherSuite};
use rustls_pemfile::Item;

use relay_core::kdebug;

static CIPHER_SUITES: &[SupportedCipherSuite] = &[
    TLS13_AES_256_GCM_SHA384,
    TLS13_CHACHA20_POLY1305_SHA256,
    TLS13_AES_128_GCM_SHA256,
    TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
    TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
];

const ALPN_PROTOCOLS: [&[u8]; 2] = [b"http/1.1", b"h2"];

/// Failure loading a certificate/key pair
#[derive(Debug)]
pub enum TlsError {
    /// The file could not be opened or is not valid PEM
    Io { path: PathBuf, source: std::io::Error },
    /// The certificate file holds no certificates
    NoCertificates(PathBuf),
    /// The key file holds no PKCS#8, RSA or SEC1 private key
    NoPrivateKey(PathBuf),
    /// rustls rejected the configuration
    Rustls(rustls::Error),
}

impl std::fmt::Display for TlsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TlsError::Io { path, source } => write!(f, "reading {}: {}", path.display(), source),
            TlsError::NoCertificates(path) => {
                write!(f, "no certificates found in {}", path.display())
            }
            TlsError::NoPrivateKey(path) => {
                write!(f, "no private key found in {}", path.display())
            }
            TlsError::Rustls(e) => write!(f, "tls config: {}", e),
        }
    }
}

impl std::error::Error for TlsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TlsError::Io { source, .. } => Some(source),
            TlsError::Rustls(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rustls::Error> for TlsError {
    fn from(e: rustls::Error) -> Self {
        TlsError::Rustls(e)
    }
}

/// Build a server TLS configuration from a PEM certificate chain and key.
pub fn new_tls_config_from_file(
    cert_file: impl AsRef<Path>,
    key_file: impl AsRef<Path>,
) -> Result<ServerConfig, TlsError> {
    let certs = load_certs(cert_file.as_ref())?;
    let key = load_key(key_file.as_ref())?;

    let mut config = ServerConfig::builder()
        .with_cipher_suites(CIPHER_SUITES)
        .with_kx_groups(&[&SECP256R1, &X25519])
        .with_protocol_versions(&[&TLS13, &TLS12])?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.ignore_client_order = true;
    config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();

    kdebug!(
        "tls config loaded: cert={}, key={}",
        cert_file.as_ref().display(),
        key_file.as_ref().display()
    );
    Ok(config)
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn load_certs(path: &Path) -> Result<Vec<Certificate>, TlsError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader).map_err(|source| TlsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs.into_iter().map(Certificate).collect())
}

/// First private key in the file, in any supported encoding.
fn load_key(path: &Path) -> Result<PrivateKey, TlsError> {
    let mut reader = open(path)?;
    let items = rustls_pemfile::read_all(&mut reader).map_err(|source| TlsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    items
        .into_iter()
        .find_map(|item| match item {
            Item::PKCS8Key(der) | Item::RSAKey(der) | Item::ECKey(der) => Some(PrivateKey(der)),
            _ => None,
        })
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scratch(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "relay-tls-{}-{}.pem",
            std::process::id(),
            name
        ));
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn testdata(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
    }

    #[test]
    fn test_loads_valid_pair() {
        let config =
            new_tls_config_from_file(testdata("cert.pem"), testdata("key.pem")).unwrap();
        assert_eq!(
            config.alpn_protocols,
            vec![b"http/1.1".to_vec(), b"h2".to_vec()]
        );
        assert!(config.ignore_client_order);
    }

    #[test]
    fn test_key_file_is_not_a_certificate() {
        let err = new_tls_config_from_file(testdata("key.pem"), testdata("key.pem")).unwrap_err();
        assert!(matches!(err, TlsError::NoCertificates(_)));

        let err = new_tls_config_from_file(testdata("cert.pem"), testdata("cert.pem")).unwrap_err();
        assert!(matches!(err, TlsError::NoPrivateKey(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = new_tls_config_from_file("/nonexistent/cert.pem", "/nonexistent/key.pem")
            .unwrap_err();
        match &err {
            TlsError::Io { path, source } => {
                assert_eq!(path, Path::new("/nonexistent/cert.pem"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("/nonexistent/cert.pem"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_file_without_certificates() {
        let cert = scratch("nocert", "not a pem file\n");
        let err = new_tls_config_from_file(&cert, &cert).unwrap_err();
        assert!(matches!(err, TlsError::NoCertificates(ref p) if p == &cert));
        let _ = std::fs::remove_file(cert);
    }

    #[test]
    fn test_file_without_private_key() {
        // Well-formed PEM framing is enough to get past certificate parsing.
        let cert = scratch(
            "certonly",
            "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n",
        );
        let err = new_tls_config_from_file(&cert, &cert).unwrap_err();
        assert!(matches!(err, TlsError::NoPrivateKey(ref p) if p == &cert));
        let _ = std::fs::remove_file(cert);
    }

    #[test]
    fn test_rustls_error_converts() {
        let err: TlsError = rustls::Error::General("bad".into()).into();
        assert!(matches!(err, TlsError::Rustls(_)));
        let text = err.to_string();
        assert!(text.starts_with("tls config: ") && text.contains("bad"));
    }
}
