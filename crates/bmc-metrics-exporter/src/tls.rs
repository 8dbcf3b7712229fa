//! TLS client configuration for the HTTP transport.

use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    sync::Arc,
};

use rustls::{ClientConfig, RootCertStore};

use crate::policy::TlsMode;

/// Error initializing the TLS client context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TlsError {
    /// Cannot read the CA certificates file.
    #[error("failed reading CA certificates from `{}`", .path.display())]
    ReadCa {
        /// Path to the file.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: io::Error,
    },
    /// CA certificates file contains no certificates.
    #[error("no CA certificates found in `{}`", .0.display())]
    NoCertificates(PathBuf),
    /// CA certificate was rejected by the root store.
    #[error("invalid CA certificate")]
    InvalidCertificate(#[source] rustls::Error),
    /// Protocol versions are not supported by the crypto provider.
    #[error("unsupported TLS protocol versions")]
    ProtocolVersions(#[source] rustls::Error),
}

fn load_ca_file(path: &Path, root_store: &mut RootCertStore) -> Result<(), TlsError> {
    let read_err = |source| TlsError::ReadCa {
        path: path.to_owned(),
        source,
    };
    let mut reader = BufReader::new(File::open(path).map_err(read_err)?);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_owned()));
    }
    for cert in certs {
        root_store
            .add(cert)
            .map_err(TlsError::InvalidCertificate)?;
    }
    Ok(())
}

/// Builds a client config for the specified verification `mode`. `ca_file` is only read
/// in the [`TlsMode::Verify`] mode.
pub(crate) fn client_config(
    mode: TlsMode,
    ca_file: Option<&Path>,
) -> Result<Arc<ClientConfig>, TlsError> {
    let builder =
        ClientConfig::builder_with_provider(rustls::crypto::ring::default_provider().into())
            .with_safe_default_protocol_versions()
            .map_err(TlsError::ProtocolVersions)?;

    let config = match mode {
        TlsMode::Verify => {
            let mut root_store = RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            if let Some(path) = ca_file {
                load_ca_file(path, &mut root_store)?;
            }
            builder
                .with_root_certificates(root_store)
                .with_no_client_auth()
        }
        TlsMode::InsecureSkipVerify => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(danger::NoVerifier))
            .with_no_client_auth(),
    };
    Ok(Arc::new(config))
}

mod danger {
    use rustls::{
        client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        pki_types::{CertificateDer, ServerName, UnixTime},
        DigitallySignedStruct, Error, SignatureScheme,
    };

    /// Accepts any server certificate.
    #[derive(Debug)]
    pub(super) struct NoVerifier;

    impl ServerCertVerifier for NoVerifier {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            rustls::crypto::ring::default_provider()
                .signature_verification_algorithms
                .supported_schemes()
        }
    }
}
