//! TLS 1.3 configuration builder.
//!
//! TLS 1.3 only, X25519 and secp256r1 key exchange, optional mutual
//! authentication, optional pinned server-certificate fingerprint
//! (SHA-256 over the end-entity DER, compared in constant time).

use crate::hashing::sha256;
use crate::CryptoError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::server::WebPkiClientVerifier;
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, ServerConfig,
    SignatureScheme,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Builder for client/server TLS configurations.
pub struct TlsBuilder {
    roots: RootCertStore,
    identity: Option<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)>,
    pinned_fingerprint: Option<[u8; 32]>,
    require_client_auth: bool,
}

impl TlsBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self {
            roots: RootCertStore::empty(),
            identity: None,
            pinned_fingerprint: None,
            require_client_auth: false,
        }
    }

    /// Trust a DER-encoded root certificate.
    ///
    /// # Errors
    ///
    /// Returns `TlsConfig` when the certificate does not parse.
    pub fn with_root_certificate(mut self, der: &[u8]) -> Result<Self, CryptoError> {
        self.roots
            .add(CertificateDer::from(der.to_vec()))
            .map_err(|e| CryptoError::TlsConfig(e.to_string()))?;
        Ok(self)
    }

    /// Present this certificate chain and key (client identity for mTLS,
    /// or the server's own identity).
    pub fn with_identity(
        mut self,
        chain: Vec<Vec<u8>>,
        key_der: Vec<u8>,
    ) -> Result<Self, CryptoError> {
        let chain: Vec<CertificateDer<'static>> =
            chain.into_iter().map(CertificateDer::from).collect();
        let key = PrivateKeyDer::try_from(key_der)
            .map_err(|e| CryptoError::TlsConfig(e.to_string()))?;
        self.identity = Some((chain, key));
        Ok(self)
    }

    /// Accept only the server certificate with this SHA-256 fingerprint,
    /// bypassing chain validation.
    pub fn with_pinned_fingerprint(mut self, fingerprint: [u8; 32]) -> Self {
        self.pinned_fingerprint = Some(fingerprint);
        self
    }

    /// Require clients to present a certificate (server side).
    pub fn with_mutual_auth(mut self) -> Self {
        self.require_client_auth = true;
        self
    }

    fn provider() -> Arc<CryptoProvider> {
        let mut provider = ring::default_provider();
        provider.kx_groups = vec![ring::kx_group::X25519, ring::kx_group::SECP256R1];
        Arc::new(provider)
    }

    /// Build a TLS 1.3 client configuration.
    ///
    /// # Errors
    ///
    /// Returns `TlsConfig` on inconsistent inputs (e.g. no roots and no
    /// pinned fingerprint).
    pub fn build_client(self) -> Result<ClientConfig, CryptoError> {
        let provider = Self::provider();
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_protocol_versions(&[&rustls::version::TLS13])
            .map_err(|e| CryptoError::TlsConfig(e.to_string()))?;

        let builder = if let Some(fingerprint) = self.pinned_fingerprint {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(PinnedCertVerifier {
                    fingerprint,
                    provider,
                }))
        } else {
            if self.roots.is_empty() {
                return Err(CryptoError::TlsConfig(
                    "no trust roots and no pinned fingerprint".into(),
                ));
            }
            builder.with_root_certificates(self.roots)
        };

        match self.identity {
            Some((chain, key)) => builder
                .with_client_auth_cert(chain, key)
                .map_err(|e| CryptoError::TlsConfig(e.to_string())),
            None => Ok(builder.with_no_client_auth()),
        }
    }

    /// Build a TLS 1.3 server configuration.
    ///
    /// # Errors
    ///
    /// Returns `TlsConfig` when no identity was supplied or the
    /// client-verifier roots are missing under mutual auth.
    pub fn build_server(self) -> Result<ServerConfig, CryptoError> {
        let (chain, key) = self
            .identity
            .ok_or_else(|| CryptoError::TlsConfig("server identity required".into()))?;

        let builder = ServerConfig::builder_with_provider(Self::provider())
            .with_protocol_versions(&[&rustls::version::TLS13])
            .map_err(|e| CryptoError::TlsConfig(e.to_string()))?;

        let builder = if self.require_client_auth {
            let verifier = WebPkiClientVerifier::builder(Arc::new(self.roots))
                .build()
                .map_err(|e| CryptoError::TlsConfig(e.to_string()))?;
            builder.with_client_cert_verifier(verifier)
        } else {
            builder.with_no_client_auth()
        };

        builder
            .with_single_cert(chain, key)
            .map_err(|e| CryptoError::TlsConfig(e.to_string()))
    }
}

impl Default for TlsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Verifier that accepts exactly one pinned end-entity certificate.
#[derive(Debug)]
struct PinnedCertVerifier {
    fingerprint: [u8; 32],
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for PinnedCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let observed = sha256(end_entity.as_ref());
        if observed.ct_eq(&self.fingerprint).into() {
            Ok(ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        // TLS 1.2 is disabled by construction.
        Err(rustls::Error::PeerIncompatible(
            rustls::PeerIncompatible::Tls12NotOffered,
        ))
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
