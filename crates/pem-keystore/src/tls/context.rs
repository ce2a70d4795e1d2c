//! rustls server and client configurations built from a [`StoreBundle`].
//!
//! Both configs share one set of key managers and trust managers:
//! - Ring crypto provider
//! - TLS 1.2 and 1.3 unless [`ContextOptions::tls13_only`] is set
//! - The server requests client certificates whenever the trust store is
//!   non-empty, but does not require them

use std::sync::Arc;

use rand::{CryptoRng, RngCore};
use rustls::server::WebPkiClientVerifier;
use rustls::{
    ClientConfig, ClientConnection, ServerConfig, ServerConnection, SupportedProtocolVersion,
};
use rustls_pki_types::ServerName;
use tracing::info;

use crate::assembler::{MaterialAssembler, PemMaterial, StoreBundle};
use crate::error::{KeystoreError, Result};
use crate::tls::managers::{
    key_managers, ring_provider, trust_managers, KeyManagers, TrustManagers,
};

static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

/// Protocol settings applied to both sides of a [`TlsContext`].
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    alpn_protocols: Vec<Vec<u8>>,
    tls13_only: bool,
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise `protocol` via ALPN, after any already added.
    pub fn with_alpn_protocol(mut self, protocol: impl Into<Vec<u8>>) -> Self {
        self.alpn_protocols.push(protocol.into());
        self
    }

    /// Refuse TLS 1.2.
    pub fn tls13_only(mut self) -> Self {
        self.tls13_only = true;
        self
    }

    pub fn alpn_protocols(&self) -> &[Vec<u8>] {
        &self.alpn_protocols
    }

    fn protocol_versions(&self) -> &'static [&'static SupportedProtocolVersion] {
        if self.tls13_only {
            TLS13_ONLY
        } else {
            rustls::DEFAULT_VERSIONS
        }
    }
}

/// A ready-to-use TLS context: one server config and one client config
/// presenting the same identity and trusting the same anchors.
#[derive(Debug, Clone)]
pub struct TlsContext {
    server: Arc<ServerConfig>,
    client: Arc<ClientConfig>,
}

impl TlsContext {
    /// Initialize both configs from already-built managers.
    pub fn from_managers(
        keys: KeyManagers,
        trust: TrustManagers,
        options: &ContextOptions,
    ) -> Result<Self> {
        let provider = ring_provider();
        let keys = Arc::new(keys);

        let server_builder = ServerConfig::builder_with_provider(provider.clone())
            .with_protocol_versions(options.protocol_versions())
            .map_err(|e| KeystoreError::TlsConfiguration(format!("TLS version config: {e}")))?;
        let server_builder = if trust.is_empty() {
            server_builder.with_no_client_auth()
        } else {
            let verifier =
                WebPkiClientVerifier::builder_with_provider(trust.roots(), provider.clone())
                    .allow_unauthenticated()
                    .build()
                    .map_err(|e| {
                        KeystoreError::TlsConfiguration(format!("client verifier config: {e}"))
                    })?;
            server_builder.with_client_cert_verifier(verifier)
        };
        let mut server = server_builder.with_cert_resolver(keys.clone());
        server.alpn_protocols = options.alpn_protocols.clone();

        let mut client = ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(options.protocol_versions())
            .map_err(|e| KeystoreError::TlsConfiguration(format!("TLS version config: {e}")))?
            .with_root_certificates(trust.roots())
            .with_client_cert_resolver(keys);
        client.alpn_protocols = options.alpn_protocols.clone();

        Ok(Self {
            server: Arc::new(server),
            client: Arc::new(client),
        })
    }

    pub fn server_config(&self) -> Arc<ServerConfig> {
        self.server.clone()
    }

    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client.clone()
    }

    /// Start a server-side session.
    pub fn new_server_connection(&self) -> Result<ServerConnection> {
        ServerConnection::new(self.server.clone())
            .map_err(|e| KeystoreError::TlsConfiguration(format!("server connection: {e}")))
    }

    /// Start a client-side session to `server_name` (a DNS name or IP address).
    pub fn new_client_connection(&self, server_name: &str) -> Result<ClientConnection> {
        let name = ServerName::try_from(server_name.to_string()).map_err(|e| {
            KeystoreError::TlsConfiguration(format!("server name {server_name:?}: {e}"))
        })?;
        ClientConnection::new(self.client.clone(), name)
            .map_err(|e| KeystoreError::TlsConfiguration(format!("client connection: {e}")))
    }
}

/// Assemble stores from `material` and build a context with default options.
pub fn build_context(material: PemMaterial) -> Result<TlsContext> {
    build_context_with(
        &mut MaterialAssembler::new(),
        material,
        &ContextOptions::default(),
    )
}

/// Assemble stores with `assembler`, then build key managers, trust managers
/// and the context. The store password never leaves this call.
pub fn build_context_with<R: RngCore + CryptoRng>(
    assembler: &mut MaterialAssembler<R>,
    material: PemMaterial,
    options: &ContextOptions,
) -> Result<TlsContext> {
    let bundle = assembler.build_stores(material)?;
    context_from_bundle(&bundle, options)
}

/// Build a context from stores assembled earlier.
pub fn context_from_bundle(bundle: &StoreBundle, options: &ContextOptions) -> Result<TlsContext> {
    let keys = key_managers(bundle)?;
    let trust = trust_managers(bundle)?;

    info!(
        identities = keys.aliases().count(),
        trust_anchors = trust.len(),
        tls13_only = options.tls13_only,
        "TLS context initialized"
    );

    TlsContext::from_managers(keys, trust, options)
}
