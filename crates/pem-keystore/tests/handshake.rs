//! Integration tests: PEM material to a completed TLS handshake.
//!
//! Both endpoints are built from the same kind of input a deployment would
//! mount: a leaf certificate, its key and a CA bundle. The handshake runs
//! over in-memory buffers.

use rustls::{ClientConnection, ServerConnection};

use pem_keystore::{build_context, build_context_with, ContextOptions, MaterialAssembler};
use pem_keystore::{KeystoreError, PemMaterial, PemSource, TlsContext};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_test_writer()
        .try_init();
}

/// A CA and a `localhost` leaf it signed, all as PEM text.
struct Pki {
    ca_pem: String,
    leaf_pem: String,
    leaf_key_pem: String,
}

fn make_pki(ca_name: &str) -> Pki {
    let ca_key = rcgen::KeyPair::generate().expect("CA key generation should succeed");
    let mut ca_params =
        rcgen::CertificateParams::new(Vec::<String>::new()).expect("CA params should be valid");
    ca_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    ca_params
        .distinguished_name
        .push(rcgen::DnType::CommonName, ca_name);
    let ca_cert = ca_params
        .self_signed(&ca_key)
        .expect("CA self-signing should succeed");

    let leaf_key = rcgen::KeyPair::generate().expect("leaf key generation should succeed");
    let mut leaf_params = rcgen::CertificateParams::new(vec!["localhost".to_string()])
        .expect("leaf params should be valid");
    leaf_params
        .distinguished_name
        .push(rcgen::DnType::CommonName, "localhost");
    let leaf_cert = leaf_params
        .signed_by(&leaf_key, &ca_cert, &ca_key)
        .expect("leaf signing should succeed");

    Pki {
        ca_pem: ca_cert.pem(),
        leaf_pem: leaf_cert.pem(),
        leaf_key_pem: leaf_key.serialize_pem(),
    }
}

fn material(pki: &Pki, trusted_ca_pem: &str) -> PemMaterial {
    PemMaterial::new()
        .certificate(PemSource::text("tls.crt", pki.leaf_pem.clone()))
        .private_key(PemSource::text("tls.key", pki.leaf_key_pem.clone()))
        .ca_certificate(PemSource::text("ca.crt", trusted_ca_pem.to_string()))
}

fn io_error(e: std::io::Error) -> rustls::Error {
    rustls::Error::General(e.to_string())
}

fn client_to_server(
    client: &mut ClientConnection,
    server: &mut ServerConnection,
) -> Result<(), rustls::Error> {
    let mut buf = Vec::new();
    while client.wants_write() {
        client.write_tls(&mut buf).map_err(io_error)?;
    }
    let mut rd = buf.as_slice();
    while !rd.is_empty() {
        server.read_tls(&mut rd).map_err(io_error)?;
        server.process_new_packets()?;
    }
    Ok(())
}

fn server_to_client(
    server: &mut ServerConnection,
    client: &mut ClientConnection,
) -> Result<(), rustls::Error> {
    let mut buf = Vec::new();
    while server.wants_write() {
        server.write_tls(&mut buf).map_err(io_error)?;
    }
    let mut rd = buf.as_slice();
    while !rd.is_empty() {
        client.read_tls(&mut rd).map_err(io_error)?;
        client.process_new_packets()?;
    }
    Ok(())
}

fn handshake(
    client: &mut ClientConnection,
    server: &mut ServerConnection,
) -> Result<(), rustls::Error> {
    for _ in 0..16 {
        if !client.is_handshaking() && !server.is_handshaking() {
            return Ok(());
        }
        client_to_server(client, server)?;
        server_to_client(server, client)?;
    }
    Err(rustls::Error::General("handshake did not complete".into()))
}

fn connect(
    server_ctx: &TlsContext,
    client_ctx: &TlsContext,
) -> (ClientConnection, ServerConnection, Result<(), rustls::Error>) {
    let mut server = server_ctx
        .new_server_connection()
        .expect("server connection should start");
    let mut client = client_ctx
        .new_client_connection("localhost")
        .expect("client connection should start");
    let outcome = handshake(&mut client, &mut server);
    (client, server, outcome)
}

// ---------------------------------------------------------------------------
// Mutual TLS with a shared CA
// ---------------------------------------------------------------------------

#[test]
fn mutual_tls_handshake_succeeds() {
    init_tracing();
    let pki = make_pki("Test CA");

    let server_ctx = build_context(material(&pki, &pki.ca_pem)).expect("server context");
    let client_ctx = build_context(material(&pki, &pki.ca_pem)).expect("client context");

    let (client, server, outcome) = connect(&server_ctx, &client_ctx);
    outcome.expect("handshake should succeed");

    let server_seen = server
        .peer_certificates()
        .expect("server should see the client certificate");
    let client_seen = client
        .peer_certificates()
        .expect("client should see the server certificate");
    assert_eq!(server_seen.len(), 1);
    assert_eq!(client_seen.len(), 1);
    assert_eq!(server_seen[0].as_ref(), client_seen[0].as_ref());
}

#[test]
fn negotiates_alpn_and_tls13() {
    init_tracing();
    let pki = make_pki("Test CA");
    let options = ContextOptions::new().with_alpn_protocol("h2").tls13_only();

    let server_ctx =
        build_context_with(&mut MaterialAssembler::new(), material(&pki, &pki.ca_pem), &options)
            .expect("server context");
    let client_ctx =
        build_context_with(&mut MaterialAssembler::new(), material(&pki, &pki.ca_pem), &options)
            .expect("client context");

    let (client, server, outcome) = connect(&server_ctx, &client_ctx);
    outcome.expect("handshake should succeed");

    assert_eq!(client.alpn_protocol(), Some(&b"h2"[..]));
    assert_eq!(server.alpn_protocol(), Some(&b"h2"[..]));
    assert_eq!(
        client.protocol_version(),
        Some(rustls::ProtocolVersion::TLSv1_3)
    );
}

#[test]
fn one_of_several_cas_is_enough() {
    init_tracing();
    let pki = make_pki("Issuing CA");
    let unrelated = make_pki("Unrelated CA");
    let bundle = format!("{}{}", unrelated.ca_pem, pki.ca_pem);

    let server_ctx = build_context(material(&pki, &bundle)).expect("server context");
    let client_ctx = build_context(material(&pki, &bundle)).expect("client context");

    let (_, _, outcome) = connect(&server_ctx, &client_ctx);
    outcome.expect("handshake should succeed with a multi-CA trust store");
}

// ---------------------------------------------------------------------------
// Trust failures
// ---------------------------------------------------------------------------

#[test]
fn client_rejects_server_from_unknown_ca() {
    init_tracing();
    let server_pki = make_pki("Server CA");
    let client_pki = make_pki("Client CA");

    let server_ctx =
        build_context(material(&server_pki, &client_pki.ca_pem)).expect("server context");
    let client_ctx =
        build_context(material(&client_pki, &client_pki.ca_pem)).expect("client context");

    let (_, _, outcome) = connect(&server_ctx, &client_ctx);
    assert!(
        matches!(outcome, Err(rustls::Error::InvalidCertificate(_))),
        "unexpected outcome: {outcome:?}"
    );
}

#[test]
fn server_rejects_client_from_unknown_ca() {
    init_tracing();
    let server_pki = make_pki("Server CA");
    let client_pki = make_pki("Client CA");

    // The client trusts the server, but the server only trusts its own CA.
    let server_ctx =
        build_context(material(&server_pki, &server_pki.ca_pem)).expect("server context");
    let client_ctx =
        build_context(material(&client_pki, &server_pki.ca_pem)).expect("client context");

    let (_, _, outcome) = connect(&server_ctx, &client_ctx);
    assert!(outcome.is_err(), "handshake should fail");
}

#[test]
fn server_with_empty_trust_store_skips_client_auth() {
    init_tracing();
    let pki = make_pki("Test CA");

    let server_ctx = build_context(material(&pki, "")).expect("server context");
    let client_ctx = build_context(material(&pki, &pki.ca_pem)).expect("client context");

    let (_, server, outcome) = connect(&server_ctx, &client_ctx);
    outcome.expect("handshake should succeed");
    assert!(server.peer_certificates().is_none());
}

// ---------------------------------------------------------------------------
// Construction failures
// ---------------------------------------------------------------------------

#[test]
fn key_source_without_blocks_fails() {
    let pki = make_pki("Test CA");
    let material = material(&pki, &pki.ca_pem).private_key(PemSource::text("tls.key", ""));

    match build_context(material) {
        Err(KeystoreError::MissingPrivateKey(alias)) => assert_eq!(alias, "Private Key"),
        other => panic!("expected MissingPrivateKey, got {other:?}"),
    }
}

#[test]
fn certificate_in_key_source_fails_classification() {
    let pki = make_pki("Test CA");
    let material =
        material(&pki, &pki.ca_pem).private_key(PemSource::text("tls.key", pki.leaf_pem.clone()));

    assert!(matches!(
        build_context(material),
        Err(KeystoreError::UnsupportedObjectType { .. })
    ));
}

#[test]
fn two_leaf_certificates_fail() {
    let pki = make_pki("Test CA");
    let doubled = format!("{}{}", pki.leaf_pem, pki.leaf_pem);
    let material = material(&pki, &pki.ca_pem).certificate(PemSource::text("tls.crt", doubled));

    assert!(matches!(
        build_context(material),
        Err(KeystoreError::MultipleCertificates(2))
    ));
}
