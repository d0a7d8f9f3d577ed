//! End-to-end extension negotiation scenarios: a client builds a hello
//! extension block, a server parses it, answers, and the client consumes
//! the answer.

use tlshake::ext::{
    self, AlpnExtension, CookieExtension, Established, ExtensionPayload, ExtensionRegistry,
    ExtensionType, KeyShareClientHello, KeyShareExtension, KeyShareServerHello, ParsePolicy,
    ServerNameExtension, SupportedGroupsExtension, SupportedVersionsClientHello,
    SupportedVersionsExtension,
};
use tlshake::message::{MessageType, NamedGroup, ProtocolVersion};
use tlshake::{Buf, Config};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn policy() -> ParsePolicy {
    ParsePolicy::default()
}

/// Write a request with the two-pass discipline and check the passes
/// agree.
fn build_request(conn: &ExtensionRegistry, defaults: Option<&ExtensionRegistry>) -> Buf {
    let size = ext::request_size(conn, defaults, MessageType::ClientHello);
    let mut wire = Buf::with_capacity(size);
    let written = ext::write_request(conn, defaults, MessageType::ClientHello, &mut wire);
    assert_eq!(size, written);
    wire
}

#[test]
fn sni_alpn_client_server_scenario() {
    init();

    // Client: SNI example.com, ALPN [h2, http/1.1].
    let mut client = ExtensionRegistry::new();
    client.push(ExtensionPayload::ServerName(ServerNameExtension::new(
        "example.com",
    )));
    client.push(ExtensionPayload::Alpn(AlpnExtension::new([
        &b"h2"[..],
        &b"http/1.1"[..],
    ])));

    let wire = build_request(&client, None);

    // Server parses the ClientHello extensions.
    let mut server = ExtensionRegistry::new();
    server
        .parse(&wire, MessageType::ClientHello, ProtocolVersion::TLS1_3, policy())
        .unwrap();

    // The requested name arrived intact.
    let sni = server.find(ExtensionType::ServerName).unwrap();
    let ExtensionPayload::ServerName(name) = &sni.payload else {
        panic!("wrong payload kind");
    };
    assert_eq!(name.host_name, "example.com");
    assert!(sni.response_pending);

    // Server only speaks h2; negotiation picks it.
    let alpn = server
        .find_mut(ExtensionType::ApplicationLayerProtocolNegotiation)
        .unwrap();
    let ExtensionPayload::Alpn(alpn) = &mut alpn.payload else {
        panic!("wrong payload kind");
    };
    let selected = alpn.select(&[&b"h2"[..]], false).unwrap();
    assert_eq!(selected, Some(&b"h2"[..]));

    // Server answers in EncryptedExtensions.
    let size = ext::response_size(&server, None, MessageType::EncryptedExtensions);
    let mut answer = Buf::with_capacity(size);
    let written =
        ext::write_response(&mut server, None, MessageType::EncryptedExtensions, &mut answer);
    assert_eq!(size, written);

    // Client consumes the answer: SNI acknowledged, ALPN resolved to h2.
    client
        .parse(
            &answer,
            MessageType::EncryptedExtensions,
            ProtocolVersion::TLS1_3,
            policy(),
        )
        .unwrap();
    let ExtensionPayload::Alpn(alpn) = &client
        .find(ExtensionType::ApplicationLayerProtocolNegotiation)
        .unwrap()
        .payload
    else {
        panic!("wrong payload kind");
    };
    assert_eq!(alpn.selected_protocol(), Some(&b"h2"[..]));
}

#[test]
fn context_defaults_are_shadowed_by_connection() {
    init();

    // Context-level defaults built once at configuration time.
    let mut defaults = ExtensionRegistry::new();
    defaults.push(ExtensionPayload::ServerName(ServerNameExtension::new(
        "default.example",
    )));
    defaults.push(ExtensionPayload::SupportedGroups(
        SupportedGroupsExtension::default(),
    ));
    let config = Config::builder().default_extensions(defaults).build();

    // Connection overrides the name.
    let mut conn = ExtensionRegistry::new();
    conn.push(ExtensionPayload::ServerName(ServerNameExtension::new(
        "conn.example",
    )));

    let wire = build_request(&conn, Some(config.default_extensions()));

    let mut server = ExtensionRegistry::new();
    server
        .parse(&wire, MessageType::ClientHello, ProtocolVersion::TLS1_3, policy())
        .unwrap();

    // Exactly one server_name arrived, carrying the connection value;
    // supported_groups came from the defaults.
    let ExtensionPayload::ServerName(name) =
        &server.find(ExtensionType::ServerName).unwrap().payload
    else {
        panic!("wrong payload kind");
    };
    assert_eq!(name.host_name, "conn.example");
    assert!(server.find(ExtensionType::SupportedGroups).is_some());
}

#[test]
fn hello_retry_cookie_round_trip() {
    init();

    let cookie_bytes = vec![0xC0, 0x0C, 0x1E, 0x5A, 0x11, 0x22, 0x33, 0x44];

    // Server issues a cookie with its HelloRetryRequest.
    let mut server = ExtensionRegistry::new();
    server.push_response(ExtensionPayload::Cookie(CookieExtension::new(
        cookie_bytes.clone(),
    )));

    let size = ext::response_size(&server, None, MessageType::HelloRetryRequest);
    let mut hrr = Buf::with_capacity(size);
    ext::write_response(&mut server, None, MessageType::HelloRetryRequest, &mut hrr);

    // Writing the retry request leaves the server expecting the echo.
    assert!(server.find(ExtensionType::Cookie).unwrap().response_pending);

    // Client parses the retry request and stores the cookie.
    let mut client = ExtensionRegistry::new();
    client
        .parse(
            &hrr,
            MessageType::HelloRetryRequest,
            ProtocolVersion::TLS1_3,
            policy(),
        )
        .unwrap();

    // The retried ClientHello embeds the exact bytes received.
    let retry = build_request(&client, None);
    let expected_tlv = {
        let mut buf = Buf::new();
        buf.extend_from_slice(&0x002C_u16.to_be_bytes());
        buf.extend_from_slice(&((cookie_bytes.len() + 2) as u16).to_be_bytes());
        buf.extend_from_slice(&(cookie_bytes.len() as u16).to_be_bytes());
        buf.extend_from_slice(&cookie_bytes);
        buf
    };
    assert_eq!(&*retry, &*expected_tlv);

    // Server accepts the echo and clears the pending marker.
    server
        .parse(&retry, MessageType::ClientHello, ProtocolVersion::TLS1_3, policy())
        .unwrap();
    assert!(!server.find(ExtensionType::Cookie).unwrap().response_pending);
}

#[test]
fn tampered_cookie_echo_is_rejected() {
    init();

    let mut server = ExtensionRegistry::new();
    server.push_response(ExtensionPayload::Cookie(CookieExtension::new(vec![
        1, 2, 3, 4,
    ])));
    let mut hrr = Buf::new();
    ext::write_response(&mut server, None, MessageType::HelloRetryRequest, &mut hrr);

    // A forged echo with different bytes.
    let mut forged = ExtensionRegistry::new();
    forged.push(ExtensionPayload::Cookie(CookieExtension::new(vec![
        9, 9, 9, 9,
    ])));
    let forged_wire = {
        let mut buf = Buf::new();
        ext::write_request(&forged, None, MessageType::ClientHello, &mut buf);
        buf
    };

    let result = server.parse(
        &forged_wire,
        MessageType::ClientHello,
        ProtocolVersion::TLS1_3,
        policy(),
    );
    assert_eq!(result.unwrap_err(), tlshake::TlshakeError::CookieMismatch);
}

#[test]
fn key_share_hello_retry_flow() {
    init();

    // Client offers only P-384; server supports only X25519 but the
    // client could do X25519 per its supported_groups.
    let mut client = ExtensionRegistry::new();
    client.push(ExtensionPayload::KeyShare(KeyShareExtension::ClientHello(
        KeyShareClientHello::generate(&[NamedGroup::Secp384r1]).unwrap(),
    )));
    client.push(ExtensionPayload::SupportedGroups(
        SupportedGroupsExtension::new(&[NamedGroup::Secp384r1, NamedGroup::X25519]),
    ));
    client.push(ExtensionPayload::SupportedVersions(
        SupportedVersionsExtension::Offer(SupportedVersionsClientHello::new_tls13(false)),
    ));

    let wire = build_request(&client, None);

    let mut server = ExtensionRegistry::new();
    server
        .parse(&wire, MessageType::ClientHello, ProtocolVersion::TLS1_3, policy())
        .unwrap();

    let ExtensionPayload::KeyShare(KeyShareExtension::ClientHello(offers)) =
        &server.find(ExtensionType::KeyShare).unwrap().payload
    else {
        panic!("wrong payload kind");
    };
    let ExtensionPayload::SupportedGroups(groups) =
        &server.find(ExtensionType::SupportedGroups).unwrap().payload
    else {
        panic!("wrong payload kind");
    };

    // Negotiation cannot use the P-384 share; it asks for X25519.
    let outcome = ext::key_share::establish(offers, groups, &[NamedGroup::X25519]).unwrap();
    let Established::HelloRetry(group) = outcome else {
        panic!("expected hello retry");
    };
    assert_eq!(group, NamedGroup::X25519);

    // Server sends the HRR naming the group; client re-offers and the
    // second round establishes a secret.
    let mut server_out = ExtensionRegistry::new();
    server_out.push_response(ExtensionPayload::KeyShare(
        KeyShareExtension::HelloRetryRequest(tlshake::ext::KeyShareHelloRetryRequest {
            selected_group: group,
        }),
    ));
    let mut hrr = Buf::new();
    ext::write_response(&mut server_out, None, MessageType::HelloRetryRequest, &mut hrr);

    client
        .parse(
            &hrr,
            MessageType::HelloRetryRequest,
            ProtocolVersion::TLS1_3,
            policy(),
        )
        .unwrap();
    let ExtensionPayload::KeyShare(KeyShareExtension::HelloRetryRequest(request)) =
        &client.find(ExtensionType::KeyShare).unwrap().payload
    else {
        panic!("wrong payload kind");
    };
    assert_eq!(request.selected_group, NamedGroup::X25519);

    // Client regenerates for the requested group.
    client.push(ExtensionPayload::KeyShare(KeyShareExtension::ClientHello(
        KeyShareClientHello::generate(&[request.selected_group]).unwrap(),
    )));
    let retry = build_request(&client, None);

    let mut server = ExtensionRegistry::new();
    server
        .parse(&retry, MessageType::ClientHello, ProtocolVersion::TLS1_3, policy())
        .unwrap();
    let ExtensionPayload::KeyShare(KeyShareExtension::ClientHello(offers)) =
        &server.find(ExtensionType::KeyShare).unwrap().payload
    else {
        panic!("wrong payload kind");
    };
    let ExtensionPayload::SupportedGroups(groups) =
        &server.find(ExtensionType::SupportedGroups).unwrap().payload
    else {
        panic!("wrong payload kind");
    };

    let Established::Secret {
        server_entry,
        pre_master_secret,
    } = ext::key_share::establish(offers, groups, &[NamedGroup::X25519]).unwrap()
    else {
        panic!("expected secret");
    };

    // Client finishes with the server's share.
    let mut sh_reg = ExtensionRegistry::new();
    sh_reg.push_response(ExtensionPayload::KeyShare(KeyShareExtension::ServerHello(
        KeyShareServerHello {
            entry: server_entry,
        },
    )));
    let mut sh_wire = Buf::new();
    ext::write_response(&mut sh_reg, None, MessageType::ServerHello, &mut sh_wire);

    client
        .parse(&sh_wire, MessageType::ServerHello, ProtocolVersion::TLS1_3, policy())
        .unwrap();
    let ExtensionPayload::KeyShare(KeyShareExtension::ClientHello(ours)) = &mut client
        .find_mut(ExtensionType::KeyShare)
        .unwrap()
        .payload
    else {
        panic!("wrong payload kind");
    };
    let client_secret = ours.establish().unwrap();
    assert_eq!(&client_secret[..], &pre_master_secret[..]);
}

#[test]
fn round_trip_reconstructs_equivalent_set() {
    init();

    let mut original = ExtensionRegistry::new();
    original.push(ExtensionPayload::ServerName(ServerNameExtension::new(
        "example.com",
    )));
    original.push(ExtensionPayload::Alpn(AlpnExtension::new([&b"h2"[..]])));
    original.push(ExtensionPayload::SupportedGroups(
        SupportedGroupsExtension::default(),
    ));
    original.push(ExtensionPayload::MaxFragmentLength(
        tlshake::ext::MaxFragmentLength::Len2048,
    ));
    original.push(ExtensionPayload::SupportedVersions(
        SupportedVersionsExtension::Offer(SupportedVersionsClientHello::new_tls13(true)),
    ));
    original.push(ExtensionPayload::ExtendedMasterSecret);

    let wire = build_request(&original, None);

    let mut parsed = ExtensionRegistry::new();
    parsed
        .parse(&wire, MessageType::ClientHello, ProtocolVersion::TLS1_3, policy())
        .unwrap();

    assert_eq!(parsed.len(), original.len());
    for ty in [
        ExtensionType::ServerName,
        ExtensionType::ApplicationLayerProtocolNegotiation,
        ExtensionType::SupportedGroups,
        ExtensionType::MaxFragmentLength,
        ExtensionType::SupportedVersions,
        ExtensionType::ExtendedMasterSecret,
    ] {
        let original_ext = original.find(ty).unwrap();
        let parsed_ext = parsed.find(ty).unwrap();
        assert_eq!(original_ext.payload, parsed_ext.payload, "{:?}", ty);
    }
}
