#![no_main]

//! Fuzz target for extension block parsing.
//!
//! Feeds raw bytes through the registry's TLV iteration for every message
//! type, then reframes the input as a single well-formed record to reach
//! the per-type codecs more often.
//!
//! Extension record format:
//! - Type: 2 bytes
//! - Length: 2 bytes
//! - Body: `length` bytes of type-specific payload

use libfuzzer_sys::fuzz_target;

use tlshake::ext::{ExtensionRegistry, ParsePolicy};
use tlshake::message::{MessageType, ProtocolVersion};

const MESSAGE_TYPES: &[MessageType] = &[
    MessageType::ClientHello,
    MessageType::ServerHello,
    MessageType::HelloRetryRequest,
    MessageType::EncryptedExtensions,
    MessageType::CertificateRequest,
    MessageType::NewSessionTicket,
];

const KNOWN_TYPES: &[u16] = &[
    0x0000, 0x0001, 0x000A, 0x000D, 0x0010, 0x0017, 0x0029, 0x002B, 0x002C, 0x002D, 0x0033,
];

fuzz_target!(|data: &[u8]| {
    let policy = ParsePolicy::default();

    // Raw input exercises the TLV framing and bounds checks.
    for msg in MESSAGE_TYPES {
        let mut registry = ExtensionRegistry::new();
        let _ = registry.parse(data, *msg, ProtocolVersion::TLS1_3, policy);
        let mut registry = ExtensionRegistry::new();
        let _ = registry.parse(data, *msg, ProtocolVersion::TLS1_2, policy);
    }

    // Reframe as one record per known type so the body reaches the
    // type-specific codec.
    if !data.is_empty() {
        let body_len = data.len().min(u16::MAX as usize);
        for ty in KNOWN_TYPES {
            let mut record = Vec::with_capacity(4 + body_len);
            record.extend_from_slice(&ty.to_be_bytes());
            record.extend_from_slice(&(body_len as u16).to_be_bytes());
            record.extend_from_slice(&data[..body_len]);

            for msg in MESSAGE_TYPES {
                let mut registry = ExtensionRegistry::new();
                let _ = registry.parse(&record, *msg, ProtocolVersion::TLS1_3, policy);
            }
        }
    }
});
