//! The extension negotiation subsystem: typed extension records, the
//! per-connection registry, and the per-type codecs.

pub mod alpn;
pub mod cookie;
pub mod key_share;
pub mod max_fragment;
pub mod pre_shared_key;
pub mod psk_key_exchange_modes;
mod registry;
pub mod server_name;
pub mod signature_algorithms;
pub mod supported_groups;
pub mod supported_versions;

pub use alpn::AlpnExtension;
pub use cookie::CookieExtension;
pub use key_share::{
    Established, KeyShareClientHello, KeyShareEntry, KeyShareExtension, KeyShareHelloRetryRequest,
    KeyShareServerHello,
};
pub use max_fragment::MaxFragmentLength;
pub use pre_shared_key::{PreSharedKeyExtension, PskIdentity};
pub use psk_key_exchange_modes::{PskKeyExchangeMode, PskKeyExchangeModesExtension};
pub use registry::{
    request_size, response_size, write_request, write_response, ExtensionRegistry, ParsePolicy,
};
pub use server_name::ServerNameExtension;
pub use signature_algorithms::SignatureAlgorithmsExtension;
pub use supported_groups::SupportedGroupsExtension;
pub use supported_versions::{
    SupportedVersionsClientHello, SupportedVersionsExtension, SupportedVersionsServerHello,
};

use nom::number::complete::be_u16;
use nom::IResult;

use crate::buffer::Buf;
use crate::message::MessageType;

/// TLS extension type identifiers (IANA registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionType {
    ServerName,
    MaxFragmentLength,
    StatusRequest,
    SupportedGroups,
    EcPointFormats,
    SignatureAlgorithms,
    ApplicationLayerProtocolNegotiation,
    SignedCertificateTimestamp,
    Padding,
    EncryptThenMac,
    ExtendedMasterSecret,
    SessionTicket,
    PreSharedKey,
    EarlyData,
    SupportedVersions,
    Cookie,
    PskKeyExchangeModes,
    CertificateAuthorities,
    PostHandshakeAuth,
    SignatureAlgorithmsCert,
    KeyShare,
    Unknown(u16),
}

impl ExtensionType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0000 => ExtensionType::ServerName,
            0x0001 => ExtensionType::MaxFragmentLength,
            0x0005 => ExtensionType::StatusRequest,
            0x000A => ExtensionType::SupportedGroups,
            0x000B => ExtensionType::EcPointFormats,
            0x000D => ExtensionType::SignatureAlgorithms,
            0x0010 => ExtensionType::ApplicationLayerProtocolNegotiation,
            0x0012 => ExtensionType::SignedCertificateTimestamp,
            0x0015 => ExtensionType::Padding,
            0x0016 => ExtensionType::EncryptThenMac,
            0x0017 => ExtensionType::ExtendedMasterSecret,
            0x0023 => ExtensionType::SessionTicket,
            0x0029 => ExtensionType::PreSharedKey,
            0x002A => ExtensionType::EarlyData,
            0x002B => ExtensionType::SupportedVersions,
            0x002C => ExtensionType::Cookie,
            0x002D => ExtensionType::PskKeyExchangeModes,
            0x002F => ExtensionType::CertificateAuthorities,
            0x0031 => ExtensionType::PostHandshakeAuth,
            0x0032 => ExtensionType::SignatureAlgorithmsCert,
            0x0033 => ExtensionType::KeyShare,
            _ => ExtensionType::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ExtensionType::ServerName => 0x0000,
            ExtensionType::MaxFragmentLength => 0x0001,
            ExtensionType::StatusRequest => 0x0005,
            ExtensionType::SupportedGroups => 0x000A,
            ExtensionType::EcPointFormats => 0x000B,
            ExtensionType::SignatureAlgorithms => 0x000D,
            ExtensionType::ApplicationLayerProtocolNegotiation => 0x0010,
            ExtensionType::SignedCertificateTimestamp => 0x0012,
            ExtensionType::Padding => 0x0015,
            ExtensionType::EncryptThenMac => 0x0016,
            ExtensionType::ExtendedMasterSecret => 0x0017,
            ExtensionType::SessionTicket => 0x0023,
            ExtensionType::PreSharedKey => 0x0029,
            ExtensionType::EarlyData => 0x002A,
            ExtensionType::SupportedVersions => 0x002B,
            ExtensionType::Cookie => 0x002C,
            ExtensionType::PskKeyExchangeModes => 0x002D,
            ExtensionType::CertificateAuthorities => 0x002F,
            ExtensionType::PostHandshakeAuth => 0x0031,
            ExtensionType::SignatureAlgorithmsCert => 0x0032,
            ExtensionType::KeyShare => 0x0033,
            ExtensionType::Unknown(value) => *value,
        }
    }

    pub(crate) fn parse(input: &[u8]) -> IResult<&[u8], ExtensionType> {
        let (input, value) = be_u16(input)?;
        Ok((input, ExtensionType::from_u16(value)))
    }
}

/// The payload of one extension record, a closed sum over the extension
/// kinds this crate implements.
#[derive(Debug, PartialEq, Eq)]
pub enum ExtensionPayload {
    ServerName(ServerNameExtension),
    MaxFragmentLength(MaxFragmentLength),
    SupportedGroups(SupportedGroupsExtension),
    SignatureAlgorithms(SignatureAlgorithmsExtension),
    Alpn(AlpnExtension),
    ExtendedMasterSecret,
    SupportedVersions(SupportedVersionsExtension),
    Cookie(CookieExtension),
    PskKeyExchangeModes(PskKeyExchangeModesExtension),
    KeyShare(KeyShareExtension),
    PreSharedKey(PreSharedKeyExtension),
}

impl ExtensionPayload {
    pub fn extension_type(&self) -> ExtensionType {
        match self {
            ExtensionPayload::ServerName(_) => ExtensionType::ServerName,
            ExtensionPayload::MaxFragmentLength(_) => ExtensionType::MaxFragmentLength,
            ExtensionPayload::SupportedGroups(_) => ExtensionType::SupportedGroups,
            ExtensionPayload::SignatureAlgorithms(_) => ExtensionType::SignatureAlgorithms,
            ExtensionPayload::Alpn(_) => {
                ExtensionType::ApplicationLayerProtocolNegotiation
            }
            ExtensionPayload::ExtendedMasterSecret => ExtensionType::ExtendedMasterSecret,
            ExtensionPayload::SupportedVersions(_) => ExtensionType::SupportedVersions,
            ExtensionPayload::Cookie(_) => ExtensionType::Cookie,
            ExtensionPayload::PskKeyExchangeModes(_) => ExtensionType::PskKeyExchangeModes,
            ExtensionPayload::KeyShare(_) => ExtensionType::KeyShare,
            ExtensionPayload::PreSharedKey(_) => ExtensionType::PreSharedKey,
        }
    }

    /// Size of the type-specific body when written into `msg`.
    pub(crate) fn encoded_len(&self, msg: MessageType) -> usize {
        match self {
            ExtensionPayload::ServerName(ext) => ext.encoded_len(msg),
            ExtensionPayload::MaxFragmentLength(ext) => ext.encoded_len(),
            ExtensionPayload::SupportedGroups(ext) => ext.encoded_len(),
            ExtensionPayload::SignatureAlgorithms(ext) => ext.encoded_len(),
            ExtensionPayload::Alpn(ext) => ext.encoded_len(msg),
            ExtensionPayload::ExtendedMasterSecret => 0,
            ExtensionPayload::SupportedVersions(ext) => ext.encoded_len(),
            ExtensionPayload::Cookie(ext) => ext.encoded_len(),
            ExtensionPayload::PskKeyExchangeModes(ext) => ext.encoded_len(),
            ExtensionPayload::KeyShare(ext) => ext.encoded_len(),
            ExtensionPayload::PreSharedKey(ext) => ext.encoded_len(msg),
        }
    }

    pub(crate) fn serialize(&self, msg: MessageType, output: &mut Buf) {
        match self {
            ExtensionPayload::ServerName(ext) => ext.serialize(msg, output),
            ExtensionPayload::MaxFragmentLength(ext) => ext.serialize(output),
            ExtensionPayload::SupportedGroups(ext) => ext.serialize(output),
            ExtensionPayload::SignatureAlgorithms(ext) => ext.serialize(output),
            ExtensionPayload::Alpn(ext) => ext.serialize(msg, output),
            ExtensionPayload::ExtendedMasterSecret => {}
            ExtensionPayload::SupportedVersions(ext) => ext.serialize(output),
            ExtensionPayload::Cookie(ext) => ext.serialize(output),
            ExtensionPayload::PskKeyExchangeModes(ext) => ext.serialize(output),
            ExtensionPayload::KeyShare(ext) => ext.serialize(output),
            ExtensionPayload::PreSharedKey(ext) => ext.serialize(msg, output),
        }
    }
}

/// One extension record owned by a registry.
#[derive(Debug, PartialEq, Eq)]
pub struct Extension {
    pub extension_type: ExtensionType,
    pub payload: ExtensionPayload,
    /// Set when parsing a request marked this extension as needing an
    /// answer; cleared once the answer is written.
    pub response_pending: bool,
}

impl Extension {
    pub fn new(payload: ExtensionPayload) -> Self {
        Extension {
            extension_type: payload.extension_type(),
            payload,
            response_pending: false,
        }
    }
}

/// Bit set over the known extension types, shared by the size and write
/// passes across the connection-level and context-level registries so a
/// type emitted from one is never emitted again from the other.
///
/// Lives for a single build call and is never persisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Semaphore(u64);

impl Semaphore {
    pub fn new() -> Self {
        Semaphore(0)
    }

    fn bit(ty: ExtensionType) -> u32 {
        match ty {
            ExtensionType::ServerName => 0,
            ExtensionType::MaxFragmentLength => 1,
            ExtensionType::StatusRequest => 2,
            ExtensionType::SupportedGroups => 3,
            ExtensionType::EcPointFormats => 4,
            ExtensionType::SignatureAlgorithms => 5,
            ExtensionType::ApplicationLayerProtocolNegotiation => 6,
            ExtensionType::SignedCertificateTimestamp => 7,
            ExtensionType::Padding => 8,
            ExtensionType::EncryptThenMac => 9,
            ExtensionType::ExtendedMasterSecret => 10,
            ExtensionType::SessionTicket => 11,
            ExtensionType::PreSharedKey => 12,
            ExtensionType::EarlyData => 13,
            ExtensionType::SupportedVersions => 14,
            ExtensionType::Cookie => 15,
            ExtensionType::PskKeyExchangeModes => 16,
            ExtensionType::CertificateAuthorities => 17,
            ExtensionType::PostHandshakeAuth => 18,
            ExtensionType::SignatureAlgorithmsCert => 19,
            ExtensionType::KeyShare => 20,
            // Unknown types are never emitted; they share one overflow
            // bit.
            ExtensionType::Unknown(_) => 63,
        }
    }

    pub fn mark(&mut self, ty: ExtensionType) {
        self.0 |= 1 << Self::bit(ty);
    }

    pub fn is_marked(&self, ty: ExtensionType) -> bool {
        self.0 & (1 << Self::bit(ty)) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_type_roundtrip() {
        for value in [0x0000_u16, 0x0001, 0x000A, 0x000D, 0x0010, 0x0029, 0x002B, 0x002C, 0x0033, 0xFF01]
        {
            assert_eq!(ExtensionType::from_u16(value).as_u16(), value);
        }
    }

    #[test]
    fn semaphore_marks_types_independently() {
        let mut sem = Semaphore::new();
        assert!(!sem.is_marked(ExtensionType::ServerName));

        sem.mark(ExtensionType::ServerName);
        assert!(sem.is_marked(ExtensionType::ServerName));
        assert!(!sem.is_marked(ExtensionType::KeyShare));

        sem.mark(ExtensionType::KeyShare);
        assert!(sem.is_marked(ExtensionType::KeyShare));
    }

    #[test]
    fn payload_reports_its_type() {
        let payload = ExtensionPayload::Cookie(CookieExtension::new(vec![1, 2, 3]));
        assert_eq!(payload.extension_type(), ExtensionType::Cookie);

        let payload = ExtensionPayload::ExtendedMasterSecret;
        assert_eq!(payload.extension_type(), ExtensionType::ExtendedMasterSecret);
    }
}
