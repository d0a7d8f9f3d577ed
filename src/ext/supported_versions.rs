//! SupportedVersions extension (RFC 8446 Section 4.2.1).
//!
//! From TLS 1.3 on, version negotiation happens via this extension rather
//! than the legacy version field. The client sends a list of supported
//! versions; the server answers with a single selected version.

use nom::number::complete::be_u8;
use nom::IResult;
use tinyvec::ArrayVec;

use crate::buffer::Buf;
use crate::message::{MessageType, ProtocolVersion};

/// Capacity of the client's supported_versions working list.
const MAX_VERSIONS: usize = 8;

/// The two wire forms of the extension, by carrying message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupportedVersionsExtension {
    Offer(SupportedVersionsClientHello),
    Selected(SupportedVersionsServerHello),
}

impl SupportedVersionsExtension {
    pub fn parse(input: &[u8], msg: MessageType) -> IResult<&[u8], SupportedVersionsExtension> {
        if msg == MessageType::ClientHello {
            let (input, offer) = SupportedVersionsClientHello::parse(input)?;
            Ok((input, SupportedVersionsExtension::Offer(offer)))
        } else {
            let (input, selected) = SupportedVersionsServerHello::parse(input)?;
            Ok((input, SupportedVersionsExtension::Selected(selected)))
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            SupportedVersionsExtension::Offer(offer) => 1 + offer.versions.len() * 2,
            SupportedVersionsExtension::Selected(_) => 2,
        }
    }

    pub fn serialize(&self, output: &mut Buf) {
        match self {
            SupportedVersionsExtension::Offer(offer) => offer.serialize(output),
            SupportedVersionsExtension::Selected(selected) => selected.serialize(output),
        }
    }
}

/// ClientHello form: versions in preference order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedVersionsClientHello {
    pub versions: ArrayVec<[ProtocolVersion; MAX_VERSIONS]>,
}

impl SupportedVersionsClientHello {
    /// A TLS 1.3 offer, optionally with TLS 1.2 for backwards
    /// compatibility.
    pub fn new_tls13(include_tls12: bool) -> Self {
        let mut versions = ArrayVec::new();
        versions.push(ProtocolVersion::TLS1_3);
        if include_tls12 {
            versions.push(ProtocolVersion::TLS1_2);
        }
        Self { versions }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (mut input, list_len) = be_u8(input)?;
        let mut versions = ArrayVec::new();
        let mut remaining = list_len as usize;

        while remaining >= 2 {
            let (rest, version) = ProtocolVersion::parse(input)?;
            input = rest;
            remaining -= 2;
            // Only keep known versions.
            if !matches!(version, ProtocolVersion::Unknown(_)) {
                let _ = versions.try_push(version);
            }
        }

        Ok((input, Self { versions }))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push((self.versions.len() * 2) as u8);
        for version in &self.versions {
            output.extend_from_slice(&version.as_u16().to_be_bytes());
        }
    }
}

/// ServerHello / HelloRetryRequest form: the one selected version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedVersionsServerHello {
    pub selected_version: ProtocolVersion,
}

impl SupportedVersionsServerHello {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, selected_version) = ProtocolVersion::parse(input)?;
        Ok((input, Self { selected_version }))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&self.selected_version.as_u16().to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_hello_roundtrip() {
        let ext = SupportedVersionsClientHello::new_tls13(true);

        let mut buf = Buf::new();
        ext.serialize(&mut buf);
        assert_eq!(
            &*buf,
            &[
                0x04, // 4 bytes (2 versions)
                0x03, 0x04, // TLS 1.3
                0x03, 0x03, // TLS 1.2
            ]
        );

        let (rest, parsed) = SupportedVersionsClientHello::parse(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, ext);
    }

    #[test]
    fn server_hello_roundtrip() {
        let ext = SupportedVersionsServerHello {
            selected_version: ProtocolVersion::TLS1_3,
        };

        let mut buf = Buf::new();
        ext.serialize(&mut buf);
        assert_eq!(&*buf, &[0x03, 0x04]);

        let (rest, parsed) = SupportedVersionsServerHello::parse(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, ext);
    }

    #[test]
    fn parse_form_follows_message_type() {
        let offer_bytes = [0x02, 0x03, 0x04];
        let (_, offer) =
            SupportedVersionsExtension::parse(&offer_bytes, MessageType::ClientHello).unwrap();
        assert!(matches!(offer, SupportedVersionsExtension::Offer(_)));

        let selected_bytes = [0x03, 0x04];
        let (_, selected) =
            SupportedVersionsExtension::parse(&selected_bytes, MessageType::ServerHello).unwrap();
        assert!(matches!(selected, SupportedVersionsExtension::Selected(_)));
    }
}
