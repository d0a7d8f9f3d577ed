//! Shared wire-level vocabulary: protocol versions, message types, random
//! values, hash and signature algorithm identifiers and named groups.

mod named_group;
mod random;

pub use named_group::NamedGroup;
pub use random::Random;

use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    TLS1_0,
    TLS1_1,
    TLS1_2,
    TLS1_3,
    Unknown(u16),
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::Unknown(0)
    }
}

impl ProtocolVersion {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0301 => ProtocolVersion::TLS1_0,
            0x0302 => ProtocolVersion::TLS1_1,
            0x0303 => ProtocolVersion::TLS1_2,
            0x0304 => ProtocolVersion::TLS1_3,
            _ => ProtocolVersion::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ProtocolVersion::TLS1_0 => 0x0301,
            ProtocolVersion::TLS1_1 => 0x0302,
            ProtocolVersion::TLS1_2 => 0x0303,
            ProtocolVersion::TLS1_3 => 0x0304,
            ProtocolVersion::Unknown(value) => *value,
        }
    }

    pub(crate) fn parse(input: &[u8]) -> IResult<&[u8], ProtocolVersion> {
        let (input, value) = be_u16(input)?;
        Ok((input, ProtocolVersion::from_u16(value)))
    }

    /// True for versions whose PRF uses a single hash of at least SHA-256.
    ///
    /// TLS 1.0 and 1.1 use the dual MD5/SHA-1 PRF instead.
    pub fn use_at_least_sha256(&self) -> bool {
        matches!(self, ProtocolVersion::TLS1_2 | ProtocolVersion::TLS1_3)
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolVersion::TLS1_0 => write!(f, "TLS1.0"),
            ProtocolVersion::TLS1_1 => write!(f, "TLS1.1"),
            ProtocolVersion::TLS1_2 => write!(f, "TLS1.2"),
            ProtocolVersion::TLS1_3 => write!(f, "TLS1.3"),
            ProtocolVersion::Unknown(value) => write!(f, "Unknown({:#06x})", value),
        }
    }
}

/// The handshake message an extension block belongs to.
///
/// Extensions are only legal in certain messages, and several extensions
/// serialize differently depending on which message carries them. On the
/// wire a HelloRetryRequest is a ServerHello, but at this layer it is a
/// distinct dispatch context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    ClientHello,
    ServerHello,
    HelloRetryRequest,
    EncryptedExtensions,
    CertificateRequest,
    NewSessionTicket,
}

impl MessageType {
    /// True for the messages that solicit extensions from the peer
    /// (ClientHello, CertificateRequest) rather than answer them.
    pub fn is_request(&self) -> bool {
        matches!(self, MessageType::ClientHello | MessageType::CertificateRequest)
    }
}

/// Hash algorithm identifiers (RFC 5246 Section 7.4.1.4.1).
///
/// `Blake2b` is a non-standard tag some stacks use internally; the PRF
/// treats it as a SHA-256-width hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    None,
    MD5,
    SHA1,
    SHA224,
    SHA256,
    SHA384,
    SHA512,
    Blake2b,
    Unknown(u8),
}

impl HashAlgorithm {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => HashAlgorithm::None,
            1 => HashAlgorithm::MD5,
            2 => HashAlgorithm::SHA1,
            3 => HashAlgorithm::SHA224,
            4 => HashAlgorithm::SHA256,
            5 => HashAlgorithm::SHA384,
            6 => HashAlgorithm::SHA512,
            7 => HashAlgorithm::Blake2b,
            _ => HashAlgorithm::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            HashAlgorithm::None => 0,
            HashAlgorithm::MD5 => 1,
            HashAlgorithm::SHA1 => 2,
            HashAlgorithm::SHA224 => 3,
            HashAlgorithm::SHA256 => 4,
            HashAlgorithm::SHA384 => 5,
            HashAlgorithm::SHA512 => 6,
            HashAlgorithm::Blake2b => 7,
            HashAlgorithm::Unknown(value) => *value,
        }
    }

    pub(crate) fn parse(input: &[u8]) -> IResult<&[u8], HashAlgorithm> {
        let (input, value) = be_u8(input)?;
        Ok((input, HashAlgorithm::from_u8(value)))
    }

    /// Digest output length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithm::MD5 => 16,
            HashAlgorithm::SHA1 => 20,
            HashAlgorithm::SHA224 => 28,
            HashAlgorithm::SHA256 => 32,
            HashAlgorithm::SHA384 => 48,
            HashAlgorithm::SHA512 => 64,
            HashAlgorithm::Blake2b => 32,
            HashAlgorithm::None | HashAlgorithm::Unknown(_) => 0,
        }
    }
}

/// Signature algorithm identifiers (RFC 5246 Section 7.4.1.4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    #[default]
    Anonymous,
    RSA,
    DSA,
    ECDSA,
    Unknown(u8),
}

impl SignatureAlgorithm {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => SignatureAlgorithm::Anonymous,
            1 => SignatureAlgorithm::RSA,
            2 => SignatureAlgorithm::DSA,
            3 => SignatureAlgorithm::ECDSA,
            _ => SignatureAlgorithm::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            SignatureAlgorithm::Anonymous => 0,
            SignatureAlgorithm::RSA => 1,
            SignatureAlgorithm::DSA => 2,
            SignatureAlgorithm::ECDSA => 3,
            SignatureAlgorithm::Unknown(value) => *value,
        }
    }
}

/// A hash/signature algorithm pair as carried by the signature_algorithms
/// extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignatureAndHashAlgorithm {
    pub hash: HashAlgorithm,
    pub signature: SignatureAlgorithm,
}

impl SignatureAndHashAlgorithm {
    pub fn new(hash: HashAlgorithm, signature: SignatureAlgorithm) -> Self {
        SignatureAndHashAlgorithm { hash, signature }
    }

    pub fn as_u16(&self) -> u16 {
        (self.hash.as_u8() as u16) << 8 | self.signature.as_u8() as u16
    }

    pub(crate) fn parse(input: &[u8]) -> IResult<&[u8], SignatureAndHashAlgorithm> {
        let (input, hash) = HashAlgorithm::parse(input)?;
        let (input, sig) = be_u8(input)?;
        Ok((
            input,
            SignatureAndHashAlgorithm {
                hash,
                signature: SignatureAlgorithm::from_u8(sig),
            },
        ))
    }
}
